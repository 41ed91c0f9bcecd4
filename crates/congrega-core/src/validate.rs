//! Form checks run before any write reaches the store

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CommandError;
use crate::models::{NewEvent, NewMember, NewVisitor, PrayerRequestForm};

/// Default cap on the decoded size of an event image
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 1024 * 1024;

fn require_name(name: &str) -> Result<(), CommandError> {
    if name.trim().is_empty() {
        return Err(CommandError::invalid("O nome é obrigatório."));
    }
    Ok(())
}

pub fn member(member: &NewMember) -> Result<(), CommandError> {
    require_name(&member.name)
}

pub fn visitor(visitor: &NewVisitor) -> Result<(), CommandError> {
    require_name(&visitor.name)
}

/// Date and time are typed, so only the name can be missing here
pub fn event(event: &NewEvent, max_image_bytes: usize) -> Result<(), CommandError> {
    if event.name.trim().is_empty() {
        return Err(CommandError::invalid("Nome, data e hora são obrigatórios."));
    }
    if let Some(ref url) = event.image_data_url {
        image_data_url(url, max_image_bytes)?;
    }
    Ok(())
}

pub fn prayer_request(form: &PrayerRequestForm) -> Result<(), CommandError> {
    if form.request.trim().is_empty() {
        return Err(CommandError::invalid(
            "Por favor, escreva seu pedido de oração.",
        ));
    }
    Ok(())
}

/// Check a `data:image/<type>;base64,<payload>` URL and its decoded size
///
/// Returns the decoded size in bytes.
pub fn image_data_url(url: &str, max_bytes: usize) -> Result<usize, CommandError> {
    let invalid = || CommandError::invalid("Por favor, selecione um arquivo de imagem válido.");

    let rest = url.strip_prefix("data:image/").ok_or_else(invalid)?;
    let (media_type, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    if media_type.is_empty() || media_type.contains(',') {
        return Err(invalid());
    }

    let decoded = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if decoded.is_empty() {
        return Err(invalid());
    }
    if decoded.len() > max_bytes {
        return Err(CommandError::invalid(format!(
            "A imagem é muito grande ({} KB). O limite é {} KB.",
            decoded.len().div_ceil(1024),
            max_bytes / 1024
        )));
    }
    Ok(decoded.len())
}
