//! Event command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use clap::Args;

use congrega_core::listing::{self, paginate};
use congrega_core::{EntityKind, NewEvent, PendingAction, View};

use super::{parse_date, parse_time, resolve_id, run_confirmed};
use crate::app::App;
use crate::output::Output;

#[derive(Args, Debug, Default)]
pub struct EventFields {
    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Image file to attach (png, jpg, gif, webp)
    #[arg(short, long)]
    pub image: Option<String>,
}

/// List events in start order
pub fn list(app: &mut App, upcoming: bool, page: usize, output: &Output) -> Result<()> {
    app.enter(View::Events)?;

    let events = if upcoming {
        listing::upcoming_events(app.controller.events(), Local::now().naive_local())
    } else {
        listing::events_by_start(app.controller.events())
    };
    output.print_events(&paginate(events, page, app.config.page_size));
    Ok(())
}

/// Show one event
pub fn show(app: &mut App, id: String, output: &Output) -> Result<()> {
    app.enter(View::Events)?;

    let id = resolve_id(app.controller.events(), &id)?;
    if let Some(event) = app.controller.events().iter().find(|e| e.id == id) {
        output.print_event(event);
    }
    Ok(())
}

/// Add an event
pub async fn add(
    app: &mut App,
    name: String,
    date: String,
    time: String,
    fields: EventFields,
    output: &Output,
) -> Result<()> {
    app.enter(View::Events)?;

    let event = NewEvent {
        name,
        date: parse_date(&date)?,
        time: parse_time(&time)?,
        description: fields.description.unwrap_or_default(),
        image_data_url: fields.image.as_deref().map(read_image).transpose()?,
    };

    let name = event.name.clone();
    let id = app.controller.add_event(event).await?;
    app.settle(&[EntityKind::Events]).await;

    if output.is_quiet() {
        println!("{}", id);
    }
    output.success(&format!("Added event: {} ({})", name, id));
    Ok(())
}

/// Edit an event; fields not given keep their value
#[allow(clippy::too_many_arguments)]
pub async fn edit(
    app: &mut App,
    id: String,
    name: Option<String>,
    date: Option<String>,
    time: Option<String>,
    fields: EventFields,
    remove_image: bool,
    output: &Output,
) -> Result<()> {
    app.enter(View::Events)?;

    let id = resolve_id(app.controller.events(), &id)?;
    let mut event = app
        .controller
        .events()
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .with_context(|| format!("Event not found: {}", id))?;

    if let Some(name) = name {
        event.name = name;
    }
    if let Some(ref date) = date {
        event.date = parse_date(date)?;
    }
    if let Some(ref time) = time {
        event.time = parse_time(time)?;
    }
    if let Some(description) = fields.description {
        event.description = description;
    }
    if remove_image {
        event.image_data_url = None;
    } else if let Some(ref path) = fields.image {
        event.image_data_url = Some(read_image(path)?);
    }

    app.controller.update_event(event).await?;
    app.settle(&[EntityKind::Events]).await;

    if let Some(event) = app.controller.events().iter().find(|e| e.id == id) {
        output.print_event(event);
    }
    Ok(())
}

/// Delete an event after confirmation
pub async fn delete(app: &mut App, id: String, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Events)?;

    let id = resolve_id(app.controller.events(), &id)?;
    let action = PendingAction::Delete {
        kind: EntityKind::Events,
        id: id.clone(),
    };
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&[EntityKind::Events]).await;
        output.success(&format!("Deleted event: {}", id));
    }
    Ok(())
}

/// Read an image file into a `data:` URL
///
/// Size is checked by the controller against `max_image_bytes`.
fn read_image(path: &str) -> Result<String> {
    let path = Path::new(path);
    let mime = image_mime(path)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => Ok("image/png"),
        Some("jpg") | Some("jpeg") => Ok("image/jpeg"),
        Some("gif") => Ok("image/gif"),
        Some("webp") => Ok("image/webp"),
        _ => bail!("Por favor, selecione um arquivo de imagem válido."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_from_extension() {
        assert_eq!(image_mime(Path::new("flyer.PNG")).unwrap(), "image/png");
        assert_eq!(image_mime(Path::new("a/b.jpeg")).unwrap(), "image/jpeg");
        assert!(image_mime(Path::new("notes.txt")).is_err());
        assert!(image_mime(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_read_image_builds_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let url = read_image(path.to_str().unwrap()).unwrap();
        assert_eq!(url, "data:image/gif;base64,R0lGODlh");
    }
}
