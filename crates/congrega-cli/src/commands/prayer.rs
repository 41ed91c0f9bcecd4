//! Prayer board command handlers

use anyhow::{Context, Result};

use congrega_core::listing::{self, paginate};
use congrega_core::{EntityKind, PendingAction, PrayerRequestForm, View};

use super::{resolve_id, run_confirmed};
use crate::app::App;
use crate::output::Output;

/// Show the board, newest first
pub fn list(app: &mut App, page: usize, output: &Output) -> Result<()> {
    app.enter(View::Prayer)?;

    let requests = listing::prayer_requests_by_date(app.controller.prayer_requests());
    output.print_prayer_requests(&paginate(requests, page, app.config.page_size));
    Ok(())
}

/// Post a prayer request
pub async fn add(
    app: &mut App,
    request: String,
    name: Option<String>,
    anonymous: bool,
    output: &Output,
) -> Result<()> {
    app.enter(View::Prayer)?;

    let form = PrayerRequestForm {
        name,
        request,
        is_anonymous: anonymous,
    };
    let id = app.controller.add_prayer_request(form).await?;
    app.settle(&[EntityKind::PrayerRequests]).await;

    if output.is_quiet() {
        println!("{}", id);
    }
    output.success("Pedido de oração enviado.");
    Ok(())
}

/// Edit a prayer request; its date never changes
pub async fn edit(
    app: &mut App,
    id: String,
    request: Option<String>,
    name: Option<String>,
    anonymous: Option<bool>,
    output: &Output,
) -> Result<()> {
    app.enter(View::Prayer)?;

    let id = resolve_id(app.controller.prayer_requests(), &id)?;
    let stored = app
        .controller
        .prayer_requests()
        .iter()
        .find(|r| r.id == id)
        .with_context(|| format!("Prayer request not found: {}", id))?;

    let form = PrayerRequestForm {
        name: name.or_else(|| stored.name.clone()),
        request: request.unwrap_or_else(|| stored.request.clone()),
        is_anonymous: anonymous.unwrap_or(stored.is_anonymous),
    };
    app.controller.update_prayer_request(&id, form).await?;
    app.settle(&[EntityKind::PrayerRequests]).await;

    output.success(&format!("Updated prayer request: {}", id));
    Ok(())
}

/// Delete a prayer request after confirmation
pub async fn delete(app: &mut App, id: String, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Prayer)?;

    let id = resolve_id(app.controller.prayer_requests(), &id)?;
    let action = PendingAction::Delete {
        kind: EntityKind::PrayerRequests,
        id: id.clone(),
    };
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&[EntityKind::PrayerRequests]).await;
        output.success(&format!("Deleted prayer request: {}", id));
    }
    Ok(())
}
