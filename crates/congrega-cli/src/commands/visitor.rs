//! Visitor command handlers

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;

use congrega_core::listing::{self, paginate};
use congrega_core::{EntityKind, NewVisitor, PendingAction, View};

use super::{parse_date, resolve_id, run_confirmed, show_contact};
use crate::app::App;
use crate::output::{Output, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct VisitorFields {
    /// First visit date (YYYY-MM-DD, default today)
    #[arg(short, long)]
    pub date: Option<String>,
    /// Phone number
    #[arg(short, long)]
    pub phone: Option<String>,
    /// Free-text notes
    #[arg(short = 'N', long)]
    pub notes: Option<String>,
}

/// List visitors, most recent first
pub fn list(app: &mut App, page: usize, output: &Output) -> Result<()> {
    app.enter(View::Visitors)?;

    let visitors = listing::visitors_by_recency(app.controller.visitors());
    output.print_visitors(&paginate(visitors, page, app.config.page_size));
    Ok(())
}

/// Register a visitor and print the welcome message
pub async fn add(
    app: &mut App,
    name: String,
    fields: VisitorFields,
    output: &Output,
) -> Result<()> {
    app.enter(View::Visitors)?;

    let first_visit_date = match fields.date {
        Some(ref date) => parse_date(date)?,
        None => Local::now().date_naive(),
    };
    let visitor = NewVisitor {
        name,
        first_visit_date,
        phone: fields.phone.unwrap_or_default(),
        notes: fields.notes.unwrap_or_default(),
    };

    let added = app.controller.add_visitor(visitor).await?;
    app.settle(&[EntityKind::Visitors]).await;

    match output.format {
        OutputFormat::Human => {
            println!("✓ Added visitor: {}", added.id);
            println!();
            println!("{}", added.welcome_message);
        }
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "id": added.id,
                "welcomeMessage": added.welcome_message,
            })
        ),
        OutputFormat::Quiet => println!("{}", added.id),
    }
    Ok(())
}

/// Edit a visitor; fields not given keep their value
pub async fn edit(
    app: &mut App,
    id: String,
    name: Option<String>,
    fields: VisitorFields,
    output: &Output,
) -> Result<()> {
    app.enter(View::Visitors)?;

    let id = resolve_id(app.controller.visitors(), &id)?;
    let mut visitor = app
        .controller
        .visitors()
        .iter()
        .find(|v| v.id == id)
        .cloned()
        .with_context(|| format!("Visitor not found: {}", id))?;

    if let Some(name) = name {
        visitor.name = name;
    }
    if let Some(ref date) = fields.date {
        visitor.first_visit_date = parse_date(date)?;
    }
    if let Some(phone) = fields.phone {
        visitor.phone = phone;
    }
    if let Some(notes) = fields.notes {
        visitor.notes = notes;
    }

    app.controller.update_visitor(visitor).await?;
    app.settle(&[EntityKind::Visitors]).await;

    output.success(&format!("Updated visitor: {}", id));
    Ok(())
}

/// Delete a visitor after confirmation
pub async fn delete(app: &mut App, id: String, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Visitors)?;

    let id = resolve_id(app.controller.visitors(), &id)?;
    let action = PendingAction::Delete {
        kind: EntityKind::Visitors,
        id: id.clone(),
    };
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&[EntityKind::Visitors]).await;
        output.success(&format!("Deleted visitor: {}", id));
    }
    Ok(())
}

/// Convert a visitor into a member after confirmation
pub async fn convert(app: &mut App, id: String, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Visitors)?;

    let id = resolve_id(app.controller.visitors(), &id)?;
    let action = PendingAction::ConvertVisitor { id };
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&[EntityKind::Members, EntityKind::Visitors]).await;
    }
    Ok(())
}

/// WhatsApp link for a visitor
pub fn contact(app: &mut App, id: String, open: bool, output: &Output) -> Result<()> {
    app.enter(View::Visitors)?;

    let id = resolve_id(app.controller.visitors(), &id)?;
    let phone = app
        .controller
        .visitors()
        .iter()
        .find(|v| v.id == id)
        .map(|v| v.phone.clone())
        .unwrap_or_default();
    show_contact(&phone, open, output)
}
