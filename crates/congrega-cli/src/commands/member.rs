//! Member command handlers

use anyhow::{Context, Result};
use clap::Args;

use congrega_core::listing::{self, paginate};
use congrega_core::{EntityKind, MemberStatus, NewMember, PendingAction, View};

use super::{parse_optional_date, resolve_id, run_confirmed, show_contact};
use crate::app::App;
use crate::output::Output;

/// Member fields accepted by `add` and `edit`
#[derive(Args, Debug, Default)]
pub struct MemberFields {
    /// Role label (e.g. Membro, Diácono)
    #[arg(short, long)]
    pub role: Option<String>,
    /// Status: ativo or inativo
    #[arg(short, long)]
    pub status: Option<MemberStatus>,
    /// Phone number
    #[arg(short, long)]
    pub phone: Option<String>,
    /// Birth date (YYYY-MM-DD, empty to clear)
    #[arg(short, long)]
    pub birth_date: Option<String>,
}

/// List members, optionally filtered by a search query
pub fn list(
    app: &mut App,
    search: Option<String>,
    page: usize,
    output: &Output,
) -> Result<()> {
    app.enter(View::Members)?;

    let members = app.controller.members();
    let found = listing::search_members(members, search.as_deref().unwrap_or(""));
    output.print_members(&paginate(found, page, app.config.page_size));
    Ok(())
}

/// Show one member
pub fn show(app: &mut App, id: String, output: &Output) -> Result<()> {
    app.enter(View::Members)?;

    let id = resolve_id(app.controller.members(), &id)?;
    if let Some(member) = app.controller.members().iter().find(|m| m.id == id) {
        output.print_member(member);
    }
    Ok(())
}

/// Add a member
pub async fn add(app: &mut App, name: String, fields: MemberFields, output: &Output) -> Result<()> {
    app.enter(View::Members)?;

    let mut member = NewMember::new(name);
    if let Some(role) = fields.role {
        member.role = role;
    }
    if let Some(status) = fields.status {
        member.status = status;
    }
    if let Some(phone) = fields.phone {
        member.phone = phone;
    }
    if let Some(date) = fields.birth_date {
        member.birth_date = parse_optional_date(&date)?;
    }

    let name = member.name.clone();
    let id = app.controller.add_member(member).await?;
    app.settle(&[EntityKind::Members]).await;

    if output.is_quiet() {
        println!("{}", id);
    }
    output.success(&format!("Added member: {} ({})", name, id));
    Ok(())
}

/// Edit a member; fields not given keep their value
pub async fn edit(
    app: &mut App,
    id: String,
    name: Option<String>,
    fields: MemberFields,
    output: &Output,
) -> Result<()> {
    app.enter(View::Members)?;

    let id = resolve_id(app.controller.members(), &id)?;
    let mut member = app
        .controller
        .members()
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .with_context(|| format!("Member not found: {}", id))?;

    if let Some(name) = name {
        member.name = name;
    }
    if let Some(role) = fields.role {
        member.role = role;
    }
    if let Some(status) = fields.status {
        member.status = status;
    }
    if let Some(phone) = fields.phone {
        member.phone = phone;
    }
    if let Some(date) = fields.birth_date {
        member.birth_date = parse_optional_date(&date)?;
    }

    app.controller.update_member(member).await?;
    app.settle(&[EntityKind::Members]).await;

    if let Some(member) = app.controller.members().iter().find(|m| m.id == id) {
        output.print_member(member);
    }
    Ok(())
}

/// Delete a member after confirmation
pub async fn delete(app: &mut App, id: String, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Members)?;

    let id = resolve_id(app.controller.members(), &id)?;
    let action = PendingAction::Delete {
        kind: EntityKind::Members,
        id: id.clone(),
    };
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&[EntityKind::Members]).await;
        output.success(&format!("Deleted member: {}", id));
    }
    Ok(())
}

/// WhatsApp link for a member
pub fn contact(app: &mut App, id: String, open: bool, output: &Output) -> Result<()> {
    app.enter(View::Members)?;

    let id = resolve_id(app.controller.members(), &id)?;
    let phone = app
        .controller
        .members()
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.phone.clone())
        .unwrap_or_default();
    show_contact(&phone, open, output)
}
