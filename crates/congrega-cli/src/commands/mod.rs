//! Command handlers, one module per view

pub mod config;
pub mod database;
pub mod event;
pub mod member;
pub mod prayer;
pub mod program;
pub mod status;
pub mod visitor;

use std::io::{self, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};

use congrega_core::listing;
use congrega_core::models::Record;
use congrega_core::{ConfirmationRequest, Decision, PendingAction, RecordId};

use crate::app::App;
use crate::output::{Output, OutputFormat};

/// Resolve an id given in full or as a unique prefix
fn resolve_id<T: Record>(items: &[T], id: &str) -> Result<RecordId> {
    if let Some(item) = items.iter().find(|item| item.id().as_str() == id) {
        return Ok(item.id().clone());
    }

    let matches: Vec<_> = items
        .iter()
        .filter(|item| item.id().as_str().starts_with(id))
        .collect();

    match matches.as_slice() {
        [] => bail!("No {} found matching: {}", T::KIND, id),
        [item] => Ok(item.id().clone()),
        _ => {
            eprintln!("Multiple records match '{}':", id);
            for item in &matches {
                eprintln!("  {}", item.id());
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Accept or cancel a confirmation request
///
/// `--yes` accepts. Otherwise the user is asked, which needs human output
/// and an interactive stdin; without a prompt the command fails.
fn decide(request: &ConfirmationRequest, assume_yes: bool, output: &Output) -> Result<Decision> {
    if assume_yes {
        return Ok(Decision::Accept);
    }
    if !output.should_prompt() || !io::stdin().is_terminal() {
        bail!(
            "{}\nConfirmation required: re-run with --yes to proceed.",
            request.prompt()
        );
    }
    if confirm(request.prompt())? {
        Ok(Decision::Accept)
    } else {
        Ok(Decision::Cancel)
    }
}

/// Confirm and run a destructive action; returns whether it ran
async fn run_confirmed(
    app: &mut App,
    action: PendingAction,
    assume_yes: bool,
    output: &Output,
) -> Result<bool> {
    let request = app.controller.request_confirmation(action)?;
    let decision = decide(&request, assume_yes, output)?;
    let ran = app.controller.confirm(request, decision).await?;
    if !ran {
        output.message("Cancelled.");
    }
    Ok(ran)
}

/// Print (and optionally open) the WhatsApp link for a phone number
fn show_contact(phone: &str, open_link: bool, output: &Output) -> Result<()> {
    let link = listing::contact_link(phone)?;

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "link": link })),
        OutputFormat::Human | OutputFormat::Quiet => println!("{}", link),
    }

    if open_link {
        open::that(&link).with_context(|| format!("Failed to open {}", link))?;
    }
    Ok(())
}

/// Ask a yes/no question on the terminal
fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [s/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(matches!(input.as_str(), "s" | "sim" | "y" | "yes"))
}

/// Parse a date as `YYYY-MM-DD` or `DD/MM/YYYY`
fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD.", value))
}

/// Parse an optional date where an empty value means "clear"
fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(value).map(Some)
    }
}

/// Parse a time as `HH:MM`
fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{}'. Use HH:MM.", value))
}
