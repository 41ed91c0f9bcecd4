//! Backup, restore and reset handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, Utc};

use congrega_core::{Backup, EntityKind, PendingAction, View};

use super::run_confirmed;
use crate::app::App;
use crate::output::{Output, OutputFormat};

/// Write a backup of everything to a JSON file
///
/// Without `--output` the file lands in the current directory under the
/// dated default name. `-` writes to stdout.
pub fn export(app: &mut App, path: Option<PathBuf>, output: &Output) -> Result<()> {
    app.enter(View::Database)?;

    let backup = app.controller.export(Utc::now())?;
    let json = backup.to_json().context("Failed to encode backup")?;

    if path.as_deref() == Some(std::path::Path::new("-")) {
        println!("{}", json);
        return Ok(());
    }

    let path = path.unwrap_or_else(|| PathBuf::from(Backup::file_name(Local::now().date_naive())));
    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;

    match output.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "path": path,
                "records": backup.record_count(),
                "source": backup.source,
            })
        ),
        OutputFormat::Quiet => println!("{}", path.display()),
        OutputFormat::Human => output.success(&format!(
            "Exported {} records to {}",
            backup.record_count(),
            path.display()
        )),
    }
    Ok(())
}

/// Replace all data with a backup file
pub async fn import(app: &mut App, path: PathBuf, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Database)?;

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read backup: {:?}", path))?;
    let backup = Backup::from_json(&json).context("Arquivo de backup inválido")?;

    let action = PendingAction::Import(Box::new(backup));
    if run_confirmed(app, action, yes, output).await? {
        app.settle(&EntityKind::ALL).await;
    }
    Ok(())
}

/// Delete all data after confirmation
pub async fn reset(app: &mut App, yes: bool, output: &Output) -> Result<()> {
    app.enter(View::Database)?;

    if run_confirmed(app, PendingAction::Reset, yes, output).await? {
        output.success("Todos os dados foram apagados.");
    }
    Ok(())
}
