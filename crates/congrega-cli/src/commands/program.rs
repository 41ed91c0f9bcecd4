//! Weekly program command handlers

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use congrega_core::{EntityKind, View};

use crate::app::App;
use crate::output::Output;

pub fn show(app: &mut App, output: &Output) -> Result<()> {
    app.enter(View::Program)?;
    output.print_program(app.controller.program());
    Ok(())
}

/// Replace the program with new text
///
/// The text comes from the argument, a file, or stdin (`-`).
pub async fn set(
    app: &mut App,
    text: Option<String>,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    app.enter(View::Program)?;

    let text = match (text, file) {
        (Some(text), None) if text == "-" => read_stdin()?,
        (Some(text), None) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        (None, None) => read_stdin()?,
        (Some(_), Some(_)) => bail!("Give the program text or --file, not both"),
    };

    app.controller.save_program(&text).await?;
    app.settle(&[EntityKind::Program]).await;

    output.success("Programação salva!");
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read program from stdin")?;
    Ok(text)
}
