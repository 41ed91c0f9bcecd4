//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use congrega_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str = "data_dir, backend, remote_url, access_policy, admin_password, \
                          welcome_api_key, welcome_model, max_image_bytes, page_size, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config = Config::load_with_cli_override(config_path.map(PathBuf::as_path))
        .context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "backend": config.backend,
                    "remote_url": config.remote_url,
                    "access_policy": config.access_policy,
                    "admin_password_set": config.admin_password.is_some(),
                    "welcome_api_key_set": config.welcome_api_key.is_some(),
                    "welcome_model": config.welcome_model,
                    "max_image_bytes": config.max_image_bytes,
                    "page_size": config.page_size,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:        {}", config.data_dir.display());
            println!("  backend:         {}", config.backend);
            println!("  remote_url:      {}", or_unset(config.remote_url.as_deref()));
            println!("  access_policy:   {}", config.access_policy);
            println!("  admin_password:  {}", secret(&config.admin_password));
            println!("  welcome_api_key: {}", secret(&config.welcome_api_key));
            println!("  welcome_model:   {}", config.welcome_model);
            println!("  max_image_bytes: {}", config.max_image_bytes);
            println!("  page_size:       {}", config.page_size);
            println!(
                "  log_file:        {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config = Config::load_with_cli_override(config_path.map(PathBuf::as_path))
        .context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "admin_password" || key == "welcome_api_key" {
        "********"
    } else {
        value.as_str()
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => config.data_dir = value.into(),
        "backend" => config.backend = value.parse().map_err(anyhow::Error::msg)?,
        "remote_url" => config.remote_url = optional(value),
        "access_policy" => config.access_policy = value.parse().map_err(anyhow::Error::msg)?,
        "admin_password" => config.admin_password = optional(value),
        "welcome_api_key" => config.welcome_api_key = optional(value),
        "welcome_model" => config.welcome_model = value.to_string(),
        "max_image_bytes" => {
            config.max_image_bytes = value
                .parse()
                .context("Invalid value for max_image_bytes. Use a number of bytes.")?;
        }
        "page_size" => {
            let size: usize = value
                .parse()
                .context("Invalid value for page_size. Use a positive number.")?;
            if size == 0 {
                bail!("page_size must be at least 1");
            }
            config.page_size = size;
        }
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

/// Empty or "none" clears an optional value
fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

fn secret(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "(set)"
    } else {
        "(not set)"
    }
}
