//! Status command handler

use anyhow::Result;
use chrono::Local;

use congrega_core::{Backend, Role, View};

use crate::app::App;
use crate::output::{Output, OutputFormat};

/// Show the dashboard plus session and backend information
pub fn show(app: &mut App, output: &Output) -> Result<()> {
    app.enter(View::Dashboard)?;

    let config = &app.config;
    let session = app.controller.session();
    let summary = app.controller.dashboard(Local::now().naive_local());
    let role = match session.role() {
        Role::Admin => "admin",
        Role::Public => "public",
    };
    let location = match config.backend {
        Backend::Local => config.local_store_path().display().to_string(),
        Backend::Remote => config.remote_url.clone().unwrap_or_default(),
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": config.backend,
                    "location": location,
                    "role": role,
                    "access_policy": session.policy(),
                    "dashboard": {
                        "active_members": summary.active_members,
                        "visitors": summary.visitors,
                        "upcoming_events": summary.upcoming_events.len(),
                        "prayer_requests": summary.prayer_requests
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", role);
        }
        OutputFormat::Human => {
            println!("Congrega Status");
            println!("===============");
            println!();
            println!("Store:");
            println!("  Backend:  {}", config.backend);
            println!("  Location: {}", location);
            println!();
            println!("Session:");
            println!("  Role:          {}", role);
            println!("  Access policy: {}", session.policy());
            println!();
            println!("{}:", View::Dashboard.title());
            output.print_dashboard(&summary);
        }
    }

    Ok(())
}
