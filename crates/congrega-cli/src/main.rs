//! Congrega CLI
//!
//! Command-line interface for Congrega - congregation administration.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use congrega_core::Config;

mod app;
mod commands;
mod output;

use app::{App, Credentials};
use commands::event::EventFields;
use commands::member::MemberFields;
use commands::visitor::VisitorFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "congrega")]
#[command(about = "Congrega - members, visitors, events and prayer requests")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Administrator login (remote backend)
    #[arg(long, global = true, env = "CONGREGA_USER", default_value = "admin")]
    user: String,

    /// Administrator password; without it the session stays public
    #[arg(long, global = true, env = "CONGREGA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard and session status
    Status,
    /// Manage members (admin)
    #[command(alias = "members")]
    Member {
        #[command(subcommand)]
        command: MemberCommands,
    },
    /// Manage visitors (admin)
    #[command(alias = "visitors")]
    Visitor {
        #[command(subcommand)]
        command: VisitorCommands,
    },
    /// Events calendar
    #[command(alias = "events")]
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Prayer request board
    Prayer {
        #[command(subcommand)]
        command: PrayerCommands,
    },
    /// Weekly program
    Program {
        #[command(subcommand)]
        command: Option<ProgramCommands>,
    },
    /// Export a backup of all data (admin)
    Export {
        /// Output file ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with a backup (admin, local backend)
    Import {
        /// Backup file
        file: PathBuf,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete all data (admin, local backend)
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum MemberCommands {
    /// List members
    #[command(alias = "ls")]
    List {
        /// Filter by name, role or status
        #[arg(short, long)]
        search: Option<String>,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show member details
    Show {
        /// Member ID (full or prefix)
        id: String,
    },
    /// Add a member
    Add {
        /// Full name
        name: String,
        #[command(flatten)]
        fields: MemberFields,
    },
    /// Edit a member
    Edit {
        /// Member ID (full or prefix)
        id: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        fields: MemberFields,
    },
    /// Delete a member
    #[command(alias = "rm")]
    Delete {
        /// Member ID (full or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the WhatsApp link for a member
    Contact {
        /// Member ID (full or prefix)
        id: String,
        /// Open the link in the browser
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand)]
enum VisitorCommands {
    /// List visitors, most recent first
    #[command(alias = "ls")]
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Register a visitor
    Add {
        /// Full name
        name: String,
        #[command(flatten)]
        fields: VisitorFields,
    },
    /// Edit a visitor
    Edit {
        /// Visitor ID (full or prefix)
        id: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        #[command(flatten)]
        fields: VisitorFields,
    },
    /// Delete a visitor
    #[command(alias = "rm")]
    Delete {
        /// Visitor ID (full or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Turn a visitor into a member
    Convert {
        /// Visitor ID (full or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the WhatsApp link for a visitor
    Contact {
        /// Visitor ID (full or prefix)
        id: String,
        /// Open the link in the browser
        #[arg(long)]
        open: bool,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// List events by date
    #[command(alias = "ls")]
    List {
        /// Only events from today on
        #[arg(short, long)]
        upcoming: bool,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show event details
    Show {
        /// Event ID (full or prefix)
        id: String,
    },
    /// Add an event
    Add {
        /// Event name
        name: String,
        /// Date (YYYY-MM-DD)
        date: String,
        /// Time (HH:MM)
        time: String,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Edit an event
    Edit {
        /// Event ID (full or prefix)
        id: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// New time (HH:MM)
        #[arg(short, long)]
        time: Option<String>,
        #[command(flatten)]
        fields: EventFields,
        /// Remove the attached image
        #[arg(long, conflicts_with = "image")]
        remove_image: bool,
    },
    /// Delete an event
    #[command(alias = "rm")]
    Delete {
        /// Event ID (full or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PrayerCommands {
    /// Show the prayer board
    #[command(alias = "ls")]
    List {
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Post a prayer request
    Add {
        /// The request
        request: String,
        /// Your name
        #[arg(short, long)]
        name: Option<String>,
        /// Post without a name
        #[arg(short, long)]
        anonymous: bool,
    },
    /// Edit a prayer request (admin)
    Edit {
        /// Request ID (full or prefix)
        id: String,
        /// New text
        #[arg(short, long)]
        request: Option<String>,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// Set anonymity (true or false)
        #[arg(short, long)]
        anonymous: Option<bool>,
    },
    /// Delete a prayer request (admin)
    #[command(alias = "rm")]
    Delete {
        /// Request ID (full or prefix)
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ProgramCommands {
    /// Show the weekly program
    Show,
    /// Replace the weekly program (admin)
    Set {
        /// Program text ("-" or omitted reads stdin)
        text: Option<String>,
        /// Read the program from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (backend, remote_url, access_policy, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't open a session
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let credentials = Credentials {
        user: cli.user,
        password: cli.password.filter(|p| !p.is_empty()),
    };
    let mut app = App::open(config, &credentials).await?;

    let result = run(cli.command.unwrap_or(Commands::Status), &mut app, &output).await;

    app.close(&output);
    result
}

async fn run(command: Commands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        Commands::Status => commands::status::show(app, output),
        Commands::Member { command } => handle_member_command(command, app, output).await,
        Commands::Visitor { command } => handle_visitor_command(command, app, output).await,
        Commands::Event { command } => handle_event_command(command, app, output).await,
        Commands::Prayer { command } => handle_prayer_command(command, app, output).await,
        Commands::Program { command } => match command {
            Some(ProgramCommands::Show) | None => commands::program::show(app, output),
            Some(ProgramCommands::Set { text, file }) => {
                commands::program::set(app, text, file, output).await
            }
        },
        Commands::Export { output: path } => commands::database::export(app, path, output),
        Commands::Import { file, yes } => commands::database::import(app, file, yes, output).await,
        Commands::Reset { yes } => commands::database::reset(app, yes, output).await,
        Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

async fn handle_member_command(
    command: MemberCommands,
    app: &mut App,
    output: &Output,
) -> Result<()> {
    match command {
        MemberCommands::List { search, page } => {
            commands::member::list(app, search, page, output)
        }
        MemberCommands::Show { id } => commands::member::show(app, id, output),
        MemberCommands::Add { name, fields } => {
            commands::member::add(app, name, fields, output).await
        }
        MemberCommands::Edit { id, name, fields } => {
            commands::member::edit(app, id, name, fields, output).await
        }
        MemberCommands::Delete { id, yes } => commands::member::delete(app, id, yes, output).await,
        MemberCommands::Contact { id, open } => commands::member::contact(app, id, open, output),
    }
}

async fn handle_visitor_command(
    command: VisitorCommands,
    app: &mut App,
    output: &Output,
) -> Result<()> {
    match command {
        VisitorCommands::List { page } => commands::visitor::list(app, page, output),
        VisitorCommands::Add { name, fields } => {
            commands::visitor::add(app, name, fields, output).await
        }
        VisitorCommands::Edit { id, name, fields } => {
            commands::visitor::edit(app, id, name, fields, output).await
        }
        VisitorCommands::Delete { id, yes } => {
            commands::visitor::delete(app, id, yes, output).await
        }
        VisitorCommands::Convert { id, yes } => {
            commands::visitor::convert(app, id, yes, output).await
        }
        VisitorCommands::Contact { id, open } => {
            commands::visitor::contact(app, id, open, output)
        }
    }
}

async fn handle_event_command(command: EventCommands, app: &mut App, output: &Output) -> Result<()> {
    match command {
        EventCommands::List { upcoming, page } => {
            commands::event::list(app, upcoming, page, output)
        }
        EventCommands::Show { id } => commands::event::show(app, id, output),
        EventCommands::Add {
            name,
            date,
            time,
            fields,
        } => commands::event::add(app, name, date, time, fields, output).await,
        EventCommands::Edit {
            id,
            name,
            date,
            time,
            fields,
            remove_image,
        } => {
            commands::event::edit(app, id, name, date, time, fields, remove_image, output).await
        }
        EventCommands::Delete { id, yes } => commands::event::delete(app, id, yes, output).await,
    }
}

async fn handle_prayer_command(
    command: PrayerCommands,
    app: &mut App,
    output: &Output,
) -> Result<()> {
    match command {
        PrayerCommands::List { page } => commands::prayer::list(app, page, output),
        PrayerCommands::Add {
            request,
            name,
            anonymous,
        } => commands::prayer::add(app, request, name, anonymous, output).await,
        PrayerCommands::Edit {
            id,
            request,
            name,
            anonymous,
        } => commands::prayer::edit(app, id, request, name, anonymous, output).await,
        PrayerCommands::Delete { id, yes } => commands::prayer::delete(app, id, yes, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if CONGREGA_LOG is set (e.g. `debug`). Logs go to
/// config.log_file when set, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("CONGREGA_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "congrega_core={},congrega_cli={}",
        log_level, log_level
    ));

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_member_add_with_fields() {
        let cli = Cli::try_parse_from([
            "congrega",
            "member",
            "add",
            "Ana Souza",
            "--role",
            "Diácono",
            "--status",
            "inativo",
            "--password",
            "igreja2024",
        ])
        .unwrap();

        assert_eq!(cli.password.as_deref(), Some("igreja2024"));
        match cli.command {
            Some(Commands::Member {
                command: MemberCommands::Add { name, fields },
            }) => {
                assert_eq!(name, "Ana Souza");
                assert_eq!(fields.role.as_deref(), Some("Diácono"));
                assert_eq!(fields.status, Some(congrega_core::MemberStatus::Inactive));
            }
            _ => panic!("expected member add"),
        }
    }

    #[test]
    fn test_parse_event_edit_image_flags_conflict() {
        let result = Cli::try_parse_from([
            "congrega",
            "event",
            "edit",
            "abc",
            "--image",
            "flyer.png",
            "--remove-image",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_prayer_add_anonymous() {
        let cli =
            Cli::try_parse_from(["congrega", "prayer", "add", "Pela família", "-a"]).unwrap();
        match cli.command {
            Some(Commands::Prayer {
                command:
                    PrayerCommands::Add {
                        request, anonymous, ..
                    },
            }) => {
                assert_eq!(request, "Pela família");
                assert!(anonymous);
            }
            _ => panic!("expected prayer add"),
        }
    }
}
