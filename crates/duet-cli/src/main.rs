use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::App;

#[derive(Parser)]
#[command(name = "duet")]
#[command(about = "DUET - two personas, one conversation", long_about = None)]
struct Cli {
    /// Directory holding config.toml, state.json and logs
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Echo debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dialogue on a topic (slot A opens)
    Start {
        topic: Option<String>,
        /// Total turns to generate, including the opener
        #[arg(short, long, default_value_t = 1)]
        turns: usize,
    },
    /// Generate the next turn(s) of the active session
    Step {
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Drop a message and everything after it, then regenerate
    Regenerate { message_id: String },
    /// Clear the active session's transcript
    Reset,
    /// Print the active session's transcript
    Show,
    /// Manage sessions
    Sessions {
        #[command(subcommand)]
        action: commands::sessions::SessionAction,
    },
    /// Manage connection profiles
    Profiles {
        #[command(subcommand)]
        action: commands::settings::ProfileAction,
    },
    /// Manage personas
    Personas {
        #[command(subcommand)]
        action: commands::settings::PersonaAction,
    },
    /// Put a persona into slot A or B
    Select { slot: String, persona_id: String },
    /// Send a one-token request through a connection profile
    TestConnection { profile_id: String },
    /// Write the state export JSON (slot configs and sessions)
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace local state from an export file
    Import { file: PathBuf },
    /// Sign in, reconcile with the remote store and push recent changes
    Sync {
        /// Overrides remote.user_id from config.toml
        #[arg(long)]
        user: Option<String>,
    },
    /// View a shared transcript by link or share id
    Shared {
        link: String,
        /// Show up to this message instead of the one in the link
        #[arg(long)]
        at: Option<String>,
        /// Advance one message past the current position
        #[arg(long)]
        next: bool,
    },
    /// Print the viewer link for a share id
    ShareLink {
        share_id: String,
        #[arg(long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = duet_infrastructure::DuetPaths::new(cli.home.clone())?;
    let _guard = logging::init(&paths.logs_dir(), cli.verbose)?;
    tracing::info!("Starting duet");

    let app = App::open(paths).await?;
    let result = run(&app, cli.command).await;

    if let Err(e) = app.store.flush().await {
        tracing::error!("Failed to flush state on exit: {}", e);
    }
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Start { topic, turns } => commands::dialogue::start(app, topic.as_deref(), turns).await,
        Commands::Step { count } => commands::dialogue::step(app, count).await,
        Commands::Regenerate { message_id } => commands::dialogue::regenerate(app, &message_id).await,
        Commands::Reset => commands::dialogue::reset(app).await,
        Commands::Show => commands::dialogue::show(app).await,
        Commands::Sessions { action } => commands::sessions::run(app, action).await,
        Commands::Profiles { action } => commands::settings::run_profiles(app, action).await,
        Commands::Personas { action } => commands::settings::run_personas(app, action).await,
        Commands::Select { slot, persona_id } => commands::settings::select(app, &slot, &persona_id).await,
        Commands::TestConnection { profile_id } => commands::settings::test_connection(app, &profile_id).await,
        Commands::Export { output } => commands::transfer::export(app, output).await,
        Commands::Import { file } => commands::transfer::import(app, &file).await,
        Commands::Sync { user } => commands::sync::sync(app, user).await,
        Commands::Shared { link, at, next } => commands::shared::view(app, &link, at, next).await,
        Commands::ShareLink { share_id, message } => {
            commands::shared::print_link(app, &share_id, message.as_deref());
            Ok(())
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
    fn test_parses_start_with_turns() {
        let cli = Cli::try_parse_from(["duet", "start", "Cats vs Dogs", "--turns", "4"]).unwrap();
        match cli.command {
            Commands::Start { topic, turns } => {
                assert_eq!(topic.as_deref(), Some("Cats vs Dogs"));
                assert_eq!(turns, 4);
            }
            _ => panic!("expected start"),
        }
    }
}
