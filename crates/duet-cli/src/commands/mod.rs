pub mod dialogue;
pub mod sessions;
pub mod settings;
pub mod shared;
pub mod sync;
pub mod transfer;

use anyhow::Result;
use duet_application::{AppStore, TurnEngine, TurnOutcome};
use duet_core::config::AppConfig;
use duet_core::session::Message;
use duet_infrastructure::{ConfigService, DuetPaths, JsonStateRepository};
use duet_interaction::OpenAiCompatibleClient;
use std::sync::Arc;

/// Everything a command needs, wired from the on-disk configuration.
pub struct App {
    pub config: AppConfig,
    pub store: Arc<AppStore>,
    pub engine: TurnEngine,
}

impl App {
    pub async fn open(paths: DuetPaths) -> Result<Self> {
        let config = ConfigService::from_paths(&paths).get_config()?;
        let state_file = config
            .storage
            .state_file
            .clone()
            .unwrap_or_else(|| paths.state_file());
        tracing::debug!("[App] Using state file {:?}", state_file);

        let repository = Arc::new(JsonStateRepository::new(state_file));
        let store = Arc::new(AppStore::load(repository).await?);
        let client = Arc::new(OpenAiCompatibleClient::new(&config.generation)?);
        let engine = TurnEngine::new(store.clone(), client);

        Ok(Self {
            config,
            store,
            engine,
        })
    }
}

pub(crate) fn print_message(message: &Message) {
    println!("[{}] {}: {}", message.sender_slot, message.sender_name, message.content);
    println!("    id: {}", message.id);
}

/// Prints a turn result. Returns `false` when the dialogue cannot continue.
pub(crate) fn print_outcome(outcome: &TurnOutcome) -> bool {
    match outcome {
        TurnOutcome::Appended(message) => {
            print_message(message);
            true
        }
        TurnOutcome::Skipped => {
            println!("Nothing to do (no active session, or a generation is already running).");
            false
        }
        TurnOutcome::Failed(error) => {
            eprintln!("Generation failed: {error}");
            false
        }
        TurnOutcome::Discarded => {
            println!("The session was deleted while generating; result dropped.");
            false
        }
    }
}
