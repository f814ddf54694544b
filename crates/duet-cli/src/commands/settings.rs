use super::App;
use anyhow::Result;
use clap::Subcommand;
use duet_core::connection::NewConnectionProfile;
use duet_core::participant::Slot;
use duet_core::persona::NewPersona;

#[derive(Subcommand)]
pub enum ProfileAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Leave empty for mock responses
        #[arg(long, default_value = "")]
        api_key: String,
        #[arg(long)]
        model: String,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PersonaAction {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        system_prompt: String,
        /// Connection profile id
        #[arg(long)]
        profile: String,
    },
    Remove {
        id: String,
    },
}

pub async fn run_profiles(app: &App, action: ProfileAction) -> Result<()> {
    let store = &app.store;
    match action {
        ProfileAction::List => {
            for profile in store.connection_profiles().await {
                let key = if profile.api_key.is_empty() { "mock" } else { "key set" };
                println!("{}  {}  {}  {} ({})", profile.id, profile.name, profile.url, profile.model, key);
            }
        }
        ProfileAction::Add {
            name,
            url,
            api_key,
            model,
        } => {
            let profile = store
                .add_connection_profile(NewConnectionProfile {
                    name,
                    url,
                    api_key,
                    model,
                })
                .await?;
            println!("Added profile {}", profile.id);
        }
        ProfileAction::Remove { id } => {
            store.remove_connection_profile(&id).await?;
            println!("Removed profile {id}");
        }
    }
    Ok(())
}

pub async fn run_personas(app: &App, action: PersonaAction) -> Result<()> {
    let store = &app.store;
    match action {
        PersonaAction::List => {
            for persona in store.personas().await {
                println!("{}  {}  (profile {})", persona.id, persona.name, persona.connection_profile_id);
            }
        }
        PersonaAction::Add {
            name,
            system_prompt,
            profile,
        } => {
            let persona = store
                .add_persona(NewPersona {
                    name,
                    system_prompt,
                    connection_profile_id: profile,
                })
                .await?;
            println!("Added persona {}", persona.id);
        }
        PersonaAction::Remove { id } => {
            store.remove_persona(&id).await?;
            println!("Removed persona {id}");
        }
    }
    Ok(())
}

pub async fn select(app: &App, slot: &str, persona_id: &str) -> Result<()> {
    let slot: Slot = slot.parse().map_err(anyhow::Error::msg)?;
    let config = app.store.select_persona(slot, persona_id).await?;
    println!("Slot {slot} is now {} ({})", config.name, config.model);
    Ok(())
}

/// Sends a one-token request through a connection profile.
pub async fn test_connection(app: &App, profile_id: &str) -> Result<()> {
    let result = app.engine.test_connection(profile_id).await?;
    let verdict = if result.success { "ok" } else { "failed" };
    println!("{verdict}: {} ({} ms)", result.message, result.latency_ms);
    if let Some(window) = result.context_window {
        println!("context window: {window}");
    }
    Ok(())
}
