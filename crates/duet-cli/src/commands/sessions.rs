use super::App;
use anyhow::Result;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum SessionAction {
    /// List sessions, newest first
    List,
    /// Create a session and make it active
    New { topic: Option<String> },
    /// Make a session active
    Switch { id: String },
    /// Change a session's title
    Rename { id: String, title: String },
    /// Delete a session
    Delete { id: String },
}

pub async fn run(app: &App, action: SessionAction) -> Result<()> {
    let store = &app.store;
    match action {
        SessionAction::List => {
            let active = store.active_session().await.map(|s| s.id);
            for session in store.sessions().await {
                let marker = if Some(&session.id) == active.as_ref() { "*" } else { " " };
                println!(
                    "{} {}  {}  ({} messages)  {}",
                    marker,
                    session.id,
                    session.topic,
                    session.messages.len(),
                    session.preview
                );
            }
        }
        SessionAction::New { topic } => {
            let session = store.create_session(topic.as_deref()).await?;
            println!("Created session {} \"{}\"", session.id, session.topic);
        }
        SessionAction::Switch { id } => {
            let session = store.switch_session(&id).await?;
            println!("Active session: {} \"{}\"", session.id, session.topic);
        }
        SessionAction::Rename { id, title } => {
            store.rename_session(&id, &title).await?;
            println!("Renamed {id}");
        }
        SessionAction::Delete { id } => {
            let outcome = store.delete_session(&id).await?;
            println!("Deleted {id}");
            if outcome.was_active {
                match outcome.activated {
                    Some(next) => println!("Active session: {next}"),
                    None => println!("No sessions left."),
                }
            }
        }
    }
    Ok(())
}
