use super::{App, print_message, print_outcome};
use anyhow::Result;

pub async fn start(app: &App, topic: Option<&str>, turns: usize) -> Result<()> {
    let outcome = app.engine.start(topic).await?;
    if !print_outcome(&outcome) {
        return Ok(());
    }
    step(app, turns.saturating_sub(1)).await
}

pub async fn step(app: &App, count: usize) -> Result<()> {
    for _ in 0..count {
        let outcome = app.engine.next_step().await?;
        if !print_outcome(&outcome) {
            break;
        }
    }
    Ok(())
}

pub async fn regenerate(app: &App, message_id: &str) -> Result<()> {
    let outcome = app.engine.regenerate_from(message_id).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn reset(app: &App) -> Result<()> {
    app.engine.reset().await?;
    println!("Conversation cleared.");
    Ok(())
}

pub async fn show(app: &App) -> Result<()> {
    let Some(session) = app.store.active_session().await else {
        println!("No active session.");
        return Ok(());
    };

    println!("# {} ({})", session.topic, session.id);
    for message in &session.messages {
        print_message(message);
    }

    let dialogue = app.store.dialogue().await;
    println!("status: {:?}, next: {}", dialogue.status, dialogue.next_turn_slot);
    if let Some(error) = dialogue.last_error {
        println!("last error: {error}");
    }
    Ok(())
}
