use super::App;
use anyhow::{Context, Result};
use duet_application::SyncCoordinator;
use duet_infrastructure::RestRemoteStore;
use std::sync::Arc;

/// One-shot sync: sign in (pull, merge, push locally newer sessions), then
/// push settings and recently edited sessions.
pub async fn sync(app: &App, user: Option<String>) -> Result<()> {
    let user_id = user
        .or_else(|| app.config.remote.user_id.clone())
        .context("No user id: pass --user or set remote.user_id in config.toml")?;

    let remote = Arc::new(RestRemoteStore::from_settings(
        &app.config.remote,
        app.config.generation.request_timeout(),
    )?);
    let coordinator = SyncCoordinator::new(app.store.clone(), remote, app.config.sync.clone());

    coordinator.sign_in(&user_id).await?;
    coordinator.push_now().await?;

    let state = coordinator.state().await;
    println!(
        "Synced {} session(s) for {} ({:?})",
        app.store.sessions().await.len(),
        user_id,
        state.sync_status
    );
    coordinator.sign_out().await;
    Ok(())
}
