//! SyncCoordinator - authenticated push/pull against the remote store.
//!
//! Triggers:
//! - sign-in: one combined pull, merge, push of locally newer sessions
//! - settings change: debounced upsert of the full settings snapshot
//! - sessions change: longer debounced upsert of the active session plus
//!   recently updated ones
//! - sign-out: clears the user and cancels pending timers

use super::debounce::DebounceTimer;
use crate::store::{AppStore, StoreChange};
use duet_core::clock;
use duet_core::config::SyncSettings;
use duet_core::error::Result;
use duet_core::session::Session;
use duet_core::sync::{RemoteStore, SessionRow, SettingsRecord, SyncState, SyncStatus};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

/// Keeps the local store and the remote store in step for one signed-in user.
///
/// Local changes are pushed after a debounce, one timer per kind of change.
/// Signing in pulls both remote tables and merges them into the store.
/// While signed out every push is a no-op.
pub struct SyncCoordinator {
    store: Arc<AppStore>,
    remote: Arc<dyn RemoteStore>,
    settings: SyncSettings,
    state: RwLock<SyncState>,
    settings_timer: DebounceTimer,
    sessions_timer: DebounceTimer,
    status_timer: DebounceTimer,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SyncCoordinator {
    /// Creates a signed-out coordinator. Call [`start`](Self::start) to
    /// begin listening for store changes.
    pub fn new(store: Arc<AppStore>, remote: Arc<dyn RemoteStore>, settings: SyncSettings) -> Arc<Self> {
        Arc::new(Self {
            settings_timer: DebounceTimer::new(settings.settings_debounce()),
            sessions_timer: DebounceTimer::new(settings.sessions_debounce()),
            status_timer: DebounceTimer::new(settings.status_display()),
            store,
            remote,
            settings,
            state: RwLock::new(SyncState::default()),
            listener: Mutex::new(None),
        })
    }

    /// Starts listening to store changes.
    ///
    /// The listener holds a weak reference and ends when the coordinator is
    /// dropped or the store's channel closes.
    pub fn start(self: &Arc<Self>) {
        let mut receiver = self.store.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let change = receiver.recv().await;
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                match change {
                    Ok(StoreChange::Settings) => coordinator.on_settings_changed().await,
                    Ok(StoreChange::Sessions) => coordinator.on_sessions_changed().await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("[SyncCoordinator] Missed {} change notification(s)", skipped);
                        coordinator.on_settings_changed().await;
                        coordinator.on_sessions_changed().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("[SyncCoordinator] Change listener stopped");
        });

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Current user, status and last error.
    pub async fn state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    /// Signs `user_id` in and reconciles local and remote data.
    ///
    /// Failures are recorded in the sync state and also returned.
    pub async fn sign_in(self: &Arc<Self>, user_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.authenticated_user_id = Some(user_id.to_string());
        }
        tracing::info!("[SyncCoordinator] Signed in as {}", user_id);

        self.set_status(SyncStatus::Syncing).await;
        let result = self.pull_and_merge(user_id).await;
        self.finish(result.as_ref().map(|_| ()).map_err(|e| e.to_string()))
            .await;
        result.map(|_| ())
    }

    async fn pull_and_merge(&self, user_id: &str) -> Result<usize> {
        let (settings, remote_sessions) = tokio::try_join!(
            self.remote.fetch_settings(user_id),
            self.remote.fetch_sessions(user_id)
        )?;

        if let Some(settings) = settings {
            self.store.apply_remote_settings(settings).await?;
        }

        let to_push = self.store.merge_remote_sessions(&remote_sessions).await?;
        tracing::info!(
            "[SyncCoordinator] Pulled {} remote session(s), pushing {}",
            remote_sessions.len(),
            to_push.len()
        );

        if !to_push.is_empty() {
            let rows = to_rows(user_id, &to_push);
            self.remote.upsert_sessions(&rows).await?;
        }
        Ok(to_push.len())
    }

    /// Clears the user and cancels pending pushes.
    pub async fn sign_out(&self) {
        self.settings_timer.cancel();
        self.sessions_timer.cancel();
        self.status_timer.cancel();

        let mut state = self.state.write().await;
        tracing::info!(
            "[SyncCoordinator] Signed out {:?}",
            state.authenticated_user_id
        );
        *state = SyncState::default();
    }

    /// Schedules a settings push if signed in.
    pub async fn on_settings_changed(self: &Arc<Self>) {
        if !self.state.read().await.is_authenticated() {
            return;
        }
        let coordinator = Arc::clone(self);
        self.settings_timer.schedule(async move {
            coordinator.push_settings().await;
        });
    }

    /// Schedules a sessions push if signed in.
    pub async fn on_sessions_changed(self: &Arc<Self>) {
        if !self.state.read().await.is_authenticated() {
            return;
        }
        let coordinator = Arc::clone(self);
        self.sessions_timer.schedule(async move {
            coordinator.push_sessions().await;
        });
    }

    /// Pushes settings and recent sessions immediately, bypassing the
    /// debounce timers.
    pub async fn push_now(self: &Arc<Self>) -> Result<()> {
        self.settings_timer.cancel();
        self.sessions_timer.cancel();
        let Some(user_id) = self.user_id().await else {
            return Ok(());
        };

        self.set_status(SyncStatus::Syncing).await;
        let result = async {
            self.upsert_settings(&user_id).await?;
            self.upsert_recent_sessions(&user_id).await
        }
        .await;
        self.finish(result.as_ref().map(|_| ()).map_err(|e| e.to_string()))
            .await;
        result
    }

    async fn push_settings(self: Arc<Self>) {
        let Some(user_id) = self.user_id().await else {
            return;
        };
        self.set_status(SyncStatus::Syncing).await;
        let result = self.upsert_settings(&user_id).await;
        self.finish(result.map_err(|e| e.to_string())).await;
    }

    async fn push_sessions(self: Arc<Self>) {
        let Some(user_id) = self.user_id().await else {
            return;
        };
        self.set_status(SyncStatus::Syncing).await;
        let result = self.upsert_recent_sessions(&user_id).await;
        self.finish(result.map_err(|e| e.to_string())).await;
    }

    async fn upsert_settings(&self, user_id: &str) -> Result<()> {
        let record = SettingsRecord {
            user_id: user_id.to_string(),
            settings: self.store.settings_snapshot().await,
            updated_at: clock::now_rfc3339(),
        };
        self.remote.upsert_settings(&record).await
    }

    async fn upsert_recent_sessions(&self, user_id: &str) -> Result<()> {
        let window_ms = self.settings.recency_window().as_millis() as i64;
        let now = clock::now_millis();
        let sessions: Vec<Session> = self
            .store
            .read(|state| {
                let active_id = state.sessions.active_session_id();
                state
                    .sessions
                    .sessions()
                    .iter()
                    .filter(|s| Some(s.id.as_str()) == active_id || now - s.updated_at <= window_ms)
                    .cloned()
                    .collect()
            })
            .await;

        if sessions.is_empty() {
            return Ok(());
        }
        tracing::debug!("[SyncCoordinator] Pushing {} session(s)", sessions.len());
        self.remote.upsert_sessions(&to_rows(user_id, &sessions)).await
    }

    async fn user_id(&self) -> Option<String> {
        self.state.read().await.authenticated_user_id.clone()
    }

    async fn set_status(&self, status: SyncStatus) {
        self.state.write().await.sync_status = status;
    }

    /// Records the outcome and schedules the revert to `idle`.
    async fn finish(self: &Arc<Self>, result: std::result::Result<(), String>) {
        {
            let mut state = self.state.write().await;
            match result {
                Ok(()) => {
                    state.sync_status = SyncStatus::Saved;
                    state.last_synced_at = Some(clock::now_millis());
                    state.last_error = None;
                }
                Err(message) => {
                    tracing::error!("[SyncCoordinator] Sync failed: {}", message);
                    state.sync_status = SyncStatus::Error;
                    state.last_error = Some(message);
                }
            }
        }

        let coordinator = Arc::clone(self);
        self.status_timer.schedule(async move {
            let mut state = coordinator.state.write().await;
            if matches!(state.sync_status, SyncStatus::Saved | SyncStatus::Error) {
                state.sync_status = SyncStatus::Idle;
            }
        });
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}

fn to_rows(user_id: &str, sessions: &[Session]) -> Vec<SessionRow> {
    sessions
        .iter()
        .map(|session| SessionRow::from_session(user_id, session))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use duet_core::connection::NewConnectionProfile;
    use duet_core::error::DuetError;
    use duet_core::participant::{GenerationConfig, Slot};
    use duet_core::state::{StateDocument, StateRepository};
    use duet_core::sync::SettingsSnapshot;
    use std::time::Duration;

    struct NullStateRepository;

    #[async_trait]
    impl StateRepository for NullStateRepository {
        async fn load(&self) -> Result<Option<StateDocument>> {
            Ok(None)
        }

        async fn save(&self, _document: &StateDocument) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRemoteStore {
        remote_sessions: Vec<Session>,
        settings_pushes: Mutex<Vec<SettingsRecord>>,
        session_pushes: Mutex<Vec<Vec<SessionRow>>>,
        fail_fetch: bool,
    }

    #[async_trait]
    impl RemoteStore for MockRemoteStore {
        async fn fetch_settings(&self, _user_id: &str) -> Result<Option<SettingsSnapshot>> {
            if self.fail_fetch {
                return Err(DuetError::sync("relation \"profiles\" does not exist"));
            }
            Ok(None)
        }

        async fn upsert_settings(&self, record: &SettingsRecord) -> Result<()> {
            self.settings_pushes.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn fetch_sessions(&self, _user_id: &str) -> Result<Vec<Session>> {
            Ok(self.remote_sessions.clone())
        }

        async fn upsert_sessions(&self, rows: &[SessionRow]) -> Result<()> {
            self.session_pushes.lock().unwrap().push(rows.to_vec());
            Ok(())
        }
    }

    fn session(topic: &str, updated_at: i64) -> Session {
        let mut session = Session::new(
            topic,
            GenerationConfig::default_for(Slot::A),
            GenerationConfig::default_for(Slot::B),
        );
        session.updated_at = updated_at;
        session
    }

    async fn setup(remote: MockRemoteStore) -> (Arc<AppStore>, Arc<MockRemoteStore>, Arc<SyncCoordinator>) {
        let store = Arc::new(AppStore::load(Arc::new(NullStateRepository)).await.unwrap());
        let remote = Arc::new(remote);
        let coordinator = SyncCoordinator::new(store.clone(), remote.clone(), SyncSettings::default());
        coordinator.start();
        (store, remote, coordinator)
    }

    fn profile(name: &str) -> NewConnectionProfile {
        NewConnectionProfile {
            name: name.to_string(),
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_merges_and_pushes_local_only_sessions() {
        let remote_only = session("from another device", 1_000);
        let (store, remote, coordinator) = setup(MockRemoteStore {
            remote_sessions: vec![remote_only.clone()],
            ..Default::default()
        })
        .await;
        let local = store.create_session(Some("local")).await.unwrap();

        coordinator.sign_in("user-1").await.unwrap();

        let ids: Vec<String> = store.sessions().await.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![local.id.clone(), remote_only.id.clone()]);

        let pushes = remote.session_pushes.lock().unwrap().clone();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0][0].session_id, local.id);
        assert_eq!(pushes[0][0].user_id, "user-1");

        let state = coordinator.state().await;
        assert_eq!(state.sync_status, SyncStatus::Saved);
        assert!(state.last_synced_at.is_some());

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(coordinator.state().await.sync_status, SyncStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adopted_remote_data_is_not_pushed_back() {
        let (_store, remote, coordinator) = setup(MockRemoteStore {
            remote_sessions: vec![session("remote", 1_000)],
            ..Default::default()
        })
        .await;

        coordinator.sign_in("user-1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(remote.settings_pushes.lock().unwrap().is_empty());
        assert!(remote.session_pushes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settings_burst_is_pushed_once() {
        let (store, remote, coordinator) = setup(MockRemoteStore::default()).await;
        coordinator.sign_in("user-1").await.unwrap();

        for name in ["one", "two", "three"] {
            store.add_connection_profile(profile(name)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        let pushes = remote.settings_pushes.lock().unwrap().clone();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].user_id, "user-1");
        assert_eq!(pushes[0].settings.connection_profiles.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_edits_wait_for_longer_debounce() {
        let (store, remote, coordinator) = setup(MockRemoteStore::default()).await;
        coordinator.sign_in("user-1").await.unwrap();

        let created = store.create_session(Some("Cats vs Dogs")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(remote.session_pushes.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        let pushes = remote.session_pushes.lock().unwrap().clone();
        assert_eq!(pushes.len(), 1);
        assert!(pushes[0].iter().any(|row| row.session_id == created.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_ignored_when_signed_out() {
        let (store, remote, _coordinator) = setup(MockRemoteStore::default()).await;

        store.add_connection_profile(profile("one")).await.unwrap();
        store.create_session(None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(remote.settings_pushes.lock().unwrap().is_empty());
        assert!(remote.session_pushes.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_cancels_pending_push() {
        let (store, remote, coordinator) = setup(MockRemoteStore::default()).await;
        coordinator.sign_in("user-1").await.unwrap();

        store.add_connection_profile(profile("one")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        coordinator.sign_out().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(remote.settings_pushes.lock().unwrap().is_empty());
        assert!(!coordinator.state().await.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sign_in_records_error_then_reverts() {
        let (_store, _remote, coordinator) = setup(MockRemoteStore {
            fail_fetch: true,
            ..Default::default()
        })
        .await;

        let err = coordinator.sign_in("user-1").await.unwrap_err();
        assert!(err.is_sync());

        let state = coordinator.state().await;
        assert_eq!(state.sync_status, SyncStatus::Error);
        assert!(state.last_error.unwrap().contains("profiles"));

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(coordinator.state().await.sync_status, SyncStatus::Idle);
    }
}
