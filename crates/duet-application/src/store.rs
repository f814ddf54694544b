//! AppStore - the single owner of settings, sessions and live dialogue state.
//!
//! Every mutation goes through [`AppStore::mutate`], which applies the change
//! under the write lock, snapshots the persisted document, releases the lock,
//! then writes the snapshot and broadcasts what changed. Snapshots are
//! written in mutation order; a stale snapshot never overwrites a newer one.

use duet_core::connection::{ConnectionProfile, ConnectionProfilePatch, NewConnectionProfile};
use duet_core::dialogue::{DialogueState, DialogueStatus};
use duet_core::error::{DuetError, Result};
use duet_core::participant::{self, GenerationConfig, Slot};
use duet_core::persona::{NewPersona, Persona, PersonaPatch};
use duet_core::session::{DeleteOutcome, Session, SessionRepository};
use duet_core::state::{StateDocument, StateExport, StateImport, StateRepository};
use duet_core::sync::{self, SettingsSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, broadcast};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// What a committed mutation touched, as seen by sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    /// Profiles, personas or slot configurations
    Settings,
    /// Session contents or the session set
    Sessions,
}

/// Change flags collected during one mutation.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    settings: bool,
    sessions: bool,
    /// Persist without notifying sync (active pointer moves, remote adoption)
    local: bool,
}

impl ChangeSet {
    pub(crate) fn settings(&mut self) {
        self.settings = true;
    }

    pub(crate) fn sessions(&mut self) {
        self.sessions = true;
    }

    pub(crate) fn local(&mut self) {
        self.local = true;
    }

    fn needs_persist(&self) -> bool {
        self.settings || self.sessions || self.local
    }

    fn notify(&self, sender: &broadcast::Sender<StoreChange>) {
        // No receivers is fine: sync may not be running.
        if self.settings {
            let _ = sender.send(StoreChange::Settings);
        }
        if self.sessions {
            let _ = sender.send(StoreChange::Sessions);
        }
    }
}

/// In-memory application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub connection_profiles: Vec<ConnectionProfile>,
    pub personas: Vec<Persona>,
    pub config_a: GenerationConfig,
    pub config_b: GenerationConfig,
    pub sessions: SessionRepository,
    pub dialogue: DialogueState,
    /// Session id -> ticket of the generation running for it
    pub(crate) in_flight: HashMap<String, u64>,
    next_ticket: u64,
}

impl AppState {
    fn from_document(document: StateDocument) -> Self {
        let sessions = SessionRepository::from_parts(document.sessions, document.active_session_id);
        let dialogue = sessions
            .active()
            .map(DialogueState::for_session)
            .unwrap_or_default();

        Self {
            connection_profiles: document.connection_profiles,
            personas: document.personas,
            config_a: document.config_a,
            config_b: document.config_b,
            sessions,
            dialogue,
            in_flight: HashMap::new(),
            next_ticket: 0,
        }
    }

    fn to_document(&self) -> StateDocument {
        StateDocument {
            connection_profiles: self.connection_profiles.clone(),
            personas: self.personas.clone(),
            config_a: self.config_a.clone(),
            config_b: self.config_b.clone(),
            sessions: self.sessions.sessions().to_vec(),
            active_session_id: self.sessions.active_session_id().map(str::to_string),
        }
    }

    /// Live configuration of `slot`.
    pub fn config_for(&self, slot: Slot) -> &GenerationConfig {
        match slot {
            Slot::A => &self.config_a,
            Slot::B => &self.config_b,
        }
    }

    fn set_live_config(&mut self, config: GenerationConfig) {
        match config.slot {
            Slot::A => self.config_a = config,
            Slot::B => self.config_b = config,
        }
    }

    /// The settings half of the state, as synced to the remote store.
    pub fn settings_snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            connection_profiles: self.connection_profiles.clone(),
            personas: self.personas.clone(),
            config_a: self.config_a.clone(),
            config_b: self.config_b.clone(),
        }
    }

    /// Whether a generation may not start for the active session.
    pub fn is_generation_gated(&self) -> bool {
        self.dialogue.is_generating()
            || self
                .sessions
                .active_session_id()
                .is_some_and(|id| self.in_flight.contains_key(id))
    }

    /// Registers a generation for `session_id` and returns its ticket.
    pub(crate) fn begin_in_flight(&mut self, session_id: &str) -> u64 {
        self.next_ticket += 1;
        self.in_flight.insert(session_id.to_string(), self.next_ticket);
        self.next_ticket
    }

    /// Removes the in-flight entry if it still belongs to `ticket`.
    ///
    /// Returns `false` when the generation was invalidated in the meantime.
    pub(crate) fn finish_in_flight(&mut self, session_id: &str, ticket: u64) -> bool {
        if self.in_flight.get(session_id) == Some(&ticket) {
            self.in_flight.remove(session_id);
            true
        } else {
            false
        }
    }

    /// Rebuilds the dialogue state after the active session changed.
    fn reset_dialogue_for_active(&mut self) {
        self.dialogue = match self.sessions.active() {
            Some(session) => {
                let mut dialogue = DialogueState::for_session(session);
                if self.in_flight.contains_key(&session.id) {
                    dialogue.status = DialogueStatus::Generating;
                }
                dialogue
            }
            None => DialogueState::default(),
        };
    }

    /// Copies the active session's stored configurations into the live
    /// selection. Returns whether anything changed.
    fn restore_configs_from_active(&mut self) -> bool {
        let Some(session) = self.sessions.active() else {
            return false;
        };
        let (a, b) = (session.config_a.clone(), session.config_b.clone());
        let changed = a != self.config_a || b != self.config_b;
        self.config_a = a;
        self.config_b = b;
        changed
    }
}

/// Service object owning [`AppState`] and its persistence.
pub struct AppStore {
    state: RwLock<AppState>,
    repository: Arc<dyn StateRepository>,
    /// Last revision written to the repository
    persisted_revision: Mutex<u64>,
    revision: AtomicU64,
    changes: broadcast::Sender<StoreChange>,
}

impl AppStore {
    /// Loads persisted state, or starts from defaults if none exists.
    pub async fn load(repository: Arc<dyn StateRepository>) -> Result<Self> {
        let document = repository.load().await?.unwrap_or_default();
        tracing::info!(
            "[AppStore] Loaded {} session(s), {} profile(s), {} persona(s)",
            document.sessions.len(),
            document.connection_profiles.len(),
            document.personas.len()
        );

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            state: RwLock::new(AppState::from_document(document)),
            repository,
            persisted_revision: Mutex::new(0),
            revision: AtomicU64::new(0),
            changes,
        })
    }

    /// Writes the current state regardless of pending changes.
    pub async fn flush(&self) -> Result<()> {
        let (document, revision) = {
            let state = self.state.read().await;
            (state.to_document(), self.revision.load(Ordering::SeqCst))
        };
        let mut persisted = self.persisted_revision.lock().await;
        self.repository.save(&document).await?;
        *persisted = (*persisted).max(revision);
        tracing::debug!("[AppStore] Flushed state at revision {}", revision);
        Ok(())
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Runs `f` against a read view of the state.
    pub async fn read<T>(&self, f: impl FnOnce(&AppState) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Applies a mutation, then persists and notifies as `f` reports.
    ///
    /// An error from `f` must leave the state unchanged.
    pub(crate) async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut AppState, &mut ChangeSet) -> Result<T>,
    ) -> Result<T> {
        let mut changes = ChangeSet::default();
        let (value, snapshot) = {
            let mut state = self.state.write().await;
            let value = f(&mut state, &mut changes)?;
            let snapshot = changes.needs_persist().then(|| {
                let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
                (state.to_document(), revision)
            });
            (value, snapshot)
        };

        if let Some((document, revision)) = snapshot {
            self.persist(document, revision).await?;
        }
        changes.notify(&self.changes);
        Ok(value)
    }

    async fn persist(&self, document: StateDocument, revision: u64) -> Result<()> {
        let mut persisted = self.persisted_revision.lock().await;
        if *persisted >= revision {
            tracing::debug!("[AppStore] Skipping stale snapshot {}", revision);
            return Ok(());
        }
        self.repository.save(&document).await?;
        *persisted = revision;
        Ok(())
    }

    // ============================================================================
    // Read accessors
    // ============================================================================

    pub async fn dialogue(&self) -> DialogueState {
        self.read(|s| s.dialogue.clone()).await
    }

    /// A copy of the active session, if any.
    pub async fn active_session(&self) -> Option<Session> {
        self.read(|s| s.sessions.active().cloned()).await
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.read(|s| s.sessions.get(id).cloned()).await
    }

    /// All sessions in display order.
    pub async fn sessions(&self) -> Vec<Session> {
        self.read(|s| s.sessions.sessions().to_vec()).await
    }

    pub async fn connection_profiles(&self) -> Vec<ConnectionProfile> {
        self.read(|s| s.connection_profiles.clone()).await
    }

    pub async fn personas(&self) -> Vec<Persona> {
        self.read(|s| s.personas.clone()).await
    }

    pub async fn generation_config(&self, slot: Slot) -> GenerationConfig {
        self.read(|s| s.config_for(slot).clone()).await
    }

    pub async fn settings_snapshot(&self) -> SettingsSnapshot {
        self.read(AppState::settings_snapshot).await
    }

    /// Everything persisted, stamped with the export time and format version.
    pub async fn export_state(&self) -> StateExport {
        self.read(|s| StateExport::from_document(&s.to_document()))
            .await
    }

    // ============================================================================
    // Connection profiles and personas
    // ============================================================================

    /// Validates `request` and stores it under a fresh id.
    pub async fn add_connection_profile(&self, request: NewConnectionProfile) -> Result<ConnectionProfile> {
        let profile = request.into_profile()?;
        self.mutate(|state, changes| {
            state.connection_profiles.push(profile.clone());
            changes.settings();
            Ok(profile)
        })
        .await
    }

    pub async fn update_connection_profile(
        &self,
        id: &str,
        patch: ConnectionProfilePatch,
    ) -> Result<ConnectionProfile> {
        self.mutate(|state, changes| {
            let slot = state
                .connection_profiles
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| DuetError::not_found("ConnectionProfile", id))?;
            let updated = patch.apply_to(slot)?;
            *slot = updated.clone();
            changes.settings();
            Ok(updated)
        })
        .await
    }

    /// Removes a profile. Personas referencing it are kept and fail to
    /// resolve until re-pointed.
    pub async fn remove_connection_profile(&self, id: &str) -> Result<()> {
        self.mutate(|state, changes| {
            let before = state.connection_profiles.len();
            state.connection_profiles.retain(|p| p.id != id);
            if state.connection_profiles.len() == before {
                return Err(DuetError::not_found("ConnectionProfile", id));
            }
            changes.settings();
            Ok(())
        })
        .await
    }

    /// Validates `request` and stores it under a fresh id. The referenced
    /// profile is not required to exist.
    pub async fn add_persona(&self, request: NewPersona) -> Result<Persona> {
        let persona = request.into_persona()?;
        self.mutate(|state, changes| {
            state.personas.push(persona.clone());
            changes.settings();
            Ok(persona)
        })
        .await
    }

    pub async fn update_persona(&self, id: &str, patch: PersonaPatch) -> Result<Persona> {
        self.mutate(|state, changes| {
            let slot = state
                .personas
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| DuetError::not_found("Persona", id))?;
            let updated = patch.apply_to(slot)?;
            *slot = updated.clone();
            changes.settings();
            Ok(updated)
        })
        .await
    }

    pub async fn remove_persona(&self, id: &str) -> Result<()> {
        self.mutate(|state, changes| {
            let before = state.personas.len();
            state.personas.retain(|p| p.id != id);
            if state.personas.len() == before {
                return Err(DuetError::not_found("Persona", id));
            }
            changes.settings();
            Ok(())
        })
        .await
    }

    /// Resolves `persona_id` into `slot`'s live configuration and the active
    /// session's stored copy.
    ///
    /// On a resolution error nothing changes, including the dialogue state.
    pub async fn select_persona(&self, slot: Slot, persona_id: &str) -> Result<GenerationConfig> {
        self.mutate(|state, changes| {
            let config = participant::resolve(
                slot,
                persona_id,
                &state.personas,
                &state.connection_profiles,
            )?;
            apply_live_config(state, changes, config.clone());
            tracing::info!("[AppStore] Slot {} now speaks as '{}'", slot, config.name);
            Ok(config)
        })
        .await
    }

    /// Replaces a slot configuration directly (and the active session's copy).
    pub async fn set_generation_config(&self, config: GenerationConfig) -> Result<()> {
        config.validate()?;
        self.mutate(|state, changes| {
            apply_live_config(state, changes, config);
            Ok(())
        })
        .await
    }

    /// Adopts settings pulled from the remote store without echoing them
    /// back.
    pub async fn apply_remote_settings(&self, snapshot: SettingsSnapshot) -> Result<()> {
        self.mutate(|state, changes| {
            state.connection_profiles = snapshot.connection_profiles;
            state.personas = snapshot.personas;
            let mut config_a = snapshot.config_a;
            config_a.slot = Slot::A;
            let mut config_b = snapshot.config_b;
            config_b.slot = Slot::B;
            state.config_a = config_a;
            state.config_b = config_b;
            changes.local();
            Ok(())
        })
        .await
    }

    // ============================================================================
    // Sessions
    // ============================================================================

    /// Creates a session seeded with the live configurations and makes it
    /// active.
    pub async fn create_session(&self, topic: Option<&str>) -> Result<Session> {
        self.mutate(|state, changes| {
            let session = create_active_session(state, topic);
            changes.sessions();
            Ok(session)
        })
        .await
    }

    /// Activates `id`, restoring its configurations into the live selection.
    pub async fn switch_session(&self, id: &str) -> Result<Session> {
        self.mutate(|state, changes| {
            let session = state.sessions.switch_to(id)?.clone();
            if state.restore_configs_from_active() {
                changes.settings();
            }
            state.reset_dialogue_for_active();
            changes.local();
            tracing::debug!("[AppStore] Switched to session {}", id);
            Ok(session)
        })
        .await
    }

    /// Deletes `id`. Deleting the active session activates the most recently
    /// created remaining one; a non-active delete leaves live state alone.
    pub async fn delete_session(&self, id: &str) -> Result<DeleteOutcome> {
        self.mutate(|state, changes| {
            let outcome = state.sessions.delete(id)?;
            state.in_flight.remove(id);
            if outcome.was_active {
                if state.restore_configs_from_active() {
                    changes.settings();
                }
                state.reset_dialogue_for_active();
            }
            changes.sessions();
            Ok(outcome)
        })
        .await
    }

    pub async fn rename_session(&self, id: &str, title: &str) -> Result<()> {
        self.mutate(|state, changes| {
            state.sessions.rename(id, title)?;
            changes.sessions();
            Ok(())
        })
        .await
    }

    /// Reconciles the local session set against `remote` under the write
    /// lock and returns the sessions the remote store must receive.
    pub async fn merge_remote_sessions(&self, remote: &[Session]) -> Result<Vec<Session>> {
        self.mutate(|state, changes| {
            let outcome = sync::merge(state.sessions.sessions(), remote);
            replace_all_sessions(state, outcome.merged);
            changes.local();
            Ok(outcome.to_push)
        })
        .await
    }

    /// Validates and applies an import document.
    ///
    /// Returns the number of imported sessions. A rejected document leaves
    /// the state untouched.
    pub async fn import_state(&self, text: &str) -> Result<usize> {
        let import = StateImport::parse(text)?;
        let count = import.sessions.len();

        self.mutate(|state, changes| {
            let mut document = state.to_document();
            import.apply_to(&mut document);

            let in_flight = std::mem::take(&mut state.in_flight);
            let next_ticket = state.next_ticket;
            *state = AppState::from_document(document);
            state.in_flight = in_flight;
            state.next_ticket = next_ticket;
            state.reset_dialogue_for_active();

            changes.settings();
            changes.sessions();
            Ok(count)
        })
        .await
    }
}

fn apply_live_config(state: &mut AppState, changes: &mut ChangeSet, config: GenerationConfig) {
    if let Some(session) = state.sessions.active_mut() {
        session.set_config(config.clone());
        changes.sessions();
    }
    state.set_live_config(config);
    changes.settings();
}

/// Creates a session from the live configurations, activates it and resets
/// the dialogue state.
pub(crate) fn create_active_session(state: &mut AppState, topic: Option<&str>) -> Session {
    let session = state
        .sessions
        .create(topic, state.config_a.clone(), state.config_b.clone())
        .clone();
    state.dialogue = DialogueState::default();
    session
}

fn replace_all_sessions(state: &mut AppState, sessions: Vec<Session>) {
    let previous_active = state.sessions.active().cloned();
    state.sessions.replace_all(sessions);

    let current_active = state.sessions.active();
    let unchanged = match (&previous_active, current_active) {
        (Some(before), Some(after)) => before == after,
        (None, None) => true,
        _ => false,
    };
    if !unchanged && !state.dialogue.is_generating() {
        state.reset_dialogue_for_active();
    }
}
