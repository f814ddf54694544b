//! TurnEngine - alternates generation requests between the two slots.
//!
//! Each operation runs in three steps:
//! 1. plan under the store lock (gate check, truncation, request building)
//! 2. call the generation client with no lock held
//! 3. commit the result under the store lock into the session that
//!    requested it, whichever session is active by then

use crate::store::{AppState, AppStore, ChangeSet, create_active_session};
use duet_core::connection::ConnectionProfile;
use duet_core::dialogue::{ChatMessage, DialogueState, DialogueStatus, opening_request, turn_request};
use duet_core::error::{DuetError, Result};
use duet_core::generation::{ConnectionTestResult, GenerationClient};
use duet_core::participant::{GenerationConfig, Slot};
use duet_core::session::Message;
use std::sync::Arc;

/// What a turn operation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Gated, nothing active, unknown message, or empty topic
    Skipped,
    /// A message was appended to the requesting session
    Appended(Message),
    /// The generation failed; the transcript is unchanged
    Failed(String),
    /// The result arrived after its session was deleted
    Discarded,
}

/// A generation registered in the in-flight map, ready to be sent.
struct TurnPlan {
    session_id: String,
    ticket: u64,
    slot: Slot,
    config: GenerationConfig,
    messages: Vec<ChatMessage>,
}

/// Drives the two-slot dialogue on top of an [`AppStore`].
///
/// At most one generation runs per session; every operation that would start
/// a second one returns [`TurnOutcome::Skipped`].
pub struct TurnEngine {
    store: Arc<AppStore>,
    client: Arc<dyn GenerationClient>,
}

impl TurnEngine {
    pub fn new(store: Arc<AppStore>, client: Arc<dyn GenerationClient>) -> Self {
        Self { store, client }
    }

    /// The store this engine reads plans from and commits results into.
    pub fn store(&self) -> &Arc<AppStore> {
        &self.store
    }

    /// Starts (or restarts) the dialogue on `topic`.
    ///
    /// Creates a session if none is active; renames the active session if a
    /// different topic is given. Slot A opens.
    pub async fn start(&self, topic: Option<&str>) -> Result<TurnOutcome> {
        let requested = topic.map(str::trim).filter(|t| !t.is_empty());

        let plan = self
            .plan(|state, changes| {
                if state.is_generation_gated() {
                    tracing::debug!("[TurnEngine] start() ignored: generation in progress");
                    return Ok(None);
                }

                let session_id = match state.sessions.active() {
                    Some(session) => session.id.clone(),
                    None => {
                        changes.sessions();
                        create_active_session(state, requested).id
                    }
                };

                if let Some(topic) = requested {
                    let current = state.sessions.get(&session_id).map(|s| s.topic.as_str());
                    if current != Some(topic) {
                        state.sessions.rename(&session_id, topic)?;
                        changes.sessions();
                    }
                }

                Ok(plan_opening(state, &session_id))
            })
            .await?;

        self.run(plan).await
    }

    /// Generates the next turn for the active session.
    pub async fn next_step(&self) -> Result<TurnOutcome> {
        let plan = self
            .plan(|state, _| {
                if state.is_generation_gated() {
                    tracing::debug!("[TurnEngine] next_step() ignored: generation in progress");
                    return Ok(None);
                }
                let Some(session_id) = state.sessions.active_session_id().map(str::to_string)
                else {
                    return Ok(None);
                };
                let slot = state.dialogue.next_turn_slot;
                Ok(plan_next(state, &session_id, slot))
            })
            .await?;

        self.run(plan).await
    }

    /// Drops `message_id` and everything after it, then regenerates from
    /// that point with the removed message's author.
    ///
    /// Truncation and the start of the new generation happen in one
    /// critical section, so no other operation observes the truncated
    /// transcript at rest.
    pub async fn regenerate_from(&self, message_id: &str) -> Result<TurnOutcome> {
        let plan = self
            .plan(|state, changes| {
                if state.is_generation_gated() {
                    return Ok(None);
                }
                let Some(session) = state.sessions.active_mut() else {
                    return Ok(None);
                };
                let Some(removed) = session.truncate_from(message_id) else {
                    tracing::debug!("[TurnEngine] regenerate_from({}) ignored: unknown message", message_id);
                    return Ok(None);
                };
                let session_id = session.id.clone();
                let now_empty = session.messages.is_empty();
                changes.sessions();

                state.dialogue = DialogueState {
                    status: DialogueStatus::Idle,
                    next_turn_slot: removed.sender_slot,
                    last_error: None,
                };

                tracing::info!(
                    "[TurnEngine] Regenerating session {} from message {}",
                    session_id,
                    message_id
                );
                if now_empty {
                    Ok(plan_opening(state, &session_id))
                } else {
                    Ok(plan_next(state, &session_id, removed.sender_slot))
                }
            })
            .await?;

        self.run(plan).await
    }

    /// Clears the active session's transcript and the dialogue state.
    ///
    /// A generation still running for the session is not cancelled: it keeps
    /// its ticket, and its result is appended to the cleared session when it
    /// arrives. Until then the session stays gated.
    pub async fn reset(&self) -> Result<()> {
        self.store
            .mutate(|state, changes| {
                if let Some(session) = state.sessions.active_mut() {
                    session.clear_messages();
                    changes.sessions();
                }
                state.dialogue.reset();
                Ok(())
            })
            .await
    }

    /// Checks a connection profile with a one-token request.
    pub async fn test_connection(&self, profile_id: &str) -> Result<ConnectionTestResult> {
        let profile = self
            .store
            .read(|s| {
                s.connection_profiles
                    .iter()
                    .find(|p| p.id == profile_id)
                    .cloned()
            })
            .await
            .ok_or_else(|| DuetError::not_found("ConnectionProfile", profile_id))?;

        let result = self.client.test_connection(&connection_test_config(&profile)).await;
        tracing::info!(
            "[TurnEngine] Connection test for '{}': success={} latency={}ms",
            profile.name,
            result.success,
            result.latency_ms
        );
        Ok(result)
    }

    /// Runs the planning step of a turn under the store lock.
    ///
    /// If persisting the plan fails after a generation was registered, the
    /// registration is rolled back so the session is not left gated.
    async fn plan(
        &self,
        f: impl FnOnce(&mut AppState, &mut ChangeSet) -> Result<Option<TurnPlan>>,
    ) -> Result<Option<TurnPlan>> {
        let mut registered = None;
        let result = self
            .store
            .mutate(|state, changes| {
                let plan = f(state, changes)?;
                registered = plan.as_ref().map(|p| (p.session_id.clone(), p.ticket));
                Ok(plan)
            })
            .await;

        if let (Err(err), Some((session_id, ticket))) = (&result, registered) {
            self.abandon(&session_id, ticket, err).await;
        }
        result
    }

    /// Releases a registration whose plan never reached the client.
    async fn abandon(&self, session_id: &str, ticket: u64, err: &DuetError) {
        tracing::warn!(
            "[TurnEngine] Abandoning generation for session {}: {}",
            session_id,
            err
        );
        let message = err.to_string();
        // No change flags are set, so this never touches the repository.
        let released = self
            .store
            .mutate(|state, _| {
                if state.finish_in_flight(session_id, ticket)
                    && state.sessions.active_session_id() == Some(session_id)
                {
                    state.dialogue.fail(message);
                }
                Ok(())
            })
            .await;
        if let Err(err) = released {
            tracing::error!("[TurnEngine] Failed to release generation: {}", err);
        }
    }

    async fn run(&self, plan: Option<TurnPlan>) -> Result<TurnOutcome> {
        let Some(plan) = plan else {
            return Ok(TurnOutcome::Skipped);
        };

        tracing::debug!(
            "[TurnEngine] Generating slot {} ({}) for session {}",
            plan.slot,
            plan.config.name,
            plan.session_id
        );
        let result = self.client.generate(&plan.config, &plan.messages).await;

        self.store
            .mutate(move |state, changes| Ok(commit(state, changes, plan, result)))
            .await
    }
}

/// Builds the opening request for slot A and registers it.
fn plan_opening(state: &mut AppState, session_id: &str) -> Option<TurnPlan> {
    let topic = state.sessions.get(session_id)?.topic.trim().to_string();
    if topic.is_empty() {
        return None;
    }
    let config = state.config_a.clone();
    let messages = opening_request(&config, &topic);
    Some(register(state, session_id, Slot::A, config, messages))
}

/// Builds a follow-up request for `slot` and registers it.
fn plan_next(state: &mut AppState, session_id: &str, slot: Slot) -> Option<TurnPlan> {
    let config = state.config_for(slot).clone();
    let messages = turn_request(&config, &state.sessions.get(session_id)?.messages);
    Some(register(state, session_id, slot, config, messages))
}

fn register(
    state: &mut AppState,
    session_id: &str,
    slot: Slot,
    config: GenerationConfig,
    messages: Vec<ChatMessage>,
) -> TurnPlan {
    let ticket = state.begin_in_flight(session_id);
    if state.sessions.active_session_id() == Some(session_id) {
        state.dialogue.begin_generation();
    }
    TurnPlan {
        session_id: session_id.to_string(),
        ticket,
        slot,
        config,
        messages,
    }
}

fn commit(
    state: &mut AppState,
    changes: &mut ChangeSet,
    plan: TurnPlan,
    result: Result<String>,
) -> TurnOutcome {
    let is_active = state.sessions.active_session_id() == Some(plan.session_id.as_str());

    if !state.finish_in_flight(&plan.session_id, plan.ticket) {
        tracing::info!(
            "[TurnEngine] Dropping result for session {}: invalidated while in flight",
            plan.session_id
        );
        return TurnOutcome::Discarded;
    }
    let Some(session) = state.sessions.get_mut(&plan.session_id) else {
        tracing::info!(
            "[TurnEngine] Dropping result for session {}: deleted while in flight",
            plan.session_id
        );
        return TurnOutcome::Discarded;
    };

    match result {
        Ok(content) => {
            if session.config_for(plan.slot) != &plan.config {
                session.set_config(plan.config.clone());
            }
            let message = session
                .append_message(plan.slot, &plan.config.name, &content)
                .clone();
            changes.sessions();
            if is_active {
                state.dialogue.complete_turn(plan.slot);
            }
            TurnOutcome::Appended(message)
        }
        Err(err) => {
            let message = err.to_string();
            tracing::warn!(
                "[TurnEngine] Generation failed for session {}: {}",
                plan.session_id,
                message
            );
            if is_active {
                state.dialogue.fail(message.clone());
            }
            TurnOutcome::Failed(message)
        }
    }
}

/// A throwaway slot configuration pointing at `profile`.
fn connection_test_config(profile: &ConnectionProfile) -> GenerationConfig {
    GenerationConfig {
        slot: Slot::A,
        name: profile.name.clone(),
        endpoint: profile.url.clone(),
        api_key: profile.api_key.clone(),
        model: profile.model.clone(),
        system_prompt: String::new(),
    }
}
