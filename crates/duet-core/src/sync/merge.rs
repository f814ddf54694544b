//! Recency-based reconciliation of local and remote session sets.

use crate::session::Session;
use std::collections::{HashMap, HashSet};

/// Result of reconciling two session sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Authoritative set: local order first, then remote-only sessions in
    /// remote order
    pub merged: Vec<Session>,
    /// Local sessions the remote store is missing or holds an older copy of
    pub to_push: Vec<Session>,
}

/// Reconciles `local` against `remote` by `updated_at`.
///
/// - present on both sides: the greater `updated_at` wins; a local winner is
///   also pushed; a tie keeps the local copy without pushing
/// - local only: kept and pushed
/// - remote only: adopted, not pushed
///
/// Remote rows that fail [`Session::validate`] are skipped, and duplicate
/// remote ids collapse to the copy with the greatest `updated_at`.
///
/// Merging a result with itself (or with its own remote copy) yields the
/// same set and nothing to push.
pub fn merge(local: &[Session], remote: &[Session]) -> MergeOutcome {
    let remote = usable_remote(remote);
    let remote_by_id: HashMap<&str, &Session> =
        remote.iter().map(|s| (s.id.as_str(), *s)).collect();
    let local_ids: HashSet<&str> = local.iter().map(|s| s.id.as_str()).collect();

    let mut outcome = MergeOutcome::default();

    for session in local {
        match remote_by_id.get(session.id.as_str()) {
            Some(theirs) if theirs.updated_at > session.updated_at => {
                outcome.merged.push((*theirs).clone());
            }
            Some(theirs) if theirs.updated_at == session.updated_at => {
                outcome.merged.push(session.clone());
            }
            _ => {
                outcome.merged.push(session.clone());
                outcome.to_push.push(session.clone());
            }
        }
    }

    for session in &remote {
        if !local_ids.contains(session.id.as_str()) {
            outcome.merged.push((*session).clone());
        }
    }

    tracing::debug!(
        "[Merge] local={} remote={} merged={} to_push={}",
        local.len(),
        remote.len(),
        outcome.merged.len(),
        outcome.to_push.len()
    );
    outcome
}

/// Valid remote sessions, one per id, in first-seen order.
fn usable_remote(remote: &[Session]) -> Vec<&Session> {
    let mut kept: Vec<&Session> = Vec::with_capacity(remote.len());
    let mut index_by_id: HashMap<&str, usize> = HashMap::new();

    for session in remote {
        if let Err(e) = session.validate() {
            tracing::warn!("[Merge] Skipping remote session {}: {}", session.id, e);
            continue;
        }
        match index_by_id.get(session.id.as_str()) {
            Some(&index) => {
                tracing::warn!("[Merge] Duplicate remote session {}", session.id);
                if session.updated_at > kept[index].updated_at {
                    kept[index] = session;
                }
            }
            None => {
                index_by_id.insert(session.id.as_str(), kept.len());
                kept.push(session);
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{GenerationConfig, Slot};

    fn session(id: &str, updated_at: i64) -> Session {
        let mut s = Session::new(
            id,
            GenerationConfig::default_for(Slot::A),
            GenerationConfig::default_for(Slot::B),
        );
        s.id = id.to_string();
        s.updated_at = updated_at;
        s
    }

    fn ids(sessions: &[Session]) -> Vec<&str> {
        sessions.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_local_newer_is_pushed() {
        let outcome = merge(&[session("s1", 200)], &[session("s1", 100)]);
        assert_eq!(outcome.merged[0].updated_at, 200);
        assert_eq!(ids(&outcome.to_push), vec!["s1"]);
    }

    #[test]
    fn test_remote_newer_wins_without_push() {
        let outcome = merge(&[session("s1", 100)], &[session("s1", 200)]);
        assert_eq!(outcome.merged[0].updated_at, 200);
        assert!(outcome.to_push.is_empty());
    }

    #[test]
    fn test_tie_keeps_local_without_push() {
        let mut local = session("s1", 100);
        local.topic = "local copy".to_string();
        let outcome = merge(&[local], &[session("s1", 100)]);
        assert_eq!(outcome.merged[0].topic, "local copy");
        assert!(outcome.to_push.is_empty());
    }

    #[test]
    fn test_disjoint_sets() {
        let outcome = merge(&[session("local", 1)], &[session("remote", 1)]);
        assert_eq!(ids(&outcome.merged), vec!["local", "remote"]);
        assert_eq!(ids(&outcome.to_push), vec!["local"]);
    }

    #[test]
    fn test_empty_remote_pushes_everything() {
        let local = vec![session("a", 1), session("b", 2)];
        let outcome = merge(&local, &[]);
        assert_eq!(outcome.merged, local);
        assert_eq!(outcome.to_push, local);
    }

    #[test]
    fn test_duplicate_remote_ids_keep_newest() {
        let mut older = session("dup", 10);
        older.topic = "older".to_string();
        let mut newer = session("dup", 20);
        newer.topic = "newer".to_string();

        let outcome = merge(&[], &[older, newer]);
        assert_eq!(ids(&outcome.merged), vec!["dup"]);
        assert_eq!(outcome.merged[0].topic, "newer");
    }

    #[test]
    fn test_invalid_remote_session_is_skipped() {
        let mut unsorted = session("unsorted", 5);
        unsorted.append_message(Slot::A, "a", "one");
        unsorted.append_message(Slot::B, "b", "two");
        unsorted.messages[1].timestamp = unsorted.messages[0].timestamp - 1;
        let blank_id = session("", 5);

        let outcome = merge(&[session("local", 1)], &[unsorted, blank_id, session("ok", 2)]);
        assert_eq!(ids(&outcome.merged), vec!["local", "ok"]);
    }

    #[test]
    fn test_invalid_remote_copy_does_not_replace_local() {
        let mut broken = session("s1", 500);
        broken.append_message(Slot::A, "a", "one");
        broken.append_message(Slot::B, "b", "two");
        broken.messages[1].id = broken.messages[0].id.clone();

        let outcome = merge(&[session("s1", 100)], &[broken]);
        assert_eq!(outcome.merged[0].updated_at, 100);
        assert_eq!(ids(&outcome.to_push), vec!["s1"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let local = vec![session("a", 5), session("b", 1), session("c", 3)];
        let remote = vec![session("b", 9), session("c", 3), session("d", 4)];

        let first = merge(&local, &remote);
        let second = merge(&first.merged, &first.merged);
        assert_eq!(second.merged, first.merged);
        assert!(second.to_push.is_empty());

        let again = merge(&first.merged, &remote);
        assert_eq!(again.merged, first.merged);
    }
}
