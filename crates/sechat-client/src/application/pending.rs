//! Bookkeeping for messages blocked on a server lookup.
//!
//! Two kinds of lookup can hold a message back:
//!
//! - **Group membership.**  A `/gmsg` cannot be encrypted until the client
//!   knows who is in the group.  [`PendingRequestTracker`] remembers the
//!   message under the id of the `group-list` request sent for it.
//! - **Public key.**  A direct or targeted message cannot be encrypted until
//!   the recipient's key is known.  [`KeyWaitList`] parks such messages, in
//!   arrival order, until a `pubkey` reply (or an `InvalidUserError`) for
//!   that name arrives.
//!
//! Lookups have no timeout.  A reply that never comes leaves its entries in
//! place for the rest of the session.

use std::collections::HashMap;

use sechat_core::protocol::RequestIdCounter;

use super::outbound::OutgoingMessage;

/// A group-list request waiting for its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGroupLookup {
    pub group: String,
    /// The broadcast to fan out once the members are known.
    pub template: OutgoingMessage,
}

/// Correlates `group-list` request ids with the message blocked on each.
#[derive(Debug, Default)]
pub struct PendingRequestTracker {
    ids: RequestIdCounter,
    pending: HashMap<u64, PendingGroupLookup>,
}

impl PendingRequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker whose ids come from `ids`.
    pub fn with_ids(ids: RequestIdCounter) -> Self {
        Self {
            ids,
            pending: HashMap::new(),
        }
    }

    /// Allocates a fresh request id and files `template` under it.
    ///
    /// Returns `None`, filing nothing, once the id space is used up.
    pub fn issue(&mut self, group: impl Into<String>, template: OutgoingMessage) -> Option<u64> {
        let id = self.ids.next()?;
        self.pending.insert(
            id,
            PendingGroupLookup {
                group: group.into(),
                template,
            },
        );
        Some(id)
    }

    /// Removes and returns the entry for `id`, if one is outstanding.
    pub fn resolve(&mut self, id: u64) -> Option<PendingGroupLookup> {
        self.pending.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Messages parked until their recipient's public key arrives.
#[derive(Debug, Default)]
pub struct KeyWaitList {
    entries: Vec<OutgoingMessage>,
}

impl KeyWaitList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `message` behind its recipient.
    ///
    /// Returns `true` when no other message was already waiting on the same
    /// recipient, i.e. when the caller must send a key lookup.
    pub fn park(&mut self, message: OutgoingMessage) -> bool {
        let first = match message.recipient() {
            Some(name) => !self.is_waiting_on(name),
            None => false,
        };
        self.entries.push(message);
        first
    }

    /// Whether any parked message is addressed to `name`.
    pub fn is_waiting_on(&self, name: &str) -> bool {
        self.entries.iter().any(|m| m.recipient() == Some(name))
    }

    /// Removes and returns every message addressed to `name`, oldest first.
    pub fn take_for(&mut self, name: &str) -> Vec<OutgoingMessage> {
        let (matched, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|m| m.recipient() == Some(name));
        self.entries = rest;
        matched
    }

    /// Permanently discards every message addressed to `name`.  Returns how
    /// many were dropped.
    pub fn drop_for(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| m.recipient() != Some(name));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dm(to: &str, body: &str) -> OutgoingMessage {
        OutgoingMessage::direct(to, body, "alice")
    }

    // ── PendingRequestTracker ─────────────────────────────────────────────────

    #[test]
    fn test_issue_hands_out_unique_ids() {
        let mut tracker = PendingRequestTracker::new();
        let template = OutgoingMessage::group_broadcast("team", "hi", "alice");
        let a = tracker.issue("team", template.clone()).unwrap();
        let b = tracker.issue("team", template).unwrap();
        assert_ne!(a, b);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_resolve_removes_entry() {
        // Arrange
        let mut tracker = PendingRequestTracker::new();
        let template = OutgoingMessage::group_broadcast("team", "hi", "alice");
        let id = tracker.issue("team", template.clone()).unwrap();

        // Act
        let entry = tracker.resolve(id);

        // Assert
        assert_eq!(
            entry,
            Some(PendingGroupLookup {
                group: "team".into(),
                template,
            })
        );
        assert!(tracker.is_empty());
        assert_eq!(tracker.resolve(id), None, "an id resolves only once");
    }

    #[test]
    fn test_issue_refuses_once_ids_run_out() {
        // Arrange
        let mut tracker = PendingRequestTracker::with_ids(RequestIdCounter::starting_at(u64::MAX));
        let template = OutgoingMessage::group_broadcast("team", "hi", "alice");

        // Act
        let last = tracker.issue("team", template.clone());
        let refused = tracker.issue("team", template);

        // Assert
        assert_eq!(last, Some(u64::MAX));
        assert_eq!(refused, None);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_id_is_none() {
        let mut tracker = PendingRequestTracker::new();
        assert_eq!(tracker.resolve(99), None);
    }

    // ── KeyWaitList ───────────────────────────────────────────────────────────

    #[test]
    fn test_park_reports_first_entry_per_name_only() {
        let mut list = KeyWaitList::new();
        assert!(list.park(dm("bob", "1")));
        assert!(!list.park(dm("bob", "2")));
        assert!(list.park(dm("carol", "3")));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_take_for_returns_only_matching_in_insertion_order() {
        // Arrange
        let mut list = KeyWaitList::new();
        list.park(dm("bob", "1"));
        list.park(dm("carol", "2"));
        list.park(dm("bob", "3"));

        // Act
        let taken = list.take_for("bob");

        // Assert
        let bodies: Vec<&str> = taken.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["1", "3"]);
        assert_eq!(list.len(), 1);
        assert!(list.is_waiting_on("carol"));
        assert!(!list.is_waiting_on("bob"));
    }

    #[test]
    fn test_drop_for_discards_all_matching() {
        let mut list = KeyWaitList::new();
        list.park(dm("bob", "1"));
        list.park(dm("carol", "2"));
        list.park(dm("bob", "3"));
        assert_eq!(list.drop_for("bob"), 2);
        assert_eq!(list.drop_for("bob"), 0);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_park_after_take_requests_lookup_again() {
        let mut list = KeyWaitList::new();
        list.park(dm("bob", "1"));
        list.take_for("bob");
        assert!(list.park(dm("bob", "2")));
    }
}
