//! Outgoing messages and the queue they wait in before transmission.
//!
//! A message enters the queue as plaintext.  It only leaves as a wire
//! [`Record`] once its recipient's public key is known and the body has been
//! encrypted; see [`Session::drain_outbound`](super::session::Session::drain_outbound).

use std::collections::VecDeque;

use sechat_core::protocol::records::{DirectMessageRecord, GroupMessageRecord};
use sechat_core::Record;

/// How an [`OutgoingMessage`] is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// One user, named by `to`.
    Direct,
    /// Every member of `group`; must be expanded before it can be sent.
    GroupBroadcast,
    /// One member (`to`) of `group`.
    GroupTargeted,
}

/// A chat message on its way out.  `body` is plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub kind: MessageKind,
    pub to: Option<String>,
    pub group: Option<String>,
    pub body: String,
    pub from: String,
}

impl OutgoingMessage {
    /// A direct message to `to`.
    pub fn direct(to: impl Into<String>, body: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Direct,
            to: Some(to.into()),
            group: None,
            body: body.into(),
            from: from.into(),
        }
    }

    /// A message to every member of `group`.
    pub fn group_broadcast(
        group: impl Into<String>,
        body: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::GroupBroadcast,
            to: None,
            group: Some(group.into()),
            body: body.into(),
            from: from.into(),
        }
    }

    /// Clones this message addressed to a single group `member`.
    pub fn targeted_to(&self, member: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::GroupTargeted,
            to: Some(member.into()),
            group: self.group.clone(),
            body: self.body.clone(),
            from: self.from.clone(),
        }
    }

    /// The user whose public key encrypts this message, if addressed to one.
    pub fn recipient(&self) -> Option<&str> {
        match self.kind {
            MessageKind::GroupBroadcast => None,
            MessageKind::Direct | MessageKind::GroupTargeted => self.to.as_deref(),
        }
    }

    /// Builds the wire record carrying `ciphertext` in place of the body.
    ///
    /// Returns `None` for a [`MessageKind::GroupBroadcast`], which has no
    /// single recipient and is never transmitted as is.
    pub fn seal(&self, ciphertext: String) -> Option<Record> {
        let to = self.recipient()?.to_string();
        match self.kind {
            MessageKind::Direct => Some(Record::Message(DirectMessageRecord {
                to,
                from: self.from.clone(),
                message: ciphertext,
            })),
            MessageKind::GroupTargeted => Some(Record::GroupMessage(GroupMessageRecord {
                group: self.group.clone().unwrap_or_default(),
                from: self.from.clone(),
                to: Some(to),
                message: ciphertext,
            })),
            MessageKind::GroupBroadcast => None,
        }
    }
}

/// One unit of outbound work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundItem {
    /// A chat message that still needs key resolution and encryption.
    Message(OutgoingMessage),
    /// A record that is already final (register/login).
    Raw(Record),
}

/// FIFO of outbound work, drained to empty once per event-loop cycle.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    items: VecDeque<OutboundItem>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&mut self, message: OutgoingMessage) {
        self.items.push_back(OutboundItem::Message(message));
    }

    pub fn push_raw(&mut self, record: Record) {
        self.items.push_back(OutboundItem::Raw(record));
    }

    pub fn pop(&mut self) -> Option<OutboundItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_message_has_recipient_and_no_group() {
        let msg = OutgoingMessage::direct("bob", "hi", "alice");
        assert_eq!(msg.kind, MessageKind::Direct);
        assert_eq!(msg.recipient(), Some("bob"));
        assert_eq!(msg.group, None);
    }

    #[test]
    fn test_broadcast_has_no_recipient() {
        let msg = OutgoingMessage::group_broadcast("team", "hi", "alice");
        assert_eq!(msg.recipient(), None);
        assert_eq!(msg.to, None);
        assert_eq!(msg.group.as_deref(), Some("team"));
    }

    #[test]
    fn test_targeted_clone_keeps_body_group_and_sender() {
        // Arrange
        let template = OutgoingMessage::group_broadcast("team", "hello all", "alice");

        // Act
        let copy = template.targeted_to("bob");

        // Assert
        assert_eq!(copy.kind, MessageKind::GroupTargeted);
        assert_eq!(copy.to.as_deref(), Some("bob"));
        assert_eq!(copy.group.as_deref(), Some("team"));
        assert_eq!(copy.body, "hello all");
        assert_eq!(copy.from, "alice");
    }

    #[test]
    fn test_seal_direct_builds_message_record() {
        let record = OutgoingMessage::direct("bob", "hi", "alice")
            .seal("ct".to_string())
            .unwrap();
        assert_eq!(
            record,
            Record::Message(DirectMessageRecord {
                to: "bob".into(),
                from: "alice".into(),
                message: "ct".into(),
            })
        );
    }

    #[test]
    fn test_seal_targeted_builds_group_message_record() {
        let record = OutgoingMessage::group_broadcast("team", "hi", "alice")
            .targeted_to("carol")
            .seal("ct".to_string())
            .unwrap();
        assert_eq!(
            record,
            Record::GroupMessage(GroupMessageRecord {
                group: "team".into(),
                from: "alice".into(),
                to: Some("carol".into()),
                message: "ct".into(),
            })
        );
    }

    #[test]
    fn test_seal_broadcast_is_refused() {
        let msg = OutgoingMessage::group_broadcast("team", "hi", "alice");
        assert!(msg.seal("ct".to_string()).is_none());
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = OutboundQueue::new();
        queue.push_raw(Record::Logout);
        queue.push_message(OutgoingMessage::direct("bob", "1", "a"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(OutboundItem::Raw(Record::Logout)));
        assert!(matches!(queue.pop(), Some(OutboundItem::Message(_))));
        assert!(queue.is_empty());
    }
}
