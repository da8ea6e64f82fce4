use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::DispatchFailure;
use crate::ids::MessageId;

/// Outcome of a dispatch task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MessageOutcome {
    Sent,
    Failed { reason: DispatchFailureKind },
}

/// Serializable form of a [`DispatchFailure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DispatchFailureKind(&'static str);

impl From<DispatchFailure> for DispatchFailureKind {
    fn from(f: DispatchFailure) -> Self {
        Self(f.kind())
    }
}

/// A resolved dispatch, retained for the lifetime of the process.
#[derive(Clone, Debug, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub recipient: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: MessageOutcome,
}

impl Message {
    pub fn sent(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_outcome(recipient, body, MessageOutcome::Sent)
    }

    pub fn failed(
        recipient: impl Into<String>,
        body: impl Into<String>,
        reason: DispatchFailure,
    ) -> Self {
        Self::with_outcome(
            recipient,
            body,
            MessageOutcome::Failed {
                reason: reason.into(),
            },
        )
    }

    fn with_outcome(
        recipient: impl Into<String>,
        body: impl Into<String>,
        outcome: MessageOutcome,
    ) -> Self {
        Self {
            id: MessageId::new(),
            recipient: recipient.into(),
            body: body.into(),
            timestamp: Utc::now(),
            outcome,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.outcome, MessageOutcome::Sent)
    }
}

/// Append-only in-memory message log. Unbounded.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sent_count(&self) -> usize {
        self.entries.iter().filter(|m| m.is_sent()).count()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.clone()
    }
}

/// Strip a single leading `+` from a recipient number.
pub fn normalize_recipient(recipient: &str) -> &str {
    recipient.strip_prefix('+').unwrap_or(recipient)
}
