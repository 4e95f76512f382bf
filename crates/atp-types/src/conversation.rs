use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::part::{DataMap, Part};

/// Participant id that may always post to a session.
pub const SYSTEM_PARTICIPANT: &str = "system";

/// Point-to-point message exchanged inside a [`ConversationSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub parts: Vec<Part>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: DataMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_num: Option<u64>,
}

impl ConversationMessage {
    pub fn new(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        parts: Vec<Part>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            parts,
            timestamp: Utc::now(),
            metadata: DataMap::new(),
            in_reply_to: None,
            sequence_num: None,
        }
    }

    pub fn text(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(sender_id, recipient_id, vec![Part::text(text)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: DataMap,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

impl ConversationSession {
    pub fn new(participants: Vec<String>, metadata: DataMap) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            participants,
            created_at: Utc::now(),
            metadata,
            messages: Vec::new(),
        }
    }

    fn admits(&self, participant: &str) -> bool {
        participant == SYSTEM_PARTICIPANT || self.participants.iter().any(|p| p == participant)
    }

    /// A message is accepted when its sender or its recipient belongs to the
    /// session (the `system` participant always does).
    pub fn accepts(&self, message: &ConversationMessage) -> bool {
        self.admits(&message.sender_id) || self.admits(&message.recipient_id)
    }
}
