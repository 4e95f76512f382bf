use std::collections::HashMap;

use atp_types::{ConversationMessage, ConversationSession, DataMap};
use tokio::sync::RwLock;

use crate::error::ServerError;

/// In-memory registry of point-to-point conversation sessions.
#[derive(Default)]
pub struct ConversationStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, participants: Vec<String>, metadata: DataMap) -> ConversationSession {
        let session = ConversationSession::new(participants, metadata);
        tracing::debug!(session_id = %session.id, participants = ?session.participants, "conversation created");
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        session
    }

    pub async fn get(&self, session_id: &str) -> Option<ConversationSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Appends `message` if its sender or recipient belongs to the session.
    pub async fn append(
        &self,
        session_id: &str,
        message: ConversationMessage,
    ) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ServerError::ConversationNotFound(session_id.to_string()))?;
        if !session.accepts(&message) {
            return Err(ServerError::NotAParticipant(session_id.to_string()));
        }
        session.messages.push(message);
        Ok(())
    }

    /// Copy of the session's message log, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<ConversationMessage>, ServerError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| ServerError::ConversationNotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = ConversationStore::new();
        let mut meta = DataMap::new();
        meta.insert("topic".into(), "protocols".into());

        let session = store.create(vec!["a".into(), "b".into()], meta).await;
        let fetched = store.get(&session.id).await.unwrap();
        assert_eq!(fetched.participants, vec!["a", "b"]);
        assert_eq!(fetched.metadata["topic"], "protocols");
        assert!(fetched.messages.is_empty());
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let store = ConversationStore::new();
        let session = store.create(vec!["a".into(), "b".into()], DataMap::new()).await;

        for text in ["one", "two", "three"] {
            store
                .append(&session.id, ConversationMessage::text("a", "b", text))
                .await
                .unwrap();
        }

        let history = store.history(&session.id).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.parts[0].as_text().unwrap()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_append_rejects_strangers() {
        let store = ConversationStore::new();
        let session = store.create(vec!["a".into()], DataMap::new()).await;

        let result = store
            .append(&session.id, ConversationMessage::text("x", "y", "hi"))
            .await;
        assert!(matches!(result, Err(ServerError::NotAParticipant(_))));
        assert!(store.history(&session.id).await.unwrap().is_empty());

        store
            .append(&session.id, ConversationMessage::text("system", "y", "notice"))
            .await
            .unwrap();
        assert_eq!(store.history(&session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = ConversationStore::new();
        let result = store
            .append("nope", ConversationMessage::text("a", "b", "hi"))
            .await;
        assert!(matches!(result, Err(ServerError::ConversationNotFound(_))));
        assert!(store.history("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_history_is_a_copy() {
        let store = ConversationStore::new();
        let session = store.create(vec!["a".into()], DataMap::new()).await;
        let mut history = store.history(&session.id).await.unwrap();
        history.push(ConversationMessage::text("a", "a", "local only"));
        assert!(store.history(&session.id).await.unwrap().is_empty());
    }
}
