use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::message::Message;
use crate::part::DataMap;

/// Task lifecycle state.
///
/// Terminal states: Completed, Failed, Canceled.
/// Any unrecognised wire value deserializes to `Unknown`, which is never a
/// legal transition target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            TaskState::Submitted | TaskState::Working | TaskState::InputRequired
        )
    }

    /// Whether moving from `self` to `next` follows the lifecycle graph.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Submitted, Working)
                | (Submitted, Canceled)
                | (Working, Completed)
                | (Working, Failed)
                | (Working, InputRequired)
                | (Working, Canceled)
                | (InputRequired, Working)
                | (InputRequired, Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DataMap>,
}

impl Task {
    /// A freshly recorded task: `submitted`, with the caller's message on its
    /// status and as the first history entry.
    pub fn submitted(
        id: impl Into<String>,
        session_id: Option<String>,
        message: Message,
        metadata: Option<DataMap>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id,
            status: TaskStatus::new(TaskState::Submitted, Some(message.clone())),
            artifacts: None,
            history: Some(vec![message]),
            metadata,
        }
    }

    pub fn state(&self) -> TaskState {
        self.status.state
    }

    /// Copy of this task with its history trimmed for a response.
    ///
    /// `None` keeps the full history, `Some(0)` omits it, `Some(n)` keeps the
    /// last `n` messages.
    pub fn with_history_length(&self, history_length: Option<usize>) -> Task {
        let mut task = self.clone();
        match history_length {
            None => {}
            Some(0) => task.history = None,
            Some(n) => {
                if let Some(history) = task.history.as_mut() {
                    let skip = history.len().saturating_sub(n);
                    history.drain(..skip);
                }
            }
        }
        task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::Part;

    #[test]
    fn test_task_state_terminal() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
        assert!(!TaskState::Unknown.is_terminal());
    }

    #[test]
    fn test_task_state_cancelable() {
        assert!(TaskState::Submitted.is_cancelable());
        assert!(TaskState::Working.is_cancelable());
        assert!(TaskState::InputRequired.is_cancelable());
        assert!(!TaskState::Completed.is_cancelable());
        assert!(!TaskState::Failed.is_cancelable());
        assert!(!TaskState::Canceled.is_cancelable());
        assert!(!TaskState::Unknown.is_cancelable());
    }

    #[test]
    fn test_all_task_states_serde() {
        let states = [
            (TaskState::Submitted, "\"submitted\""),
            (TaskState::Working, "\"working\""),
            (TaskState::InputRequired, "\"input-required\""),
            (TaskState::Completed, "\"completed\""),
            (TaskState::Canceled, "\"canceled\""),
            (TaskState::Failed, "\"failed\""),
        ];

        for (state, expected_json) in states {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, expected_json, "Serialization failed for {state:?}");
            let deserialized: TaskState = serde_json::from_str(&json).unwrap();
            assert_eq!(deserialized, state, "Deserialization failed for {state:?}");
            assert_eq!(format!("\"{state}\""), expected_json);
        }
    }

    #[test]
    fn test_unrecognised_state_is_unknown() {
        let state: TaskState = serde_json::from_str("\"auth-required\"").unwrap();
        assert_eq!(state, TaskState::Unknown);
    }

    #[test]
    fn test_transition_graph() {
        use TaskState::*;
        let all = [Submitted, Working, InputRequired, Completed, Canceled, Failed, Unknown];
        let legal = [
            (Submitted, Working),
            (Submitted, Canceled),
            (Working, Completed),
            (Working, Failed),
            (Working, InputRequired),
            (Working, Canceled),
            (InputRequired, Working),
            (InputRequired, Canceled),
        ];

        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_submitted_never_jumps_to_completed() {
        assert!(!TaskState::Submitted.can_transition_to(TaskState::Completed));
        assert!(!TaskState::Submitted.can_transition_to(TaskState::Failed));
        assert!(!TaskState::Submitted.can_transition_to(TaskState::InputRequired));
    }

    #[test]
    fn test_task_submitted_constructor() {
        let task = Task::submitted("t1", None, Message::user("hello"), None);
        assert_eq!(task.state(), TaskState::Submitted);
        assert_eq!(task.status.message.as_ref().unwrap().text(), "hello");
        assert_eq!(task.history.as_ref().unwrap().len(), 1);
        assert!(task.artifacts.is_none());
    }

    #[test]
    fn test_task_from_raw_json_minimal() {
        let json = r#"{
            "id": "t-raw",
            "status": {"state": "submitted", "timestamp": "2026-02-12T00:00:00Z"}
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "t-raw");
        assert!(task.session_id.is_none());
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.status.timestamp.to_rfc3339(), "2026-02-12T00:00:00+00:00");
        assert!(task.artifacts.is_none());
        assert!(task.history.is_none());
    }

    #[test]
    fn test_task_status_and_artifacts_roundtrip() {
        let mut task = Task::submitted("t-full", Some("s-1".into()), Message::user("go"), None);
        task.status = TaskStatus::new(TaskState::Completed, Some(Message::agent("done")));
        task.artifacts = Some(vec![
            Artifact::named("first", vec![Part::text("a"), Part::text("b")]),
            Artifact::named("second", vec![Part::text("c")]).with_index(1),
        ]);

        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""sessionId":"s-1""#));
        assert!(json.contains(r#""state":"completed""#));

        let deserialized: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, task);
        let artifacts = deserialized.artifacts.unwrap();
        assert_eq!(artifacts[0].name.as_deref(), Some("first"));
        assert_eq!(artifacts[0].parts[1].as_text(), Some("b"));
        assert_eq!(artifacts[1].index, 1);
    }

    #[test]
    fn test_history_length_trimming() {
        let mut task = Task::submitted("t", None, Message::user("1"), None);
        let history = task.history.as_mut().unwrap();
        history.push(Message::agent("2"));
        history.push(Message::user("3"));

        let full = task.with_history_length(None);
        assert_eq!(full.history.as_ref().unwrap().len(), 3);

        assert!(task.with_history_length(Some(0)).history.is_none());

        let last_two = task.with_history_length(Some(2));
        let texts: Vec<String> = last_two.history.unwrap().iter().map(Message::text).collect();
        assert_eq!(texts, vec!["2", "3"]);

        let more_than_len = task.with_history_length(Some(10));
        assert_eq!(more_than_len.history.unwrap().len(), 3);

        // source task untouched
        assert_eq!(task.history.unwrap().len(), 3);
    }
}
