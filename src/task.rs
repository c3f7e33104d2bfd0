//! Task lifecycle records (spec.md §3 Task).
//!
//! Mirrors the `WithdrawalRequest`/`WithdrawalStatus` shape from the
//! teacher's redemption types — an id, a status enum, and mutator methods
//! that advance status — generalized to the task state machine's own graph
//! and made transition-checked rather than a free-form setter.

use serde::{Deserialize, Serialize};

use crate::common::error::SnapError;
use crate::message::SnapMessage;

/// Task lifecycle state (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Canceled)
    }

    /// Whether `self -> next` is an edge in the task state graph.
    pub fn can_transition(&self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Submitted, Working)
                | (Working, Completed)
                | (Working, Failed)
                | (Working, Canceled)
                | (Working, InputRequired)
                | (InputRequired, Working)
        )
    }
}

/// `TaskStatus` as in spec.md §3: the current state, an ISO-8601 timestamp,
/// and an optional accompanying message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<SnapMessage>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: SnapMessage) -> Self {
        self.message = Some(message);
        self
    }
}

/// A task artifact: an opaque named output a handler produced while
/// working. The shape is deliberately loose (a JSON tree) since artifact
/// content is method-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub content: serde_json::Value,
}

/// A long-running unit of work tracked across multiple messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub history: Option<Vec<SnapMessage>>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: None,
            status: TaskStatus::new(TaskState::Submitted),
            artifacts: None,
            history: None,
        }
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Advance to `next`, rejecting any edge outside the state graph rather
    /// than silently overwriting the current status.
    pub fn transition(&mut self, next: TaskState) -> Result<(), SnapError> {
        if !self.status.state.can_transition(next) {
            if next == TaskState::Canceled {
                return Err(SnapError::TaskNotCancelable(self.id.clone()));
            }
            return Err(SnapError::InvalidMessage(format!(
                "cannot move task {} from {:?} to {:?}",
                self.id, self.status.state, next
            )));
        }
        self.status = TaskStatus::new(next);
        Ok(())
    }

    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.get_or_insert_with(Vec::new).push(artifact);
    }

    pub fn push_history(&mut self, message: SnapMessage) {
        self.history.get_or_insert_with(Vec::new).push(message);
    }
}
