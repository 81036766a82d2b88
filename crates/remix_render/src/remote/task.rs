//! Remote task state machine

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RemoteTaskError;

/// Identifier the service assigns to a submitted task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Wrap a service-issued id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a remote task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Accepted, not started
    Submitted,
    /// Running on the service
    InProgress,
    /// Finished with a result
    Succeeded,
    /// Finished without a result
    Failed,
    /// Stopped before finishing
    Canceled,
}

impl TaskStatus {
    /// True for states no poll can leave
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    /// Whether a poll may move a task from `self` to `next`
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Submitted => true,
            Self::InProgress => next != Self::Submitted,
            Self::Succeeded | Self::Failed | Self::Canceled => false,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = RemoteTaskError;

    /// Parse the service's status vocabulary
    ///
    /// `EXPIRED` is reported as [`TaskStatus::Failed`]: the task ended without
    /// a downloadable result.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "QUEUED" | "SUBMITTED" => Ok(Self::Submitted),
            "IN_PROGRESS" | "RUNNING" => Ok(Self::InProgress),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "FAILED" | "EXPIRED" => Ok(Self::Failed),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            _ => Err(RemoteTaskError::UnknownStatus(s.to_string())),
        }
    }
}

/// One poll response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Reported status
    pub status: TaskStatus,
    /// Reported progress in percent
    pub progress: u8,
    /// Download locator of the result, present once the task succeeded
    pub result_url: Option<String>,
    /// Service-supplied failure reason
    pub message: Option<String>,
}

impl TaskSnapshot {
    /// Snapshot with only a status and progress
    pub fn new(status: TaskStatus, progress: u8) -> Self {
        Self { status, progress, result_url: None, message: None }
    }

    /// Successful snapshot carrying a result locator
    pub fn succeeded(result_url: impl Into<String>) -> Self {
        Self { status: TaskStatus::Succeeded, progress: 100, result_url: Some(result_url.into()), message: None }
    }

    /// Failed snapshot with a reason
    pub fn failed(message: impl Into<String>) -> Self {
        Self { status: TaskStatus::Failed, progress: 0, result_url: None, message: Some(message.into()) }
    }
}

/// Terminal result of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Result ready for download
    Succeeded {
        /// Where to fetch the result
        locator: String,
    },
    /// Task failed on the service
    Failed {
        /// Reason reported by the service, or a generic one
        reason: String,
    },
    /// Task was canceled
    Canceled,
}

/// Client-side view of one remote task
///
/// Applies poll snapshots in order, rejecting transitions out of a terminal
/// state and never letting progress go backwards.
#[derive(Debug, Clone)]
pub struct TaskTracker {
    id: TaskId,
    status: TaskStatus,
    progress: u8,
    polls: u32,
    result_url: Option<String>,
    message: Option<String>,
}

impl TaskTracker {
    /// Track a freshly submitted task
    pub fn new(id: TaskId) -> Self {
        Self { id, status: TaskStatus::Submitted, progress: 0, polls: 0, result_url: None, message: None }
    }

    /// Task id
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Highest progress seen, in percent
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Snapshots applied so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Apply one poll response
    pub fn apply(&mut self, snapshot: TaskSnapshot) -> Result<TaskStatus, RemoteTaskError> {
        if !self.status.can_transition_to(snapshot.status) {
            return Err(RemoteTaskError::IllegalTransition {
                task: self.id.clone(),
                from: self.status,
                to: snapshot.status,
            });
        }

        let reported = snapshot.progress.min(100);
        if reported < self.progress {
            log::debug!("Task {}: progress went back from {} to {}, keeping {}", self.id, self.progress, reported, self.progress);
        }
        self.progress = self.progress.max(reported);
        if snapshot.status == TaskStatus::Succeeded {
            self.progress = 100;
        }

        if snapshot.status != self.status {
            log::debug!("Task {}: {:?} -> {:?}", self.id, self.status, snapshot.status);
        }
        self.status = snapshot.status;
        self.polls += 1;
        self.result_url = snapshot.result_url.or(self.result_url.take());
        self.message = snapshot.message.or(self.message.take());
        Ok(self.status)
    }

    /// Terminal outcome, or `None` while the task is still running
    pub fn outcome(&self) -> Option<Result<TaskOutcome, RemoteTaskError>> {
        match self.status {
            TaskStatus::Submitted | TaskStatus::InProgress => None,
            TaskStatus::Succeeded => Some(
                self.result_url
                    .clone()
                    .map(|locator| TaskOutcome::Succeeded { locator })
                    .ok_or_else(|| RemoteTaskError::MissingLocator(self.id.clone())),
            ),
            TaskStatus::Failed => Some(Ok(TaskOutcome::Failed {
                reason: self.message.clone().unwrap_or_else(|| "task failed".to_string()),
            })),
            TaskStatus::Canceled => Some(Ok(TaskOutcome::Canceled)),
        }
    }
}
