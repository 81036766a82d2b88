//! Bounded polling of remote tasks

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::service::MeshGenerationService;
use super::task::{TaskId, TaskOutcome, TaskTracker};
use super::RemoteTaskError;

/// How often, and how long, to poll a remote task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay before the second poll
    pub initial_interval: Duration,
    /// Multiplier applied to the delay after every poll
    pub backoff_factor: f32,
    /// Upper bound on the delay
    pub max_interval: Duration,
    /// Polls allowed before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            backoff_factor: 1.5,
            max_interval: Duration::from_secs(30),
            max_attempts: 120,
        }
    }
}

impl PollPolicy {
    /// Fixed interval, no backoff
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self { initial_interval: interval, backoff_factor: 1.0, max_interval: interval, max_attempts }
    }

    /// Delay after the `attempt`-th poll (0-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1.0);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_interval.as_secs_f32() * factor.powi(exponent);
        if secs.is_finite() && secs < self.max_interval.as_secs_f32() {
            Duration::from_secs_f32(secs.max(0.0))
        } else {
            self.max_interval
        }
    }
}

/// Poll `task` until it reaches a terminal state or the policy runs out
///
/// `sleep` is called between polls, never after the last one. Service errors
/// and illegal status transitions end the wait immediately.
pub fn wait_for_task<S, F>(
    service: &S,
    task: &TaskId,
    policy: &PollPolicy,
    mut sleep: F,
) -> Result<TaskOutcome, RemoteTaskError>
where
    S: MeshGenerationService + ?Sized,
    F: FnMut(Duration),
{
    let mut tracker = TaskTracker::new(task.clone());

    for attempt in 0..policy.max_attempts {
        let snapshot = service.poll(task)?;
        tracker.apply(snapshot)?;

        if let Some(outcome) = tracker.outcome() {
            let outcome = outcome?;
            log::info!("Task {} finished after {} polls: {:?}", task, tracker.polls(), outcome);
            return Ok(outcome);
        }

        if attempt + 1 < policy.max_attempts {
            let delay = policy.delay_after(attempt);
            log::info!(
                "Task {} status: {:?} | progress: {}% | retrying in {:.1}s",
                task,
                tracker.status(),
                tracker.progress(),
                delay.as_secs_f32()
            );
            sleep(delay);
        }
    }

    Err(RemoteTaskError::TimedOut { task: task.clone(), attempts: tracker.polls() })
}
