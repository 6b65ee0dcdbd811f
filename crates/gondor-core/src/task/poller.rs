//! Task status polling loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{RetryPolicy, TaskKind, TaskOutcome};
use crate::error::{GondorError, GondorResult};
use crate::transport::{FormFields, RemoteApi};

const TASK_STATUS_PATH: &str = "task_status/";

/// Blocking sleep, swappable in tests.
pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Timing of the polling loop.
#[derive(Clone)]
pub struct PollSettings {
    /// Pause between status queries while the task is running
    pub interval: Duration,
    pub retry: RetryPolicy,
    pub sleeper: Sleeper,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(std::thread::sleep),
        }
    }
}

impl PollSettings {
    /// Default timings with a sleeper that returns immediately.
    pub fn without_sleep() -> Self {
        Self {
            sleeper: Arc::new(|_| {}),
            ..Self::default()
        }
    }

    fn sleep(&self, duration: Duration) {
        (self.sleeper)(duration)
    }
}

/// Polls `task_status/` for one instance until a task finishes.
pub struct TaskPoller<'a> {
    api: &'a dyn RemoteApi,
    site_key: &'a str,
    instance_label: &'a str,
    settings: &'a PollSettings,
}

impl<'a> TaskPoller<'a> {
    pub fn new(
        api: &'a dyn RemoteApi,
        site_key: &'a str,
        instance_label: &'a str,
        settings: &'a PollSettings,
    ) -> Self {
        Self {
            api,
            site_key,
            instance_label,
            settings,
        }
    }

    /// Query until `task_id` reaches a terminal state of `kind`.
    ///
    /// `status: error` answers end polling immediately. Network failures are
    /// retried per the [`RetryPolicy`]; the budget is restored after every
    /// well-formed answer.
    pub fn poll(&self, task_id: &str, kind: TaskKind) -> GondorResult<TaskOutcome> {
        let fields = FormFields::new()
            .field("site_key", self.site_key)
            .field("instance_label", self.instance_label)
            .field("task_id", task_id);
        let policy = &self.settings.retry;
        let mut failures: u32 = 0;

        loop {
            let response = match self.api.post_form(TASK_STATUS_PATH, &fields) {
                Ok(response) => {
                    failures = 0;
                    response
                }
                Err(e) if e.is_transient() => {
                    if failures >= policy.max_retries {
                        return Err(GondorError::PollRetriesExhausted {
                            attempts: failures + 1,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = policy.delay_for_attempt(failures);
                    failures += 1;
                    warn!(task_id, error = %e, retry = failures, ?delay, "task status query failed, retrying");
                    self.settings.sleep(delay);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let response = response.into_success()?;
            if let Some(outcome) = kind.outcome(&response) {
                debug!(task_id, ?outcome, "task finished");
                return Ok(outcome);
            }
            debug!(task_id, state = response.str_field("state"), "task still running");
            self.settings.sleep(self.settings.interval);
        }
    }
}
