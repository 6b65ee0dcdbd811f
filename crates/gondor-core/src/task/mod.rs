//! Remote task state and polling.
//!
//! Deploys, command runs, database dumps and management operations all
//! queue a task on the server and hand back its id. The client then polls
//! `task_status/` until the task reaches a terminal state.

pub mod poller;
pub mod retry;

use serde_json::Value;

pub use poller::{PollSettings, Sleeper, TaskPoller};
pub use retry::RetryPolicy;

use crate::transport::ApiResponse;

/// Which state vocabulary a task uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Deployment,
    Execution,
    DatabaseDump,
    Management,
}

impl TaskKind {
    /// State that marks a successful task of this kind.
    pub fn success_state(self) -> &'static str {
        match self {
            TaskKind::Deployment => "deployed",
            TaskKind::Execution => "executed",
            TaskKind::DatabaseDump | TaskKind::Management => "finished",
        }
    }

    /// Noun used when the task is reported to the user.
    pub fn activity(self) -> &'static str {
        match self {
            TaskKind::Deployment => "deployment",
            TaskKind::Execution => "execution",
            TaskKind::DatabaseDump => "database dump",
            TaskKind::Management => "task",
        }
    }

    /// Map a status response to an outcome, or `None` while still running.
    pub fn outcome(self, response: &ApiResponse) -> Option<TaskOutcome> {
        match response.str_field("state")? {
            state if state == self.success_state() => {
                Some(TaskOutcome::Succeeded(response.get("result").cloned()))
            }
            "failed" => Some(TaskOutcome::Failed {
                reason: response.str_field("reason").unwrap_or_default().to_string(),
            }),
            "locked" => Some(TaskOutcome::Locked),
            _ => None,
        }
    }
}

/// Terminal result of a remote task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Carries the task's `result` payload, if any
    Succeeded(Option<Value>),
    Failed {
        reason: String,
    },
    Locked,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded(_))
    }
}

/// Message shown when a task was rejected because another one holds the lock.
pub fn locked_message(kind: TaskKind) -> String {
    let activity = kind.activity();
    format!(
        "Your {activity} failed due to being locked. This means there is another {activity} already in progress."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> ApiResponse {
        ApiResponse::from_value(value).unwrap()
    }

    #[test]
    fn test_each_kind_has_its_own_success_state() {
        let deployed = response(json!({"status": "success", "state": "deployed"}));
        assert_eq!(
            TaskKind::Deployment.outcome(&deployed),
            Some(TaskOutcome::Succeeded(None))
        );
        assert_eq!(TaskKind::Execution.outcome(&deployed), None);
        assert_eq!(TaskKind::Management.outcome(&deployed), None);
    }

    #[test]
    fn test_success_carries_result() {
        let executed = response(json!({
            "status": "success",
            "state": "executed",
            "result": {"output": "0 migrations applied\n"}
        }));
        let outcome = TaskKind::Execution.outcome(&executed).unwrap();
        assert_eq!(
            outcome,
            TaskOutcome::Succeeded(Some(json!({"output": "0 migrations applied\n"})))
        );
    }

    #[test]
    fn test_failed_and_locked_are_terminal_for_all_kinds() {
        let failed = response(json!({"status": "success", "state": "failed", "reason": "boom"}));
        let locked = response(json!({"status": "success", "state": "locked"}));
        for kind in [
            TaskKind::Deployment,
            TaskKind::Execution,
            TaskKind::DatabaseDump,
            TaskKind::Management,
        ] {
            assert_eq!(
                kind.outcome(&failed),
                Some(TaskOutcome::Failed {
                    reason: "boom".to_string()
                })
            );
            assert_eq!(kind.outcome(&locked), Some(TaskOutcome::Locked));
        }
    }

    #[test]
    fn test_unknown_or_missing_state_keeps_polling() {
        let running = response(json!({"status": "success", "state": "running"}));
        let missing = response(json!({"status": "success"}));
        assert_eq!(TaskKind::Deployment.outcome(&running), None);
        assert_eq!(TaskKind::Deployment.outcome(&missing), None);
    }

    #[test]
    fn test_locked_message() {
        assert_eq!(
            locked_message(TaskKind::Deployment),
            "Your deployment failed due to being locked. This means there is another deployment already in progress."
        );
        assert!(locked_message(TaskKind::DatabaseDump).contains("another database dump"));
    }
}
