//! Shared state for commands that talk to the Gondor API.

use std::path::Path;
use std::sync::Arc;

use crate::config::{Project, ProjectConfig, relative_to};
use crate::error::{GondorError, GondorResult};
use crate::report::{Reporter, StepMarker};
use crate::task::{PollSettings, TaskKind, TaskOutcome, TaskPoller};
use crate::transport::{CancelToken, RemoteApi};
use crate::vcs::{self, VersionControl};

/// Everything a network command needs: the loaded project, an API handle,
/// an output sink, the interrupt token and polling timings.
///
/// Frontends build this once per invocation and hand it to a command.
#[derive(Clone)]
pub struct CommandContext {
    project: Project,
    api: Arc<dyn RemoteApi>,
    reporter: Arc<dyn Reporter>,
    cancel: CancelToken,
    poll: PollSettings,
}

impl CommandContext {
    pub fn new(project: Project, api: Arc<dyn RemoteApi>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            project,
            api,
            reporter,
            cancel: CancelToken::new(),
            poll: PollSettings::default(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Locate and load the project above `start`, reported as a step.
    pub fn read_project(start: &Path, reporter: &dyn Reporter) -> GondorResult<Project> {
        run_step(reporter, "Reading configuration... ", || Project::discover(start))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &ProjectConfig {
        self.project.config()
    }

    pub fn api(&self) -> &dyn RemoteApi {
        self.api.as_ref()
    }

    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn poll_settings(&self) -> &PollSettings {
        &self.poll
    }

    /// Open the configured repository enclosing the project.
    pub(crate) fn repository(&self) -> GondorResult<Box<dyn VersionControl>> {
        vcs::open(self.config().vcs, self.project.root())
    }

    /// Project root relative to the repository root, as the server expects it.
    pub(crate) fn project_root_in(&self, repo: &dyn VersionControl) -> GondorResult<String> {
        relative_to(self.project.root(), repo.root())
    }

    pub(crate) fn step<T>(
        &self,
        text: &str,
        f: impl FnOnce() -> GondorResult<T>,
    ) -> GondorResult<T> {
        run_step(self.reporter.as_ref(), text, f)
    }

    /// Poll a task to completion and close the open step with its marker.
    pub(crate) fn finish_task(
        &self,
        instance_label: &str,
        task_id: &str,
        kind: TaskKind,
    ) -> GondorResult<TaskOutcome> {
        let poller = TaskPoller::new(
            self.api(),
            &self.config().site_key,
            instance_label,
            &self.poll,
        );
        let result = poller.poll(task_id, kind);
        self.reporter.end(match &result {
            Ok(outcome) => outcome_marker(outcome),
            Err(e) => error_marker(e),
        });
        result
    }

    /// Close the open step with the marker matching `result`.
    pub(crate) fn close_on_error<T>(&self, result: GondorResult<T>) -> GondorResult<T> {
        if let Err(e) = &result {
            self.reporter.end(error_marker(e));
        }
        result
    }
}

fn run_step<T>(
    reporter: &dyn Reporter,
    text: &str,
    f: impl FnOnce() -> GondorResult<T>,
) -> GondorResult<T> {
    reporter.begin(text);
    let result = f();
    reporter.end(match &result {
        Ok(_) => StepMarker::Ok,
        Err(e) => error_marker(e),
    });
    result
}

pub(crate) fn outcome_marker(outcome: &TaskOutcome) -> StepMarker {
    match outcome {
        TaskOutcome::Succeeded(_) => StepMarker::Ok,
        TaskOutcome::Failed { .. } => StepMarker::Failed,
        TaskOutcome::Locked => StepMarker::Locked,
    }
}

pub(crate) fn error_marker(error: &GondorError) -> StepMarker {
    match error {
        GondorError::InvalidResponse(_) => StepMarker::Unknown,
        _ => StepMarker::Error,
    }
}
