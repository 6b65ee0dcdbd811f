//! User-facing progress reporting.
//!
//! Commands announce each step (`Building tarball... `), close it with a
//! marker (`[ok]`), and forward upload byte counts. Frontends decide how
//! that is rendered.

use std::sync::Arc;

use crate::transport::ProgressSink;

/// Outcome marker printed after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMarker {
    Ok,
    Error,
    Failed,
    Locked,
    Unknown,
}

impl StepMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            StepMarker::Ok => "ok",
            StepMarker::Error => "error",
            StepMarker::Failed => "failed",
            StepMarker::Locked => "locked",
            StepMarker::Unknown => "unknown",
        }
    }
}

/// Sink for step and progress output.
pub trait Reporter: Send + Sync {
    /// A step started; `text` is printed without a line break.
    fn begin(&self, text: &str);

    /// The current step finished.
    fn end(&self, marker: StepMarker);

    /// A free-standing line of output.
    fn line(&self, text: &str);

    /// Upload progress: cumulative bytes sent out of `total`.
    fn progress(&self, sent: u64, total: u64);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn begin(&self, _text: &str) {}
    fn end(&self, _marker: StepMarker) {}
    fn line(&self, _text: &str) {}
    fn progress(&self, _sent: u64, _total: u64) {}
}

/// Forwards upload progress from the transport to a reporter.
pub struct ReporterProgress(pub Arc<dyn Reporter>);

impl ProgressSink for ReporterProgress {
    fn progress(&self, sent: u64, total: u64) {
        self.0.progress(sent, total);
    }
}
