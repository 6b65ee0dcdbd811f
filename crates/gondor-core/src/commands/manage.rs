//! `gondor manage`: run an instance operation such as `database:copy`.

use std::io::{self, Read, Write};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;

use super::CommandContext;
use crate::error::GondorResult;
use crate::report::ReporterProgress;
use crate::task::{TaskKind, TaskOutcome};
use crate::transport::{CancelToken, CancellableReader, FormFields, Upload};

pub struct ManageOptions {
    pub instance_label: String,
    pub operation: String,
    pub args: Vec<String>,
    /// Piped input forwarded to the operation as the `stdin` file
    pub stdin: Option<Box<dyn Read>>,
}

impl ManageOptions {
    pub fn new(instance_label: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            instance_label: instance_label.into(),
            operation: operation.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stdin(mut self, stdin: Box<dyn Read>) -> Self {
        self.stdin = Some(stdin);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManageReport {
    pub outcome: TaskOutcome,
}

pub struct ManageCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ManageCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: ManageOptions) -> GondorResult<ManageReport> {
        let ctx = self.ctx;
        let reporter = ctx.reporter();

        let mut fields = FormFields::new()
            .field("site_key", &ctx.config().site_key)
            .field("instance_label", &options.instance_label)
            .field("operation", &options.operation);
        for arg in &options.args {
            fields.push("arg", arg);
        }

        // Armed while the spool file exists; keep it alive until the request has been sent.
        let armed = options.stdin.as_ref().map(|_| ctx.cancel_token().arm());
        let spool = match options.stdin {
            Some(mut input) => Some(spool(&mut input, ctx.cancel_token())?),
            None => None,
        };
        let upload = spool.as_ref().map(|file| {
            reporter.line("Pushing stdin to Gondor... ");
            Upload::new(
                "stdin",
                file.path(),
                "stdin",
                Arc::new(ReporterProgress(Arc::clone(reporter))),
                ctx.cancel_token().clone(),
            )
        });

        let response = ctx.api().post_multipart("manage/", &fields, upload);
        drop(armed);
        drop(spool);
        let response = response?;

        reporter.begin("Running... ");
        let response = ctx.close_on_error(response.into_success())?;
        let task_id = ctx.close_on_error(response.id_field("task"))?;
        let outcome = ctx.finish_task(&options.instance_label, &task_id, TaskKind::Management)?;
        Ok(ManageReport { outcome })
    }
}

/// Copy piped input into a temporary file so it can be sent with a known length.
///
/// The file is removed again when the copy is cancelled or fails.
fn spool(input: &mut dyn Read, cancel: &CancelToken) -> GondorResult<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    let copied = io::copy(&mut CancellableReader::new(input, cancel.clone()), &mut file);
    cancel.check()?;
    let bytes = copied?;
    file.flush()?;
    debug!(bytes, path = %file.path().display(), "spooled stdin");
    Ok(file)
}
