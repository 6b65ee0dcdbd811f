//! `gondor sqldump`: dump an instance database to a writer.

use std::io::{self, Write};

use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::debug;

use super::CommandContext;
use crate::error::{GondorError, GondorResult};
use crate::task::{TaskKind, TaskOutcome};
use crate::transport::FormFields;

#[derive(Debug, Clone)]
pub struct SqldumpOptions {
    pub label: String,
}

impl SqldumpOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqldumpReport {
    pub outcome: TaskOutcome,
    /// Uncompressed bytes written to the output
    pub bytes_written: u64,
}

pub struct SqldumpCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> SqldumpCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Request a dump and, once the task finishes, stream the decompressed
    /// SQL into `out`. Nothing is written unless the task succeeds.
    pub fn execute(&self, options: &SqldumpOptions, out: &mut dyn Write) -> GondorResult<SqldumpReport> {
        let ctx = self.ctx;
        let fields = FormFields::new()
            .field("site_key", &ctx.config().site_key)
            .field("label", &options.label);

        ctx.reporter().begin("Dumping database... ");
        let response = ctx.close_on_error(
            ctx.api()
                .post_form("sqldump/", &fields)
                .and_then(|r| r.into_success()),
        )?;
        let task_id = ctx.close_on_error(response.id_field("task"))?;
        let outcome = ctx.finish_task(&options.label, &task_id, TaskKind::DatabaseDump)?;

        let public_url = match &outcome {
            TaskOutcome::Succeeded(result) => Some(public_url(result.as_ref())?),
            _ => None,
        };
        let Some(public_url) = public_url else {
            return Ok(SqldumpReport {
                outcome,
                bytes_written: 0,
            });
        };

        debug!(url = %public_url, "downloading database dump");
        let body = ctx.api().download(&public_url)?;
        let bytes_written = io::copy(&mut GzDecoder::new(body), out)?;
        out.flush()?;

        Ok(SqldumpReport {
            outcome,
            bytes_written,
        })
    }
}

fn public_url(result: Option<&Value>) -> GondorResult<String> {
    result
        .and_then(|r| r.get("public_url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GondorError::InvalidResponse("dump result is missing 'public_url'".to_string()))
}
