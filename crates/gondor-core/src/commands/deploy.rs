//! `gondor deploy`: archive a revision, upload it and wait for the deployment.
//!
//! The pipeline is resolve → archive → upload → poll. The archive guard is
//! dropped right after the upload returns, so the temporary files are gone
//! before polling starts and on every error path before that. The cancel
//! token stays armed from the first archive stage until the upload returns,
//! so an interrupt anywhere in that window unwinds through the guard.

use std::cell::Cell;
use std::sync::Arc;

use tracing::info;

use super::CommandContext;
use crate::archive::{ArchiveBuilder, ArchiveStage};
use crate::error::GondorResult;
use crate::report::{ReporterProgress, StepMarker};
use crate::task::{TaskKind, TaskOutcome};
use crate::transport::{FormFields, Upload};
use crate::types::Revision;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub label: String,
    /// Revision token (branch, tag, hash, `HEAD`, `tip`)
    pub commit: String,
}

impl DeployOptions {
    pub fn new(label: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commit: commit.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeployReport {
    pub revision: Revision,
    pub deployment_id: String,
    /// Instance URL announced when the deployment was accepted
    pub url: Option<String>,
    pub outcome: TaskOutcome,
}

pub struct DeployCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> DeployCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &DeployOptions) -> GondorResult<DeployReport> {
        let ctx = self.ctx;
        let config = ctx.config();
        let reporter = ctx.reporter();

        let repo = ctx.repository()?;
        let revision = repo.resolve(&options.commit)?;
        let project_root = ctx.project_root_in(repo.as_ref())?;
        let app = config.app.to_json()?;
        info!(label = %options.label, sha = %revision.id, "deploying");

        let armed = ctx.cancel_token().arm();
        let step_open = Cell::new(false);
        let built = ArchiveBuilder::new(repo.as_ref())
            .with_cancel_token(ctx.cancel_token().clone())
            .build_with(
                &revision,
                &options.label,
                &config.include_files,
                |stage, started| {
                    if started {
                        reporter.begin(&stage_text(stage, &revision));
                    } else {
                        reporter.end(StepMarker::Ok);
                    }
                    step_open.set(started);
                },
            );
        let archive = match built {
            Ok(archive) => archive,
            Err(e) => {
                if step_open.get() {
                    reporter.end(StepMarker::Error);
                }
                return Err(e);
            }
        };

        reporter.line("Pushing tarball to Gondor... ");
        let fields = FormFields::new()
            .field("site_key", &config.site_key)
            .field("label", &options.label)
            .field("sha", &revision.id)
            .field("commit", revision.commit())
            .field("project_root", project_root)
            .field("app", app);
        let upload = Upload::new(
            "tarball",
            archive.tarball_path(),
            archive.file_name(),
            Arc::new(ReporterProgress(Arc::clone(reporter))),
            ctx.cancel_token().clone(),
        );
        let response = ctx.api().post_multipart("deploy/", &fields, Some(upload));
        drop(armed);
        drop(archive);

        let response = response?.into_success()?;
        let deployment_id = response.id_field("deployment")?;
        let url = response.str_field("url").map(str::to_string);

        reporter.begin("Deploying... ");
        let outcome = ctx.finish_task(&options.label, &deployment_id, TaskKind::Deployment)?;

        Ok(DeployReport {
            revision,
            deployment_id,
            url,
            outcome,
        })
    }
}

fn stage_text(stage: ArchiveStage, revision: &Revision) -> String {
    match stage {
        ArchiveStage::Snapshot => format!("Archiving code from {}... ", revision.commit()),
        ArchiveStage::IncludeFiles => "Adding untracked files... ".to_string(),
        ArchiveStage::Compress => "Building tarball... ".to_string(),
    }
}
