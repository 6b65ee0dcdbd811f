//! `gondor create`: register a new instance.

use super::CommandContext;
use crate::error::GondorResult;
use crate::transport::FormFields;

/// Instance kind used when none is given.
pub const DEFAULT_KIND: &str = "dev";

#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub label: String,
    pub kind: Option<String>,
}

impl CreateOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    pub label: String,
    pub kind: String,
    pub url: Option<String>,
    /// Suggested deploy invocation for the new instance
    pub next_command: String,
}

pub struct CreateCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> CreateCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &CreateOptions) -> GondorResult<CreateReport> {
        let config = self.ctx.config();
        let kind = options.kind.as_deref().unwrap_or(DEFAULT_KIND);
        let fields = FormFields::new()
            .field("site_key", &config.site_key)
            .field("label", &options.label)
            .field("kind", kind)
            .field("project_root", self.ctx.project().root_name());

        let response = self.ctx.step("Creating instance on Gondor... ", || {
            self.ctx.api().post_form("create/", &fields)?.into_success()
        })?;

        Ok(CreateReport {
            label: options.label.clone(),
            kind: kind.to_string(),
            url: response.str_field("url").map(str::to_string),
            next_command: format!(
                "gondor deploy {} {}",
                options.label,
                config.vcs.head_revision()
            ),
        })
    }
}
