//! `gondor run`: execute a management command on an instance.

use serde::Serialize;

use super::CommandContext;
use crate::error::{GondorError, GondorResult};
use crate::task::{TaskKind, TaskOutcome};
use crate::transport::FormFields;

/// Command whose parameters are collected interactively.
pub const CREATE_SUPERUSER: &str = "createsuperuser";

/// Account details for `createsuperuser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuperuserParams {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// The `params` payload of a run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunParams {
    /// Positional arguments forwarded to the command
    Args(Vec<String>),
    Superuser(SuperuserParams),
}

impl RunParams {
    pub fn to_json(&self) -> GondorResult<String> {
        let encoded = match self {
            RunParams::Args(args) => serde_json::to_string(&serde_json::json!({ "cmdargs": args })),
            RunParams::Superuser(params) => serde_json::to_string(params),
        };
        encoded.map_err(|e| GondorError::Config(format!("Failed to encode run parameters: {}", e)))
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub instance_label: String,
    pub command: String,
    pub params: RunParams,
}

impl RunOptions {
    pub fn new(instance_label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            instance_label: instance_label.into(),
            command: command.into(),
            params: RunParams::Args(Vec::new()),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = RunParams::Args(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_superuser(mut self, params: SuperuserParams) -> Self {
        self.params = RunParams::Superuser(params);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: TaskOutcome,
    /// Command output on success
    pub output: Option<String>,
}

pub struct RunCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> RunCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &RunOptions) -> GondorResult<RunReport> {
        let ctx = self.ctx;
        let config = ctx.config();
        let repo = ctx.repository()?;
        let fields = FormFields::new()
            .field("site_key", &config.site_key)
            .field("instance_label", &options.instance_label)
            .field("project_root", ctx.project_root_in(repo.as_ref())?)
            .field("command", &options.command)
            .field("params", options.params.to_json()?)
            .field("app", config.app.to_json()?);

        ctx.reporter().begin("Executing... ");
        let response = ctx.close_on_error(
            ctx.api()
                .post_form("run/", &fields)
                .and_then(|r| r.into_success()),
        )?;
        let task_id = ctx.close_on_error(response.id_field("task"))?;
        let outcome = ctx.finish_task(&options.instance_label, &task_id, TaskKind::Execution)?;

        let output = match &outcome {
            TaskOutcome::Succeeded(Some(result)) => result
                .get("output")
                .and_then(|o| o.as_str())
                .map(str::to_string),
            _ => None,
        };
        Ok(RunReport { outcome, output })
    }
}

/// Usernames may contain letters, digits and `_ . @ + -`.
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if valid {
        Ok(())
    } else {
        Err("That username is invalid. Use only letters, digits and underscores.")
    }
}

/// Basic `local@domain.tld` shape check.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    const INVALID: &str = "That email address is invalid.";

    let (local, domain) = email.rsplit_once('@').ok_or(INVALID)?;
    let local_ok = !local.is_empty()
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-!#$%&'*+/=?^_`{}|~".contains(c))
        });

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels[..labels.len() - 1].iter().all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic()));

    if local_ok && domain_ok { Ok(()) } else { Err(INVALID) }
}

/// Passwords must match and must not be blank.
pub fn validate_password(password: &str, confirmation: &str) -> Result<(), &'static str> {
    if password != confirmation {
        return Err("Your passwords didn't match.");
    }
    if password.trim().is_empty() {
        return Err("Blank passwords aren't allowed.");
    }
    Ok(())
}
