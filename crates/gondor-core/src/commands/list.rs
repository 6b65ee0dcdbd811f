//! `gondor list`: show the instances of a site.

use serde::Deserialize;

use super::CommandContext;
use crate::error::{GondorError, GondorResult};
use crate::transport::{ApiResponse, FormFields};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LastDeployment {
    pub sha: String,
}

/// One instance as returned by `list/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstanceSummary {
    pub label: String,
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub last_deployment: Option<LastDeployment>,
}

impl InstanceSummary {
    /// First eight characters of the last deployed revision.
    pub fn short_sha(&self) -> &str {
        match &self.last_deployment {
            Some(deployment) => deployment.sha.get(..8).unwrap_or(&deployment.sha),
            None => "",
        }
    }

    /// `label [kind] url sha8`
    pub fn display_line(&self) -> String {
        format!("{} [{}] {} {}", self.label, self.kind, self.url, self.short_sha())
    }
}

pub struct ListCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ListCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    /// Instances sorted by label.
    pub fn execute(&self) -> GondorResult<Vec<InstanceSummary>> {
        let fields = FormFields::new().field("site_key", &self.ctx.config().site_key);
        let response = self.ctx.api().post_form("list/", &fields)?.into_success()?;
        parse_instances(&response)
    }
}

pub fn parse_instances(response: &ApiResponse) -> GondorResult<Vec<InstanceSummary>> {
    let raw = response
        .get("instances")
        .cloned()
        .ok_or_else(|| GondorError::InvalidResponse("response is missing 'instances'".to_string()))?;
    let mut instances: Vec<InstanceSummary> =
        serde_json::from_value(raw).map_err(|e| GondorError::InvalidResponse(e.to_string()))?;
    instances.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(instances)
}
