//! Project configuration schema (`.gondor/config`).

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GondorError, GondorResult};
use crate::types::VcsKind;

/// Endpoint used when the config file does not set one.
pub const DEFAULT_ENDPOINT: &str = "https://api.gondor.io";

/// Raw on-disk layout of `.gondor/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub gondor: GondorSection,
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub files: FilesSection,
}

/// `[gondor]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GondorSection {
    #[serde(default)]
    pub site_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub vcs: Option<String>,
}

/// `[app]` section, forwarded to the server as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub requirements_file: Option<String>,
    pub wsgi_entry_point: Option<String>,
    /// One of `nashvegas`, `south` or `none`
    pub migrations: Option<String>,
    pub staticfiles: Option<String>,
    pub site_media_url: Option<String>,
}

impl AppSettings {
    /// JSON form sent in the `app` request field.
    pub fn to_json(&self) -> GondorResult<String> {
        serde_json::to_string(self)
            .map_err(|e| GondorError::Config(format!("Failed to encode app settings: {}", e)))
    }
}

/// `[files]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilesSection {
    /// Paths relative to the repository root added to every archive
    #[serde(default)]
    pub include: Vec<String>,
}

/// Validated project configuration, immutable for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub site_key: String,
    pub endpoint: Url,
    pub vcs: VcsKind,
    pub app: AppSettings,
    pub include_files: Vec<String>,
}

impl TryFrom<ConfigFile> for ProjectConfig {
    type Error = GondorError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let site_key = file
            .gondor
            .site_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GondorError::Config("missing 'site_key' in [gondor]".to_string()))?;

        let vcs = file
            .gondor
            .vcs
            .ok_or_else(|| GondorError::Config("missing 'vcs' in [gondor]".to_string()))?
            .parse::<VcsKind>()?;

        let raw_endpoint = file.gondor.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw_endpoint)
            .map_err(|e| GondorError::Config(format!("invalid endpoint '{}': {}", raw_endpoint, e)))?;

        let include_files = file
            .files
            .include
            .into_iter()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect();

        Ok(Self {
            site_key,
            endpoint,
            vcs,
            app: file.app,
            include_files,
        })
    }
}
