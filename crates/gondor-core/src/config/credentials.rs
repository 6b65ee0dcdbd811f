//! Per-user account credentials (`~/.gondor`).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::parser::{parse_toml_str, read_config};
use super::paths::credentials_path;
use crate::error::{GondorError, GondorResult};

const MISCONFIGURED: &str = "you must set your credentials in ~/.gondor correctly";

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    auth: AuthSection,
}

#[derive(Debug, Default, Deserialize)]
struct AuthSection {
    username: Option<String>,
    password: Option<String>,
}

/// Account credentials sent with every API request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Default location: `~/.gondor`.
    pub fn default_path() -> GondorResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GondorError::Config("Could not determine home directory".to_string()))?;
        Ok(credentials_path(&home))
    }

    pub fn load_default() -> GondorResult<Self> {
        Self::load(&Self::default_path()?)
    }

    pub fn load(path: &Path) -> GondorResult<Self> {
        if !path.is_file() {
            return Err(GondorError::Config(MISCONFIGURED.to_string()));
        }
        let content = read_config(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> GondorResult<Self> {
        let file: CredentialsFile = parse_toml_str(content)?;
        match (file.auth.username, file.auth.password) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(Self { username, password })
            }
            _ => Err(GondorError::Config(MISCONFIGURED.to_string())),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_credentials() {
        let creds = Credentials::parse("[auth]\nusername = \"alice\"\npassword = \"s3cret\"\n").unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_missing_password_is_rejected() {
        let err = Credentials::parse("[auth]\nusername = \"alice\"\n").unwrap_err();
        assert_eq!(err.to_string(), MISCONFIGURED);
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = Credentials::load(&temp.path().join(".gondor")).unwrap_err();
        assert_eq!(err.to_string(), MISCONFIGURED);
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("alice", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }
}
