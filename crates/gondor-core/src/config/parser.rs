//! TOML parsing with helpful error messages

use std::path::Path;

use serde::de::DeserializeOwned;

use super::schema::{ConfigFile, ProjectConfig};
use crate::error::{GondorError, GondorResult};

/// Parse `.gondor/config` into a validated project config.
pub fn parse_project_config(path: &Path) -> GondorResult<ProjectConfig> {
    let content = read_config(path)?;
    parse_project_config_str(&content)
        .map_err(|e| GondorError::Config(format!("{} ({})", e, path.display())))
}

/// Parse project config content from a string.
pub fn parse_project_config_str(content: &str) -> GondorResult<ProjectConfig> {
    let file: ConfigFile = parse_toml_str(content)?;
    ProjectConfig::try_from(file)
}

/// Read a config file, mapping IO failures to configuration errors.
pub(crate) fn read_config(path: &Path) -> GondorResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        GondorError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })
}

/// Deserialize TOML, enhancing the error with the offending lines.
pub(crate) fn parse_toml_str<T: DeserializeOwned>(content: &str) -> GondorResult<T> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> GondorError {
    let error_msg = error.message().to_string();

    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        GondorError::Config(format!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num, context, error_msg
        ))
    } else {
        GondorError::Config(format!("TOML parsing error: {}", error_msg))
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VcsKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
[gondor]
site_key = "abcdefghijkl"
vcs = "git"
endpoint = "https://staging.gondor.io"

[app]
requirements_file = "requirements/project.txt"
wsgi_entry_point = "deploy.wsgi"
migrations = "none"
staticfiles = "off"

[files]
include = ["local_settings.py", "secrets/key.pem"]
"#;

        let config = parse_project_config_str(toml).unwrap();
        assert_eq!(config.site_key, "abcdefghijkl");
        assert_eq!(config.vcs, VcsKind::Git);
        assert_eq!(config.endpoint.as_str(), "https://staging.gondor.io/");
        assert_eq!(
            config.app.requirements_file.as_deref(),
            Some("requirements/project.txt")
        );
        assert_eq!(
            config.include_files,
            vec!["local_settings.py", "secrets/key.pem"]
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = "[gondor]\nsite_key = \"abcdefghijkl\"\nvcs = \"hg\"\n";
        let config = parse_project_config_str(toml).unwrap();
        assert_eq!(config.vcs, VcsKind::Mercurial);
        assert!(config.include_files.is_empty());
        assert_eq!(config.app, Default::default());
    }

    #[test]
    fn test_parse_error_points_at_line() {
        let toml = "[gondor]\nsite_key = \"abc\"\nvcs = \n";
        let err = parse_project_config_str(toml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TOML parsing error"), "{msg}");
        assert!(msg.contains(">>>"), "{msg}");
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let toml = "[gondor]\nsite_key = \"abcdefghijkl\"\nvcs = \"git\"\nendpoint = \"not a url\"\n";
        let err = parse_project_config_str(toml).unwrap_err();
        assert!(matches!(err, GondorError::Config(_)));
        assert!(err.to_string().contains("invalid endpoint"));
    }

    #[test]
    fn test_parse_from_file_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[gondor]\nvcs = \"git\"").unwrap();

        let err = parse_project_config(file.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("site_key"), "{msg}");
        assert!(msg.contains(&file.path().display().to_string()), "{msg}");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = parse_project_config(Path::new("/nonexistent/.gondor/config")).unwrap_err();
        assert!(matches!(err, GondorError::Config(_)));
    }
}
