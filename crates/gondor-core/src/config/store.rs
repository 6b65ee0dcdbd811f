//! Project store for locating, loading and creating `.gondor/config`.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::paths::{PROJECT_DIR, find_nearest, project_config_path};
use super::{ProjectConfig, parser};
use crate::error::GondorResult;
use crate::types::VcsKind;

/// Handle on the `.gondor` directory of one project.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    project_root: PathBuf,
    config_path: PathBuf,
}

impl ProjectStore {
    pub fn new(project_root: PathBuf) -> Self {
        let config_path = project_config_path(&project_root);
        Self {
            project_root,
            config_path,
        }
    }

    /// Locate the project root by walking up from `start`.
    pub fn discover(start: &Path) -> GondorResult<Self> {
        let root = find_nearest(start, PROJECT_DIR)?;
        debug!(root = %root.display(), "found project root");
        Ok(Self::new(root))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn project_dir(&self) -> PathBuf {
        self.project_root.join(PROJECT_DIR)
    }

    pub fn exists(&self) -> bool {
        self.project_dir().exists()
    }

    pub fn load(&self) -> GondorResult<ProjectConfig> {
        parser::parse_project_config(&self.config_path)
    }

    /// Create `.gondor/config` from the default template.
    pub fn write_template(&self, site_key: &str, vcs: VcsKind) -> GondorResult<()> {
        std::fs::create_dir_all(self.project_dir())?;
        std::fs::write(&self.config_path, render_template(site_key, vcs))?;
        Ok(())
    }
}

/// A located project with its loaded configuration.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
}

impl Project {
    pub fn new(root: PathBuf, config: ProjectConfig) -> Self {
        Self { root, config }
    }

    /// Find the nearest project above `start` and load its config.
    pub fn discover(start: &Path) -> GondorResult<Self> {
        let store = ProjectStore::discover(start)?;
        let config = store.load()?;
        Ok(Self::new(store.project_root, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Directory name of the project root, as sent on instance creation.
    pub fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn render_template(site_key: &str, vcs: VcsKind) -> String {
    // Quoted and escaped as a TOML basic string
    let site_key = toml::Value::String(site_key.to_string());
    format!(
        r#"[gondor]
site_key = {site_key}
vcs = "{vcs}"

[app]
# this path is relative to your project root (the directory .gondor is in)
requirements_file = "requirements/project.txt"

# this is a Python path and the default value maps to deploy/wsgi.py on disk
wsgi_entry_point = "deploy.wsgi"

# can be either nashvegas, south or none
migrations = "none"

# whether or not to run collectstatic (or build_static if collectstatic is not
# available)
staticfiles = "off"

[files]
# untracked files (relative to the repository root) added to every deploy
include = []
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_template_round_trips_through_parser() {
        let temp = TempDir::new().unwrap();
        let store = ProjectStore::new(temp.path().to_path_buf());
        store.write_template("abcdefghijkl", VcsKind::Mercurial).unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.site_key, "abcdefghijkl");
        assert_eq!(config.vcs, VcsKind::Mercurial);
        assert_eq!(config.app.wsgi_entry_point.as_deref(), Some("deploy.wsgi"));
        assert_eq!(config.app.staticfiles.as_deref(), Some("off"));
        assert!(config.include_files.is_empty());
    }

    #[test]
    fn test_template_escapes_site_key() {
        let temp = TempDir::new().unwrap();
        let store = ProjectStore::new(temp.path().to_path_buf());
        let key = r#"abc"def\ghi'jkl"#;

        store.write_template(key, VcsKind::Git).unwrap();

        assert_eq!(store.load().unwrap().site_key, key);
    }

    #[test]
    fn test_discover_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mysite");
        ProjectStore::new(root.clone())
            .write_template("abcdefghijkl", VcsKind::Git)
            .unwrap();
        let nested = root.join("apps").join("blog");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::discover(&nested).unwrap();
        assert_eq!(project.root(), root);
        assert_eq!(project.root_name(), "mysite");
        assert_eq!(project.config().vcs, VcsKind::Git);
    }
}
