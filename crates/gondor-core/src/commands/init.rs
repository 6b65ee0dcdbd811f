//! `gondor init`: write the project configuration template.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::ProjectStore;
use crate::error::{GondorError, GondorResult};
use crate::report::{Reporter, StepMarker};
use crate::types::VcsKind;
use crate::vcs;

/// Site keys shorter than this are rejected.
pub const MIN_SITE_KEY_LEN: usize = 11;

/// Files that mark a Django project directory.
const PROJECT_MARKERS: [&str; 2] = ["__init__.py", "manage.py"];

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub site_key: String,
}

impl InitOptions {
    pub fn new(site_key: impl Into<String>) -> Self {
        Self {
            site_key: site_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub vcs: VcsKind,
    pub repo_root: PathBuf,
    /// False when a `.gondor` directory was already present
    pub created: bool,
    /// The repository root and the project root are the same directory
    pub shared_root: bool,
}

impl InitReport {
    /// Command suggested once the config is written.
    pub fn next_command(&self) -> String {
        format!("gondor deploy primary {}", self.vcs.default_branch())
    }
}

/// Creates `.gondor/config` in a Django project directory.
pub struct InitCommand {
    project_dir: PathBuf,
    reporter: Arc<dyn Reporter>,
}

impl InitCommand {
    pub fn new(project_dir: PathBuf, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            project_dir,
            reporter,
        }
    }

    pub fn execute(&self, options: &InitOptions) -> GondorResult<InitReport> {
        validate_site_key(&options.site_key)?;
        ensure_project_dir(&self.project_dir)?;

        let repo = vcs::detect(&self.project_dir)?;
        let store = ProjectStore::new(self.project_dir.clone());
        let shared_root = repo.root() == self.project_dir.as_path();
        let mut report = InitReport {
            vcs: repo.kind(),
            repo_root: repo.root().to_path_buf(),
            created: false,
            shared_root,
        };

        if store.exists() {
            debug!(path = %store.project_dir().display(), "project already initialised");
            self.reporter
                .line("Detecting existing .gondor/config. Not overriding.");
            return Ok(report);
        }

        if shared_root {
            self.warn_shared_root(repo.kind());
        }

        self.reporter
            .begin("Writing configuration (.gondor/config)... ");
        match store.write_template(&options.site_key, repo.kind()) {
            Ok(()) => self.reporter.end(StepMarker::Ok),
            Err(e) => {
                self.reporter.end(StepMarker::Error);
                return Err(e);
            }
        }
        report.created = true;
        Ok(report)
    }

    fn warn_shared_root(&self, kind: VcsKind) {
        let lines = [
            format!(
                "WARNING: we've detected your repo root (directory containing {}) is the same",
                kind.marker()
            ),
            "directory as your project root. This is certainly allowed, but many of our".to_string(),
            "users have problems with this setup because the parent directory is *not* the"
                .to_string(),
            "same on Gondor as it is locally. See https://gondor.io/support/project-layout/"
                .to_string(),
            "for more information on the suggested layout.".to_string(),
            String::new(),
        ];
        for line in &lines {
            self.reporter.line(line);
        }
    }
}

fn validate_site_key(site_key: &str) -> GondorResult<()> {
    if site_key.len() < MIN_SITE_KEY_LEN {
        return Err(GondorError::Config(
            "The site key given is too short.".to_string(),
        ));
    }
    Ok(())
}

fn ensure_project_dir(dir: &Path) -> GondorResult<()> {
    if PROJECT_MARKERS.iter().all(|name| dir.join(name).exists()) {
        Ok(())
    } else {
        Err(GondorError::Config(
            "must run gondor init from a Django project directory.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project_config;
    use crate::report::NullReporter;
    use tempfile::TempDir;

    fn django_project(root: &Path) -> PathBuf {
        let project = root.join("mysite");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("__init__.py"), "").unwrap();
        std::fs::write(project.join("manage.py"), "").unwrap();
        project
    }

    fn command(dir: &Path) -> InitCommand {
        InitCommand::new(dir.to_path_buf(), Arc::new(NullReporter))
    }

    #[test]
    fn test_short_site_key_rejected() {
        let temp = TempDir::new().unwrap();
        let project = django_project(temp.path());

        let err = command(&project)
            .execute(&InitOptions::new("tooshort"))
            .unwrap_err();
        assert_eq!(err.to_string(), "The site key given is too short.");
    }

    #[test]
    fn test_requires_django_project() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();

        let err = command(temp.path())
            .execute(&InitOptions::new("abcdefghijk"))
            .unwrap_err();
        assert!(err.to_string().contains("Django project directory"));
    }

    #[test]
    fn test_writes_config_for_detected_vcs() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".hg")).unwrap();
        let project = django_project(temp.path());

        let report = command(&project)
            .execute(&InitOptions::new("abcdefghijk"))
            .unwrap();

        assert!(report.created);
        assert!(!report.shared_root);
        assert_eq!(report.vcs, VcsKind::Mercurial);
        assert_eq!(report.next_command(), "gondor deploy primary default");

        let config = parse_project_config(&project.join(".gondor").join("config")).unwrap();
        assert_eq!(config.site_key, "abcdefghijk");
        assert_eq!(config.vcs, VcsKind::Mercurial);
    }

    #[test]
    fn test_existing_config_is_kept() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        let project = django_project(temp.path());
        std::fs::create_dir_all(project.join(".gondor")).unwrap();
        std::fs::write(project.join(".gondor").join("config"), "custom").unwrap();

        let report = command(&project)
            .execute(&InitOptions::new("abcdefghijk"))
            .unwrap();

        assert!(!report.created);
        assert_eq!(
            std::fs::read_to_string(project.join(".gondor").join("config")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_flags_shared_root() {
        let temp = TempDir::new().unwrap();
        let project = django_project(temp.path());
        std::fs::create_dir_all(project.join(".git")).unwrap();

        let report = command(&project)
            .execute(&InitOptions::new("abcdefghijk"))
            .unwrap();

        assert!(report.shared_root);
        assert_eq!(report.vcs, VcsKind::Git);
    }
}
