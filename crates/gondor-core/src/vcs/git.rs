//! Git backend: `git rev-parse` for resolution, `git archive` for snapshots.

use std::path::{Path, PathBuf};

use super::VersionControl;
use super::process::run_tool;
use crate::error::{GondorError, GondorResult};
use crate::types::{Revision, VcsKind};

#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl VersionControl for GitRepository {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, token: &str) -> GondorResult<Revision> {
        let spec = format!("{token}^{{commit}}");
        let output = run_tool(
            "git",
            &["rev-parse", "--verify", "--quiet", &spec],
            &self.root,
        )?;
        let id = output.stdout.trim();
        if !output.success || id.is_empty() {
            return Err(GondorError::UnresolvableRevision {
                token: token.to_string(),
            });
        }
        Ok(Revision::new(token, id))
    }

    fn archive(&self, revision: &Revision, destination: &Path) -> GondorResult<()> {
        let dest = destination.to_string_lossy();
        let output = run_tool(
            "git",
            &["archive", "--format=tar", &revision.id, "-o", &dest],
            &self.root,
        )?;
        if !output.success {
            return Err(GondorError::ArchiveTool {
                output: output.combined(),
            });
        }
        Ok(())
    }
}
