//! Version control backends.
//!
//! The deploy pipeline only needs two things from a repository: turn a
//! revision token into a stable hash, and write a tar snapshot of the tree at
//! that hash. Each supported tool implements [`VersionControl`]; callers
//! never branch on the tool kind.

mod git;
mod mercurial;
mod process;

use std::path::Path;

pub use git::GitRepository;
pub use mercurial::{MercurialRepository, parse_refs, resolve_in};
pub use process::{ToolOutput, run_tool};

use crate::config::find_nearest;
use crate::error::{GondorError, GondorResult};
use crate::types::{Revision, VcsKind};

/// Capability interface of a version control backend.
pub trait VersionControl {
    fn kind(&self) -> VcsKind;

    /// Repository root (the directory holding `.git` / `.hg`).
    fn root(&self) -> &Path;

    /// Map a revision token to its stable identifier.
    fn resolve(&self, token: &str) -> GondorResult<Revision>;

    /// Write an uncompressed tar of the tree at `revision` to `destination`.
    fn archive(&self, revision: &Revision, destination: &Path) -> GondorResult<()>;
}

/// Open the repository of the given kind enclosing `start`.
pub fn open(kind: VcsKind, start: &Path) -> GondorResult<Box<dyn VersionControl>> {
    let root = find_nearest(start, kind.marker())?;
    Ok(match kind {
        VcsKind::Git => Box::new(GitRepository::new(root)),
        VcsKind::Mercurial => Box::new(MercurialRepository::new(root)),
    })
}

/// Detect which supported repository encloses `start` (git first, then mercurial).
pub fn detect(start: &Path) -> GondorResult<Box<dyn VersionControl>> {
    for kind in [VcsKind::Git, VcsKind::Mercurial] {
        if let Ok(repo) = open(kind, start) {
            return Ok(repo);
        }
    }
    Err(GondorError::Config(
        "unable to find a supported version control directory. Looked for .git and .hg."
            .to_string(),
    ))
}
