//! Mercurial backend: branch/tag listings for resolution, `hg archive` for snapshots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::VersionControl;
use super::process::run_tool;
use crate::error::{GondorError, GondorResult};
use crate::types::{Revision, VcsKind};

#[derive(Debug, Clone)]
pub struct MercurialRepository {
    root: PathBuf,
}

impl MercurialRepository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Build the name -> hash map from `hg branches` and `hg tags`.
    pub fn refs(&self) -> GondorResult<HashMap<String, String>> {
        let mut refs = HashMap::new();
        for listing in ["branches", "tags"] {
            let output = run_tool("hg", &[listing], &self.root)?;
            if !output.success {
                debug!(listing, stderr = %output.stderr.trim(), "hg listing failed");
                continue;
            }
            refs.extend(parse_refs(&output.stdout));
        }
        Ok(refs)
    }
}

impl VersionControl for MercurialRepository {
    fn kind(&self) -> VcsKind {
        VcsKind::Mercurial
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, token: &str) -> GondorResult<Revision> {
        let refs = self.refs()?;
        resolve_in(&refs, token)
    }

    fn archive(&self, revision: &Revision, destination: &Path) -> GondorResult<()> {
        let dest = destination.to_string_lossy();
        let output = run_tool(
            "hg",
            &["archive", "-p", ".", "-t", "tar", "-r", &revision.id, &dest],
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

/// Look `token` up in a name -> hash map.
pub fn resolve_in(refs: &HashMap<String, String>, token: &str) -> GondorResult<Revision> {
    refs.get(token)
        .map(|hash| Revision::new(token, hash.clone()))
        .ok_or_else(|| GondorError::UnresolvableRevision {
            token: token.to_string(),
        })
}

/// Parse `hg branches` / `hg tags` output.
///
/// Lines look like `default                      42:9f3c0e1b2a4d`, optionally
/// followed by ` (inactive)` or ` (closed)`. Unrecognised lines are skipped.
pub fn parse_refs(listing: &str) -> HashMap<String, String> {
    listing.lines().filter_map(parse_ref_line).collect()
}

fn parse_ref_line(line: &str) -> Option<(String, String)> {
    let mut line = line.trim_end();
    for suffix in [" (inactive)", " (closed)"] {
        if let Some(stripped) = line.strip_suffix(suffix) {
            line = stripped.trim_end();
        }
    }

    let (name, rev) = line.rsplit_once(char::is_whitespace)?;
    let (number, hash) = rev.split_once(':')?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), hash.to_string()))
}
