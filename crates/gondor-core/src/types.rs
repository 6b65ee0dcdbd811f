//! Shared core types used across configuration, version control and commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GondorError;

/// Supported version control systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VcsKind {
    #[serde(rename = "git")]
    Git,
    #[serde(rename = "hg", alias = "mercurial")]
    Mercurial,
}

impl VcsKind {
    /// Directory that marks a repository root.
    pub fn marker(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
        }
    }

    /// Name used in the project config file.
    pub fn as_str(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
        }
    }

    /// Branch suggested after `gondor init`.
    pub fn default_branch(self) -> &'static str {
        match self {
            VcsKind::Git => "master",
            VcsKind::Mercurial => "default",
        }
    }

    /// Revision suggested after `gondor create`.
    pub fn head_revision(self) -> &'static str {
        match self {
            VcsKind::Git => "HEAD",
            VcsKind::Mercurial => "tip",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsKind {
    type Err = GondorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "git" => Ok(VcsKind::Git),
            "hg" | "mercurial" => Ok(VcsKind::Mercurial),
            other => Err(GondorError::UnsupportedVcs(other.to_string())),
        }
    }
}

/// A revision token together with the stable identifier it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Token as typed by the user (branch, tag, `HEAD`, ...)
    pub token: String,
    /// Resolved content hash
    pub id: String,
}

impl Revision {
    pub fn new(token: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            id: id.into(),
        }
    }

    /// Value reported to the server as `commit`.
    ///
    /// `HEAD` moves, so it is replaced by the hash it pointed at.
    pub fn commit(&self) -> &str {
        if self.token == "HEAD" {
            &self.id
        } else {
            &self.token
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcs_kind_from_str() {
        assert_eq!("git".parse::<VcsKind>().unwrap(), VcsKind::Git);
        assert_eq!("hg".parse::<VcsKind>().unwrap(), VcsKind::Mercurial);
        assert_eq!("mercurial".parse::<VcsKind>().unwrap(), VcsKind::Mercurial);

        let err = "svn".parse::<VcsKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "'svn' is not a valid version control system for Gondor"
        );
    }

    #[test]
    fn test_head_commit_is_replaced_by_hash() {
        let head = Revision::new("HEAD", "abc123");
        assert_eq!(head.commit(), "abc123");

        let branch = Revision::new("master", "abc123");
        assert_eq!(branch.commit(), "master");
    }
}
