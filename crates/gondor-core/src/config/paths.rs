//! Config path resolution helpers.

use std::path::{Component, Path, PathBuf};

use crate::error::{GondorError, GondorResult};

/// Directory holding the project config, and marking the project root.
pub const PROJECT_DIR: &str = ".gondor";

/// File name of the project config inside [`PROJECT_DIR`].
pub const PROJECT_CONFIG_FILE: &str = "config";

/// Per-user credentials file name, relative to the home directory.
pub const CREDENTIALS_FILE: &str = ".gondor";

/// Walk up from `start` and return the first directory containing a `marker` directory.
pub fn find_nearest(start: &Path, marker: &str) -> GondorResult<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(marker).is_dir() {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(GondorError::MissingMarker {
        marker: marker.to_string(),
        start: start.to_path_buf(),
    })
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(PROJECT_CONFIG_FILE)
}

pub fn credentials_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CREDENTIALS_FILE)
}

/// Express `path` relative to `base` using `/` separators (`.` when equal).
///
/// `base` must be an ancestor of `path`.
pub fn relative_to(path: &Path, base: &Path) -> GondorResult<String> {
    let rel = path.strip_prefix(base).map_err(|_| {
        GondorError::Config(format!(
            "{} is not inside {}",
            path.display(),
            base.display()
        ))
    })?;

    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(parts.join("/"))
    }
}
