//! Deploy archive assembly.
//!
//! An archive is built in three passes over the filesystem: the backend
//! writes `{label}-{rev}.tar`, configured untracked files are appended to
//! it, and the result is gzipped into `{label}-{rev}.tar.gz`. Both files
//! live in the repository root and are owned by an [`Archive`] guard that
//! removes them when dropped.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use crate::error::{GondorError, GondorResult};
use crate::transport::{CancelToken, CancellableReader};
use crate::types::Revision;
use crate::vcs::VersionControl;

const BLOCK_SIZE: u64 = 512;

/// File names of the intermediate tar and the final tarball.
pub fn archive_file_names(label: &str, revision_id: &str) -> (String, String) {
    let stem = format!("{}-{}", label, revision_id);
    (format!("{stem}.tar"), format!("{stem}.tar.gz"))
}

/// Temporary archive files of one deploy.
///
/// Dropping the guard deletes both files, whatever state they are in.
#[derive(Debug)]
pub struct Archive {
    tar_path: PathBuf,
    tarball_path: PathBuf,
}

impl Archive {
    /// Claim the archive paths for `label` at `revision` under `dir`.
    pub fn new(dir: &Path, label: &str, revision: &Revision) -> Self {
        let (tar_name, tarball_name) = archive_file_names(label, &revision.id);
        Self {
            tar_path: dir.join(tar_name),
            tarball_path: dir.join(tarball_name),
        }
    }

    pub fn tar_path(&self) -> &Path {
        &self.tar_path
    }

    pub fn tarball_path(&self) -> &Path {
        &self.tarball_path
    }

    /// File name of the compressed tarball.
    pub fn file_name(&self) -> String {
        self.tarball_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn size(&self) -> GondorResult<u64> {
        Ok(std::fs::metadata(&self.tarball_path)?.len())
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        for path in [&self.tar_path, &self.tarball_path] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed archive file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove archive file"),
            }
        }
    }
}

/// Stages reported while an archive is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStage {
    /// The backend is writing the tree snapshot
    Snapshot,
    /// Untracked files are being appended
    IncludeFiles,
    /// The tar is being compressed
    Compress,
}

/// Builds deploy archives from a version control backend.
pub struct ArchiveBuilder<'a> {
    vcs: &'a dyn VersionControl,
    cancel: CancelToken,
}

impl<'a> ArchiveBuilder<'a> {
    pub fn new(vcs: &'a dyn VersionControl) -> Self {
        Self {
            vcs,
            cancel: CancelToken::new(),
        }
    }

    /// Stop between stages and during compression once `cancel` fires.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(
        &self,
        revision: &Revision,
        label: &str,
        include_files: &[String],
    ) -> GondorResult<Archive> {
        self.build_with(revision, label, include_files, |_, _| {})
    }

    /// Build the archive, calling `on_stage(stage, started)` around each step.
    ///
    /// On any failure the partial files are removed before returning. A
    /// failure after cancellation is reported as [`GondorError::Interrupted`].
    pub fn build_with(
        &self,
        revision: &Revision,
        label: &str,
        include_files: &[String],
        mut on_stage: impl FnMut(ArchiveStage, bool),
    ) -> GondorResult<Archive> {
        let archive = Archive::new(self.vcs.root(), label, revision);
        match self.run_stages(&archive, revision, include_files, &mut on_stage) {
            Ok(()) => {
                debug!(tarball = %archive.tarball_path().display(), "archive ready");
                Ok(archive)
            }
            Err(e) if self.cancel.is_cancelled() => {
                debug!(error = %e, "archive build cancelled");
                Err(GondorError::Interrupted)
            }
            Err(e) => Err(e),
        }
    }

    fn run_stages(
        &self,
        archive: &Archive,
        revision: &Revision,
        include_files: &[String],
        on_stage: &mut impl FnMut(ArchiveStage, bool),
    ) -> GondorResult<()> {
        self.cancel.check()?;
        on_stage(ArchiveStage::Snapshot, true);
        self.vcs.archive(revision, archive.tar_path())?;
        on_stage(ArchiveStage::Snapshot, false);

        if !include_files.is_empty() {
            self.cancel.check()?;
            on_stage(ArchiveStage::IncludeFiles, true);
            append_files(archive.tar_path(), self.vcs.root(), include_files)?;
            on_stage(ArchiveStage::IncludeFiles, false);
        }

        self.cancel.check()?;
        on_stage(ArchiveStage::Compress, true);
        compress(archive.tar_path(), archive.tarball_path(), &self.cancel)?;
        on_stage(ArchiveStage::Compress, false);
        Ok(())
    }
}

/// Append `files` (relative to `root`) to an existing tar archive.
pub fn append_files(tar_path: &Path, root: &Path, files: &[String]) -> GondorResult<()> {
    let end = end_of_entries(tar_path)?;

    let mut file = OpenOptions::new().read(true).write(true).open(tar_path)?;
    file.set_len(end)?;
    file.seek(SeekFrom::Start(end))?;

    let mut builder = tar::Builder::new(BufWriter::new(file));
    builder.follow_symlinks(false);
    for name in files {
        let source = root.join(name);
        let metadata = std::fs::symlink_metadata(&source).map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", source.display(), e))
        })?;
        debug!(file = %name, "adding untracked file");
        if metadata.is_dir() {
            builder.append_dir_all(name, &source)?;
        } else {
            builder.append_path_with_name(&source, name)?;
        }
    }
    builder.into_inner()?.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}

/// Offset just past the data of the last entry, where the end-of-archive
/// blocks begin.
fn end_of_entries(tar_path: &Path) -> GondorResult<u64> {
    let mut archive = tar::Archive::new(BufReader::new(File::open(tar_path)?));
    let mut end = 0;
    for entry in archive.entries()? {
        let entry = entry?;
        let data_end = entry.raw_file_position() + entry.header().entry_size()?;
        end = data_end.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    }
    Ok(end)
}

/// Gzip `tar_path` into `tarball_path` in a single streaming pass.
pub fn compress(tar_path: &Path, tarball_path: &Path, cancel: &CancelToken) -> GondorResult<()> {
    let mut input = CancellableReader::new(BufReader::new(File::open(tar_path)?), cancel.clone());
    let output = BufWriter::new(File::create(tarball_path)?);
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.into_inner().map_err(|e| e.into_error())?;
    Ok(())
}
