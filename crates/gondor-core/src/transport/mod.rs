//! Talking to the Gondor API.
//!
//! Every endpoint takes form fields (or a multipart body when a file is
//! attached) and answers with a JSON envelope carrying `status`. Commands
//! depend on the [`RemoteApi`] trait so tests can substitute a scripted
//! server.

pub mod client;
pub mod form;
pub mod progress;
pub mod response;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

pub use client::{ApiClient, endpoint_url};
pub use form::FormFields;
pub use progress::{ArmedGuard, CancelToken, CancellableReader, ProgressReader, ProgressSink};
pub use response::{ApiResponse, ApiStatus};

use crate::error::GondorResult;

/// A file attached to a multipart request.
pub struct Upload {
    /// Multipart field name (`tarball`, `stdin`)
    pub field: String,
    pub path: PathBuf,
    /// File name announced to the server
    pub file_name: String,
    pub progress: Arc<dyn ProgressSink>,
    pub cancel: CancelToken,
}

impl Upload {
    pub fn new(
        field: impl Into<String>,
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
            file_name: file_name.into(),
            progress,
            cancel,
        }
    }

    /// Open the file behind a progress-reporting reader; returns its length too.
    pub fn open(&self) -> GondorResult<(ProgressReader<File>, u64)> {
        let file = File::open(&self.path)?;
        let length = file.metadata()?.len();
        let reader = ProgressReader::new(
            file,
            length,
            Arc::clone(&self.progress),
            self.cancel.clone(),
        );
        Ok((reader, length))
    }
}

/// Operations the client needs from the remote service.
pub trait RemoteApi: Send + Sync {
    /// POST url-encoded `fields` to `path` (relative to the endpoint).
    fn post_form(&self, path: &str, fields: &FormFields) -> GondorResult<ApiResponse>;

    /// POST a multipart body, streaming `upload` if given.
    ///
    /// Returns [`crate::GondorError::Interrupted`] when the upload's cancel
    /// token fired mid-transfer.
    fn post_multipart(
        &self,
        path: &str,
        fields: &FormFields,
        upload: Option<Upload>,
    ) -> GondorResult<ApiResponse>;

    /// GET an absolute URL and stream its body.
    fn download(&self, url: &str) -> GondorResult<Box<dyn Read + Send>>;
}
