//! Error types for the gondor client.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for gondor operations
pub type GondorResult<T> = Result<T, GondorError>;

/// Main error type for gondor operations
#[derive(Error, Debug)]
pub enum GondorError {
    /// Configuration file is missing, unreadable or invalid
    #[error("{0}")]
    Config(String),

    /// A marker directory (.gondor, .git, .hg) was not found above the start directory
    #[error("unable to find a {marker} directory above {start}")]
    MissingMarker { marker: String, start: PathBuf },

    /// Configured version control system is not supported
    #[error("'{0}' is not a valid version control system for Gondor")]
    UnsupportedVcs(String),

    /// A revision token does not map to any known revision
    #[error("could not map '{token}' to a SHA")]
    UnresolvableRevision { token: String },

    /// An external tool could not be started
    #[error("failed to run {program}: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive tool exited unsuccessfully; carries its raw output
    #[error("{output}")]
    ArchiveTool { output: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with an HTTP error status
    #[error("Received an error [{status}: {body}]")]
    Http { status: u16, body: String },

    /// Network-level failure before a well-formed response arrived
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered `status: error`
    #[error("{message}")]
    Api { message: String },

    /// The server answered with a body the client cannot understand
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    /// The user interrupted an upload
    #[error("upload cancelled by user")]
    Interrupted,

    /// Task status polling kept failing at the network layer
    #[error("gave up polling task status after {attempts} failed attempts: {last_error}")]
    PollRetriesExhausted { attempts: u32, last_error: String },
}

impl GondorError {
    /// Whether the error is a network-layer failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, GondorError::Transport(_))
    }
}

impl From<reqwest::Error> for GondorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GondorError::InvalidResponse(err.to_string())
        } else {
            GondorError::Transport(err.to_string())
        }
    }
}
