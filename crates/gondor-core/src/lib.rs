//! Gondor Core Library
//!
//! Domain logic of the Gondor deployment client: project configuration,
//! version control snapshots, archive assembly, the HTTP API and remote task
//! polling, plus the commands that tie them together.

pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod task;
pub mod transport;
pub mod types;
pub mod vcs;

pub use error::{GondorError, GondorResult};

/// Client version sent with every API request.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{AppSettings, Credentials, Project, ProjectConfig, ProjectStore};

    // Version control
    pub use crate::types::{Revision, VcsKind};
    pub use crate::vcs::VersionControl;

    // Archives
    pub use crate::archive::{Archive, ArchiveBuilder};

    // Transport
    pub use crate::transport::{ApiClient, ApiResponse, CancelToken, FormFields, RemoteApi};

    // Tasks
    pub use crate::task::{PollSettings, RetryPolicy, TaskKind, TaskOutcome};

    // Reporting
    pub use crate::report::{Reporter, StepMarker};

    pub use crate::error::{GondorError, GondorResult};
}
