//! High-level commands for gondor operations.
//!
//! Each command takes an options value and returns a report; output during
//! the run goes through the [`crate::report::Reporter`] of the
//! [`CommandContext`]. Frontends decide how reports are rendered and which
//! outcomes map to a failing exit status.

pub mod context;
pub mod create;
pub mod delete;
pub mod deploy;
pub mod init;
pub mod list;
pub mod manage;
pub mod run;
pub mod sqldump;

pub use context::CommandContext;
pub use create::{CreateCommand, CreateOptions, CreateReport};
pub use delete::{DeleteCommand, DeleteOptions};
pub use deploy::{DeployCommand, DeployOptions, DeployReport};
pub use init::{InitCommand, InitOptions, InitReport};
pub use list::{InstanceSummary, ListCommand};
pub use manage::{ManageCommand, ManageOptions, ManageReport};
pub use run::{
    CREATE_SUPERUSER, RunCommand, RunOptions, RunParams, RunReport, SuperuserParams,
    validate_email, validate_password, validate_username,
};
pub use sqldump::{SqldumpCommand, SqldumpOptions, SqldumpReport};
