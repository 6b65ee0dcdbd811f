//! Configuration: the per-project `.gondor/config` and the per-user `~/.gondor`.

pub mod credentials;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use credentials::Credentials;
pub use parser::{parse_project_config, parse_project_config_str};
pub use paths::{PROJECT_DIR, find_nearest, relative_to};
pub use schema::{AppSettings, ConfigFile, DEFAULT_ENDPOINT, ProjectConfig};
pub use store::{Project, ProjectStore};
