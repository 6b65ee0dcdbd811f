//! Subprocess runner shared by the version control backends.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{GondorError, GondorResult};

/// Environment variables that would redirect a child git process to another repository.
const GIT_ENV_OVERRIDES: [&str; 4] = ["GIT_DIR", "GIT_WORK_TREE", "GIT_INDEX_FILE", "GIT_COMMON_DIR"];

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Stdout followed by stderr, as a user would have seen it.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Run `program` with `args` in `cwd` and capture its output.
pub fn run_tool(program: &str, args: &[&str], cwd: &Path) -> GondorResult<ToolOutput> {
    debug!(program, ?args, cwd = %cwd.display(), "running tool");

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);
    if program == "git" {
        for key in GIT_ENV_OVERRIDES {
            cmd.env_remove(key);
        }
    }

    let output = cmd.output().map_err(|source| GondorError::ToolUnavailable {
        program: program.to_string(),
        source,
    })?;

    Ok(ToolOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_joins_streams() {
        let output = ToolOutput {
            success: false,
            stdout: "partial".into(),
            stderr: "abort: unknown revision\n".into(),
        };
        assert_eq!(output.combined(), "partial\nabort: unknown revision\n");
    }

    #[test]
    fn test_missing_program_is_reported() {
        let err = run_tool(
            "gondor-definitely-not-installed",
            &[],
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, GondorError::ToolUnavailable { .. }));
    }
}
