use crate::{AnnotError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolve a tool binary: explicit environment override, then `PATH`.
///
/// Falls back to the bare name so the failure surfaces when the tool is run.
pub fn locate_binary(name: &str, env_var: &str) -> PathBuf {
    if let Ok(path) = std::env::var(env_var) {
        return PathBuf::from(path);
    }
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Check that a binary can be found, without running it.
pub fn check_binary(binary: &Path, tool: &str) -> Result<()> {
    if binary.is_file() || which::which(binary).is_ok() {
        Ok(())
    } else {
        Err(AnnotError::external(
            tool,
            format!("binary {} not found", binary.display()),
        ))
    }
}

/// Run an external tool to completion, failing on a non-zero exit.
pub fn run_tool(cmd: &mut Command, tool: &str) -> Result<Output> {
    tracing::debug!("Running {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| AnnotError::external(tool, format!("failed to launch: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(AnnotError::external(
            tool,
            format!("exited with {}: {}", output.status, detail),
        ));
    }

    Ok(output)
}
