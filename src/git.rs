//! # Git Operations
//!
//! Shallow cloning via the system `git` command, which automatically
//! handles SSH keys, credential helpers, and anything else configured in
//! `~/.gitconfig`. Only a single-commit-depth clone of the default branch
//! is needed; history is irrelevant to dependency drift.

use std::path::Path;
use std::process::Command;

use crate::error::Error;

/// Clone a repository at depth 1 into `target_dir`.
///
/// The target directory is expected to exist and be empty (the
/// provisioner hands out fresh temp directories).
pub fn clone_shallow(url: &str, target_dir: &Path) -> Result<(), Error> {
    let output = Command::new("git")
        .args(["clone", "--depth=1", url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::CloneFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Provide helpful error message for common auth failures
        let message = if stderr.contains("Authentication failed")
            || stderr.contains("Permission denied")
            || stderr.contains("could not read Username")
            || stderr.contains("Could not read from remote repository")
        {
            format!(
                "Authentication failed. Make sure you have access to the repository \
                and that any $VAR credential placeholders in its URL are set in the \
                environment.\nError: {}",
                stderr
            )
        } else {
            stderr.to_string()
        };

        return Err(Error::CloneFailed {
            url: url.to_string(),
            message,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shallow_bad_url_reports_url() {
        let dir = tempfile::tempdir().unwrap();
        let err = clone_shallow("file:///nonexistent/repo.git", &dir.path().join("ws"))
            .expect_err("clone of a nonexistent repository must fail");
        let display = format!("{}", err);
        assert!(display.contains("Clone failed"));
        assert!(display.contains("file:///nonexistent/repo.git"));
    }
}
