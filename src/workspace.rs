//! # Workspace Provisioning
//!
//! Creates one ephemeral shallow clone per distinct repository URL. All
//! entries sharing a URL share a workspace; clones fan out in parallel
//! with rayon, and a failure for one URL never cancels the clones already
//! in flight for the others (each URL is its own failure domain).
//!
//! ## Design
//!
//! Git access goes through the `GitOperations` trait so tests can record
//! clone calls and simulate failures without touching the network. The
//! default implementation shells out to the system `git` binary.
//!
//! Workspaces are fresh temp directories, never reused across runs, and
//! never deleted by the pipeline (the host's temp reaper owns their
//! lifetime). Deleting them eagerly would change crash-debugging
//! ergonomics, so the accumulation is deliberate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};
use rayon::prelude::*;

use crate::config::RepositoryEntry;
use crate::credentials;
use crate::error::{Error, Result};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Shallow-clone `url` into `target_dir` (fresh, empty directory).
    fn clone_shallow(&self, url: &str, target_dir: &Path) -> Result<()>;
}

/// The default implementation of `GitOperations`, backed by the system
/// `git` command.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_shallow(&self, url: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone_shallow(url, target_dir)
    }
}

/// Provisions one workspace per distinct repository URL.
pub struct WorkspaceProvisioner {
    git_ops: Box<dyn GitOperations>,
    vars: HashMap<String, String>,
}

impl WorkspaceProvisioner {
    /// Create a provisioner using the system git and the given credential
    /// variable mapping (conventionally the process environment).
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self {
            git_ops: Box::new(DefaultGitOperations),
            vars,
        }
    }

    /// Create a provisioner with custom git operations.
    ///
    /// This is primarily used for testing to inject mock operations.
    pub fn with_operations(git_ops: Box<dyn GitOperations>, vars: HashMap<String, String>) -> Self {
        Self { git_ops, vars }
    }

    /// Clone every distinct repository URL appearing in `entries` into a
    /// fresh temp directory, in parallel.
    ///
    /// Returns a map from the configured (unsubstituted) URL to its
    /// workspace root. Credential placeholders are expanded only for the
    /// clone itself so tokens never become part of a storage key.
    ///
    /// Clone errors are collected per URL; if any URL failed, the first
    /// error is returned after all sibling clones have finished.
    pub fn provision(&self, entries: &[RepositoryEntry]) -> Result<HashMap<String, PathBuf>> {
        let mut urls: Vec<&str> = Vec::new();
        for entry in entries {
            if !urls.contains(&entry.repository.as_str()) {
                urls.push(&entry.repository);
            }
        }

        info!("provisioning {} workspace(s)", urls.len());

        let workspaces: Mutex<HashMap<String, PathBuf>> = Mutex::new(HashMap::new());
        let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

        urls.par_iter().for_each(|url| {
            match self.provision_one(url) {
                Ok(dir) => {
                    debug!("cloned {} into {}", url, dir.display());
                    workspaces
                        .lock()
                        .expect("workspace map lock")
                        .insert(url.to_string(), dir);
                }
                Err(e) => {
                    errors.lock().expect("error list lock").push(e);
                }
            }
        });

        let collected_errors = errors.into_inner().map_err(|_| Error::LockPoisoned {
            context: "workspace provisioning errors".to_string(),
        })?;
        if let Some(first_error) = collected_errors.into_iter().next() {
            return Err(first_error);
        }

        workspaces.into_inner().map_err(|_| Error::LockPoisoned {
            context: "workspace map".to_string(),
        })
    }

    fn provision_one(&self, url: &str) -> Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix("drift-tracker-")
            .tempdir()
            .map_err(|e| Error::CloneFailed {
                url: url.to_string(),
                message: format!("cannot create workspace directory: {}", e),
            })?;

        let clone_url = credentials::substitute(url, &self.vars);
        // keep(): the workspace must outlive this call; cleanup is not
        // performed by the pipeline.
        let dir = dir.keep();
        self.git_ops.clone_shallow(&clone_url, &dir)?;
        Ok(dir)
    }
}
