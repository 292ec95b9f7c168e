//! # Dependency Drift Tracker Library
//!
//! This library tracks, over time, how far the dependencies of a set of
//! repositories have drifted from their latest available versions, and
//! correlates that drift with merged automated dependency-bump pull
//! requests.
//!
//! ## Quick Example
//!
//! ```
//! use drift_tracker::{config, name};
//!
//! let entries = config::parse("https://github.com/1024pix/pix.git#api\n");
//! assert_eq!(entries[0].path, "api");
//! assert_eq!(
//!     name::safe_name(&entries[0].line()),
//!     "github-com-1024pix-pix-git-api"
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the line-oriented tracked-repository
//!   list, one `url[#subPath]` entry per line.
//! - **Workspaces (`workspace`, `git`, `credentials`)**: one ephemeral
//!   shallow clone per distinct repository URL, shared by all sub-paths.
//! - **Package preparation (`package_manager`, `install`)**: per-sub-path
//!   manager detection (with yarn classic/berry disambiguation) and
//!   script-less dependency installation.
//! - **Metrics (`drift`, `summary`)**: per-dependency libyear records from
//!   the external calculator, folded into one dated totals record per run.
//! - **Enrichment (`bump`)**: yesterday's merged `[BUMP]` pull-request
//!   count from the GitHub search API.
//! - **Persistence (`store`, `name`)**: append-only per-entry history
//!   files, overwritten last-run files, and regenerated index files, all
//!   keyed by safe name.
//!
//! ## Execution Flow
//!
//! The `pipeline` module wires the stages together: parse → provision
//! (parallel, deduplicated) → detect/install (parallel per entry) →
//! calculate → aggregate → enrich → persist (sequential, in
//! configuration order) → reindex.

pub mod bump;
pub mod config;
pub mod credentials;
pub mod drift;
pub mod error;
pub mod git;
pub mod install;
pub mod name;
pub mod package_manager;
pub mod pipeline;
pub mod store;
pub mod summary;
pub mod workspace;
