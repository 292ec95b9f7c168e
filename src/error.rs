//! # Error Handling
//!
//! Centralized error type for the drift-tracker pipeline, built with
//! `thiserror`. Each variant corresponds to one failure domain of the
//! pipeline and carries enough context (repository URL, package path,
//! manager kind) to identify the failing entry in the final report.
//!
//! Per-entry failures in the concurrent provisioning and installation
//! phases are collected and reported together; the sequential persistence
//! phase propagates the first failure it hits.

use thiserror::Error;

/// Main error type for drift-tracker operations
#[derive(Error, Debug)]
pub enum Error {
    /// The tracked-repository configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    ConfigParse { message: String },

    /// A shallow clone failed. Tagged with the repository URL so that one
    /// failing workspace can be attributed without affecting siblings.
    #[error("Clone failed for {url}: {message}")]
    CloneFailed { url: String, message: String },

    /// The package manager for a directory could not be determined.
    #[error("Package manager detection failed for {path}: {message}")]
    PackageManagerDetection { path: String, message: String },

    /// A dependency install command exited non-zero or failed to spawn.
    #[error("Install failed for {path} ({manager}): {message}")]
    Install {
        path: String,
        manager: String,
        message: String,
    },

    /// The drift/pulse calculator failed for one package path.
    #[error("Drift calculation failed for {path}: {message}")]
    DriftCalculation { path: String, message: String },

    /// The merged-pull-request search failed. Fatal only to that entry's
    /// enrichment; the base summary is still persisted.
    #[error("Pull request enrichment failed for {repository}: {message}")]
    EnrichmentFetch { repository: String, message: String },

    /// Writing a history, last-run, or index file failed.
    #[error("Persistence error for {path}: {message}")]
    Persistence { path: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),

    /// An error indicating that a mutex has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
