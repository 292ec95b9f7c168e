//! # Drift/Pulse Calculation
//!
//! The per-dependency libyear metrics come from an external calculator.
//! This module defines the record shape and the `DriftCalculator` trait
//! boundary; the default implementation shells out to the `libyear` CLI
//! through `npx` in the package directory and parses its JSON output.
//!
//! Records are mostly opaque: only `drift` and `pulse` are interpreted
//! (both optional), every other field is carried through untouched into
//! the persisted last-run file.

use std::path::Path;
use std::process::Command;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::package_manager::PackageManagerKind;

/// One dependency's metrics as reported by the calculator.
///
/// `drift` and `pulse` are in libyears. Missing fields count as zero when
/// aggregating. Unrecognized fields (dependency name, versions, release
/// dates...) round-trip through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyMetricRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Trait for the drift/pulse calculator - allows mocking in tests
pub trait DriftCalculator: Send + Sync {
    /// Compute per-dependency records for the package at `dir`, covering
    /// all dependency groups.
    fn calculate(
        &self,
        dir: &Path,
        kind: PackageManagerKind,
    ) -> Result<Vec<DependencyMetricRecord>>;
}

/// Default calculator invoking the libyear CLI via npx.
pub struct LibyearCalculator;

impl DriftCalculator for LibyearCalculator {
    fn calculate(
        &self,
        dir: &Path,
        kind: PackageManagerKind,
    ) -> Result<Vec<DependencyMetricRecord>> {
        let manager_arg = match kind {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::YarnClassic => "yarn",
            PackageManagerKind::YarnBerry => "berry",
            PackageManagerKind::Pnpm => "pnpm",
        };

        debug!("calculating drift for {} ({})", dir.display(), kind);

        let output = Command::new("npx")
            .args([
                "--yes",
                "libyear",
                "--all",
                "--json",
                "--package-manager",
                manager_arg,
            ])
            .current_dir(dir)
            .output()
            .map_err(|e| Error::DriftCalculation {
                path: dir.display().to_string(),
                message: format!("cannot run libyear: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::DriftCalculation {
                path: dir.display().to_string(),
                message: format!(
                    "libyear exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| Error::DriftCalculation {
            path: dir.display().to_string(),
            message: format!("unparseable libyear output: {}", e),
        })
    }
}
