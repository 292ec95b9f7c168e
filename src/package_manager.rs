//! # Package Manager Detection
//!
//! Determines which package manager governs a package directory. The two
//! yarn generations are materially different downstream (install flags,
//! script disabling), so a nominal "yarn" result is disambiguated by
//! probing the installed yarn binary's version: 0.x/1.x is classic,
//! anything newer is berry.
//!
//! Detection is per sub-path, not per repository: different sub-paths of
//! one clone may use different managers.

use std::fmt;
use std::path::Path;
use std::process::Command;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The closed set of supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManagerKind {
    Npm,
    YarnClassic,
    YarnBerry,
    Pnpm,
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::YarnClassic => "yarn-classic",
            PackageManagerKind::YarnBerry => "yarn-berry",
            PackageManagerKind::Pnpm => "pnpm",
        };
        write!(f, "{}", name)
    }
}

/// Nominal detection result before yarn disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NominalKind {
    Npm,
    Yarn,
    Pnpm,
}

/// Trait for reading the installed yarn version - allows mocking in tests
pub trait YarnVersionProbe: Send + Sync {
    /// Run `yarn --version` with `dir` as the working directory and parse
    /// the reported version.
    fn yarn_version(&self, dir: &Path) -> Result<Version>;
}

/// Default probe invoking the real yarn binary.
pub struct DefaultYarnVersionProbe;

impl YarnVersionProbe for DefaultYarnVersionProbe {
    fn yarn_version(&self, dir: &Path) -> Result<Version> {
        let output = Command::new("yarn")
            .arg("--version")
            .current_dir(dir)
            .output()
            .map_err(|e| Error::PackageManagerDetection {
                path: dir.display().to_string(),
                message: format!("cannot run yarn --version: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::PackageManagerDetection {
                path: dir.display().to_string(),
                message: format!(
                    "yarn --version failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Version::parse(&raw).map_err(|e| Error::PackageManagerDetection {
            path: dir.display().to_string(),
            message: format!("unparseable yarn version {:?}: {}", raw, e),
        })
    }
}

/// Detect the effective package manager for a package directory, using
/// the real yarn binary for disambiguation.
pub fn detect(dir: &Path) -> Result<PackageManagerKind> {
    detect_with(dir, &DefaultYarnVersionProbe)
}

/// Detect the effective package manager with a custom yarn probe.
pub fn detect_with(dir: &Path, probe: &dyn YarnVersionProbe) -> Result<PackageManagerKind> {
    match nominal_kind(dir)? {
        NominalKind::Npm => Ok(PackageManagerKind::Npm),
        NominalKind::Pnpm => Ok(PackageManagerKind::Pnpm),
        NominalKind::Yarn => {
            let version = probe.yarn_version(dir)?;
            // yarn 0.x and 1.x share the classic flag set.
            let classic = VersionReq::parse("<2.0.0")?;
            if classic.matches(&version) {
                Ok(PackageManagerKind::YarnClassic)
            } else {
                Ok(PackageManagerKind::YarnBerry)
            }
        }
    }
}

/// Standard preference probe: the `packageManager` field of package.json
/// wins, then lockfiles, then npm as the fallback.
fn nominal_kind(dir: &Path) -> Result<NominalKind> {
    if let Some(kind) = from_package_json(dir)? {
        return Ok(kind);
    }

    if dir.join("pnpm-lock.yaml").exists() {
        return Ok(NominalKind::Pnpm);
    }
    if dir.join("yarn.lock").exists() {
        return Ok(NominalKind::Yarn);
    }

    // package-lock.json or nothing at all: npm.
    Ok(NominalKind::Npm)
}

/// Read the `packageManager` field (`"name@version"`) from package.json,
/// if present. Unknown manager names fall through to lockfile detection.
fn from_package_json(dir: &Path) -> Result<Option<NominalKind>> {
    let manifest = dir.join("package.json");
    if !manifest.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(&manifest)?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| Error::PackageManagerDetection {
            path: dir.display().to_string(),
            message: format!("invalid package.json: {}", e),
        })?;

    let Some(field) = value.get("packageManager").and_then(|v| v.as_str()) else {
        return Ok(None);
    };

    let name = field.split('@').next().unwrap_or(field);
    Ok(match name {
        "npm" => Some(NominalKind::Npm),
        "yarn" => Some(NominalKind::Yarn),
        "pnpm" => Some(NominalKind::Pnpm),
        _ => None,
    })
}
