//! # Dependency Installation
//!
//! Runs the manager-specific non-interactive install in a package
//! directory with lifecycle scripts disabled. npm, pnpm and yarn classic
//! take a direct flag; yarn berry has no such flag, so its plan first
//! flips the `enableScripts` configuration toggle and then installs.
//!
//! The install plan is data (a closed list of argument vectors per
//! manager kind) so the exact command lines are unit-testable without
//! spawning anything.

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};
use crate::package_manager::PackageManagerKind;

/// The commands run, in order, to install dependencies for one kind.
/// Each inner slice is one `argv` (program first).
pub fn install_plan(kind: PackageManagerKind) -> Vec<Vec<&'static str>> {
    match kind {
        PackageManagerKind::Npm => vec![vec![
            "npm",
            "install",
            "--ignore-scripts",
            "--no-audit",
            "--no-fund",
        ]],
        PackageManagerKind::YarnClassic => vec![vec![
            "yarn",
            "install",
            "--ignore-scripts",
            "--non-interactive",
        ]],
        PackageManagerKind::YarnBerry => vec![
            vec!["yarn", "config", "set", "enableScripts", "false"],
            vec!["yarn", "install"],
        ],
        PackageManagerKind::Pnpm => vec![vec!["pnpm", "install", "--ignore-scripts"]],
    }
}

/// Execute the install plan for `kind` with `dir` as the working
/// directory. A non-zero exit or spawn failure of any step is fatal for
/// this package path only.
pub fn install(dir: &Path, kind: PackageManagerKind) -> Result<()> {
    for argv in install_plan(kind) {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Install {
                path: dir.display().to_string(),
                manager: kind.to_string(),
                message: "empty install command".to_string(),
            })?;

        debug!("running {} in {}", argv.join(" "), dir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| Error::Install {
                path: dir.display().to_string(),
                manager: kind.to_string(),
                message: format!("cannot run {}: {}", argv.join(" "), e),
            })?;

        if !output.status.success() {
            return Err(Error::Install {
                path: dir.display().to_string(),
                manager: kind.to_string(),
                message: format!(
                    "{} exited with {}: {}",
                    argv.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }
    }

    Ok(())
}

/// Trait for dependency installation - allows mocking in tests
pub trait Installer: Send + Sync {
    fn install(&self, dir: &Path, kind: PackageManagerKind) -> Result<()>;
}

/// The default implementation, executing the real install plan.
pub struct DefaultInstaller;

impl Installer for DefaultInstaller {
    fn install(&self, dir: &Path, kind: PackageManagerKind) -> Result<()> {
        install(dir, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_npm_disables_scripts() {
        let plan = install_plan(PackageManagerKind::Npm);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0][0], "npm");
        assert!(plan[0].contains(&"--ignore-scripts"));
    }

    #[test]
    fn test_plan_yarn_classic_is_non_interactive() {
        let plan = install_plan(PackageManagerKind::YarnClassic);
        assert_eq!(plan.len(), 1);
        assert!(plan[0].contains(&"--ignore-scripts"));
        assert!(plan[0].contains(&"--non-interactive"));
    }

    #[test]
    fn test_plan_yarn_berry_uses_config_toggle() {
        // Berry has no --ignore-scripts flag; scripts are disabled through
        // the enableScripts config key before installing.
        let plan = install_plan(PackageManagerKind::YarnBerry);
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0],
            vec!["yarn", "config", "set", "enableScripts", "false"]
        );
        assert_eq!(plan[1], vec!["yarn", "install"]);
        assert!(!plan[1].contains(&"--ignore-scripts"));
    }

    #[test]
    fn test_plan_pnpm_disables_scripts() {
        let plan = install_plan(PackageManagerKind::Pnpm);
        assert_eq!(plan, vec![vec!["pnpm", "install", "--ignore-scripts"]]);
    }

    #[test]
    fn test_plans_have_no_empty_commands() {
        for kind in [
            PackageManagerKind::Npm,
            PackageManagerKind::YarnClassic,
            PackageManagerKind::YarnBerry,
            PackageManagerKind::Pnpm,
        ] {
            for argv in install_plan(kind) {
                assert!(!argv.is_empty());
            }
        }
    }
}
