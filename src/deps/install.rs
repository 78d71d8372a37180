//! Package installation through the project's package manager

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{info, warn};

use crate::error::{ExpmvcError, Result};

/// Installs packages into a project.
///
/// Dev/regular partitioning is the caller's job, see [`partition_dev`].
pub trait PackageInstaller {
    /// Install `packages`, recording them as dev dependencies when `dev` is set.
    /// An empty list installs everything the manifest already declares.
    fn install(&self, packages: &[String], dev: bool) -> Result<()>;

    /// Run a manifest script (`start` runs `<pm> start`, others `<pm> run <name>`)
    fn run_script(&self, script: &str) -> Result<()>;
}

/// Shells out to npm (or a compatible CLI) with inherited stdio
#[derive(Debug, Clone)]
pub struct NpmInstaller {
    program: String,
    root: PathBuf,
}

impl NpmInstaller {
    pub fn new(program: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Arguments for an install invocation
    pub fn install_args(packages: &[String], dev: bool) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if !packages.is_empty() {
            args.push(if dev { "--save-dev" } else { "--save" }.to_string());
            args.extend(packages.iter().cloned());
        }
        args
    }

    fn run(&self, args: &[String]) -> Result<()> {
        let command = format!("{} {}", self.program, args.join(" "));
        info!("Running: {} (in {})", command, self.root.display());

        let status = Command::new(&self.program)
            .args(args)
            .current_dir(&self.root)
            .status()
            .map_err(|e| ExpmvcError::InstallFailure {
                command: command.clone(),
                status: e.to_string(),
            })?;

        check_status(status, command)
    }
}

fn check_status(status: ExitStatus, command: String) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    warn!("'{}' exited with {}", command, status);
    Err(ExpmvcError::InstallFailure {
        command,
        status: status.to_string(),
    })
}

impl PackageInstaller for NpmInstaller {
    fn install(&self, packages: &[String], dev: bool) -> Result<()> {
        self.run(&Self::install_args(packages, dev))
    }

    fn run_script(&self, script: &str) -> Result<()> {
        let args: Vec<String> = match script {
            "start" | "test" => vec![script.to_string()],
            _ => vec!["run".to_string(), script.to_string()],
        };
        self.run(&args)
    }
}

/// Split packages into `(regular, dev)` using the configured dev-only names
pub fn partition_dev(packages: impl IntoIterator<Item = String>, dev_only: &[String]) -> (Vec<String>, Vec<String>) {
    packages.into_iter().partition(|p| !dev_only.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args() {
        let pkgs = vec!["express".to_string(), "joi".to_string()];
        assert_eq!(NpmInstaller::install_args(&pkgs, false), vec!["install", "--save", "express", "joi"]);
        assert_eq!(
            NpmInstaller::install_args(&["nodemon".to_string()], true),
            vec!["install", "--save-dev", "nodemon"]
        );
        assert_eq!(NpmInstaller::install_args(&[], false), vec!["install"]);
    }

    #[test]
    fn test_partition_dev() {
        let (regular, dev) = partition_dev(
            ["express", "nodemon", "joi"].map(String::from),
            &["nodemon".to_string()],
        );
        assert_eq!(regular, vec!["express", "joi"]);
        assert_eq!(dev, vec!["nodemon"]);
    }

    #[test]
    fn test_missing_program_reports_manual_command() {
        let dir = tempfile::tempdir().unwrap();
        let installer = NpmInstaller::new("expmvc-no-such-package-manager", dir.path());
        let err = installer.install(&["left-pad".to_string()], false).unwrap_err();
        match err {
            ExpmvcError::InstallFailure { command, .. } => {
                assert_eq!(command, "expmvc-no-such-package-manager install --save left-pad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
