//! Dependency Inventory
//!
//! Compares the packages a project's source actually requires against what
//! its `package.json` declares, and installs the difference.
//!
//! Nothing is cached: every scan re-walks the tree and re-reads each file.

pub mod extract;
pub mod install;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DependencyConfig;
use crate::error::{ExpmvcError, Result};
use crate::layout::ProjectLayout;

pub use extract::{RegexExtractor, RequirementExtractor};
pub use install::{partition_dev, NpmInstaller, PackageInstaller};

// =============================================================================
// Manifest
// =============================================================================

/// The two dependency tables of a `package.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ExpmvcError::ManifestUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ExpmvcError::ManifestUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Missing or malformed manifests count as declaring nothing
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{}, assuming no declared dependencies", e);
            Self::default()
        })
    }

    /// Regular and dev dependency names combined
    pub fn declared(&self) -> BTreeSet<String> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .cloned()
            .collect()
    }
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner {
    extensions: Vec<String>,
    excluded_dirs: Vec<String>,
    extractor: Box<dyn RequirementExtractor>,
}

impl Scanner {
    pub fn new(config: &DependencyConfig) -> Self {
        Self::with_extractor(config, Box::new(RegexExtractor))
    }

    pub fn with_extractor(config: &DependencyConfig, extractor: Box<dyn RequirementExtractor>) -> Self {
        Self {
            extensions: config.scan_extensions.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
            extractor,
        }
    }

    /// Whether a file's extension is one the scanner reads
    pub fn is_scannable(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x == e))
            .unwrap_or(false)
    }

    /// Every package required by scannable files under `root`
    pub fn required(&self, root: &Path) -> BTreeSet<String> {
        let excluded = &self.excluded_dirs;
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir()
                        && e.file_name().to_str().map(|n| excluded.iter().any(|x| x == n)).unwrap_or(false))
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && self.is_scannable(e.path()))
            .flat_map(|e| self.required_in_file(e.path()))
            .collect()
    }

    /// Packages required by a single file; unreadable files require nothing
    pub fn required_in_file(&self, path: &Path) -> BTreeSet<String> {
        match fs::read_to_string(path) {
            Ok(source) => {
                let found = self.extractor.extract(&source);
                debug!("{}: {:?}", path.display(), found);
                found
            }
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                BTreeSet::new()
            }
        }
    }

    /// Required-but-undeclared packages under `root`, against `manifest`
    pub fn scan(&self, root: &Path, manifest: &Manifest) -> BTreeSet<String> {
        missing(self.required(root), manifest)
    }

    /// Required-but-undeclared packages of one file
    pub fn scan_file(&self, path: &Path, manifest: &Manifest) -> BTreeSet<String> {
        missing(self.required_in_file(path), manifest)
    }
}

fn missing(required: BTreeSet<String>, manifest: &Manifest) -> BTreeSet<String> {
    let declared = manifest.declared();
    required.into_iter().filter(|p| !declared.contains(p)).collect()
}

// =============================================================================
// Check & install
// =============================================================================

/// Result of a dependency check
#[derive(Debug, Clone, Default)]
pub struct DependencyReport {
    pub scanned: PathBuf,
    pub missing: BTreeSet<String>,
    /// Packages handed to the installer (`missing` split by dev-only names)
    pub installed: Vec<String>,
    pub installed_dev: Vec<String>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Install `missing`, split into regular and dev dependencies.
///
/// Both groups are attempted; the first failure is returned.
pub fn install_missing(
    missing: &BTreeSet<String>,
    config: &DependencyConfig,
    installer: &dyn PackageInstaller,
) -> Result<(Vec<String>, Vec<String>)> {
    let (regular, dev) = partition_dev(missing.iter().cloned(), &config.dev_only);
    let mut outcome = Ok(());
    if !regular.is_empty() {
        info!("Installing {}", regular.join(", "));
        outcome = installer.install(&regular, false);
    }
    if !dev.is_empty() {
        info!("Installing dev {}", dev.join(", "));
        let dev_outcome = installer.install(&dev, true);
        outcome = outcome.and(dev_outcome);
    }
    outcome.map(|()| (regular, dev))
}

/// Scan the project at `layout` and install whatever is missing.
///
/// `path` narrows the scan to one file (watch mode); otherwise the whole
/// project is walked.
pub fn check_and_install(
    layout: &ProjectLayout,
    path: Option<&Path>,
    config: &DependencyConfig,
    installer: &dyn PackageInstaller,
) -> Result<DependencyReport> {
    let scanner = Scanner::new(config);
    let manifest = Manifest::load_or_empty(&layout.manifest_path());

    let (scanned, missing) = match path {
        Some(file) if !scanner.is_scannable(file) => (file.to_path_buf(), BTreeSet::new()),
        Some(file) => (file.to_path_buf(), scanner.scan_file(file, &manifest)),
        None => (layout.root().to_path_buf(), scanner.scan(layout.root(), &manifest)),
    };

    let mut report = DependencyReport {
        scanned,
        missing,
        ..Default::default()
    };
    if report.is_satisfied() {
        debug!("No missing dependencies in {}", report.scanned.display());
        return Ok(report);
    }

    let (regular, dev) = install_missing(&report.missing, config, installer)?;
    report.installed = regular;
    report.installed_dev = dev;
    Ok(report)
}

/// Outcome of checking one changed file in watch mode
#[derive(Debug)]
pub enum FileCheck {
    Satisfied,
    Installed(DependencyReport),
    /// The install failed; the error carries the manual command
    InstallFailed(ExpmvcError),
}

/// [`check_and_install`] for a single file, with install failures turned
/// into [`FileCheck::InstallFailed`] so a watch loop can report and move on.
pub fn check_changed_file(
    layout: &ProjectLayout,
    path: &Path,
    config: &DependencyConfig,
    installer: &dyn PackageInstaller,
) -> Result<FileCheck> {
    match check_and_install(layout, Some(path), config, installer) {
        Ok(report) if report.is_satisfied() => Ok(FileCheck::Satisfied),
        Ok(report) => Ok(FileCheck::Installed(report)),
        Err(e @ ExpmvcError::InstallFailure { .. }) => {
            warn!("Install for {} failed: {}", path.display(), e);
            Ok(FileCheck::InstallFailed(e))
        }
        Err(e) => Err(e),
    }
}
