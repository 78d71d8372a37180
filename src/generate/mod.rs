//! Artifact Generation
//!
//! Single artifacts (`generate model Post title:string`) and full CRUD
//! scaffolds. Generators never overwrite an existing artifact unless forced;
//! a scaffold skips the pieces that already exist.

pub mod project;
pub mod routes;
pub mod templates;

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::entity::EntityDefinition;
use crate::error::{ExpmvcError, Result};
use crate::layout::{ArtifactKind, ProjectLayout};

pub use project::create_project;
pub use routes::{register_route, Registration};

// =============================================================================
// Kinds
// =============================================================================

/// What a `generate` invocation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Model,
    Controller,
    Route,
    Service,
    Validation,
    View,
    Scaffold,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 7] = [
        GeneratorKind::Model,
        GeneratorKind::Controller,
        GeneratorKind::Route,
        GeneratorKind::Service,
        GeneratorKind::Validation,
        GeneratorKind::View,
        GeneratorKind::Scaffold,
    ];

    /// Artifact written by a single-file generator; `None` for scaffold
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            GeneratorKind::Model => Some(ArtifactKind::Model),
            GeneratorKind::Controller => Some(ArtifactKind::Controller),
            GeneratorKind::Route => Some(ArtifactKind::Route),
            GeneratorKind::Service => Some(ArtifactKind::Service),
            GeneratorKind::Validation => Some(ArtifactKind::Validation),
            GeneratorKind::View => Some(ArtifactKind::View),
            GeneratorKind::Scaffold => None,
        }
    }
}

impl FromStr for GeneratorKind {
    type Err = ExpmvcError;

    fn from_str(s: &str) -> Result<Self> {
        GeneratorKind::ALL
            .into_iter()
            .find(|k| k.to_string() == s.to_lowercase())
            .ok_or_else(|| ExpmvcError::UnknownGenerator(s.to_string()))
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeneratorKind::Model => "model",
            GeneratorKind::Controller => "controller",
            GeneratorKind::Route => "route",
            GeneratorKind::Service => "service",
            GeneratorKind::Validation => "validation",
            GeneratorKind::View => "view",
            GeneratorKind::Scaffold => "scaffold",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Generator
// =============================================================================

/// What happened to one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Created,
    Overwritten,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub status: WriteStatus,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub files: Vec<GeneratedFile>,
    /// Set when a scaffold touched the routes index
    pub route_registration: Option<Registration>,
}

impl GenerationReport {
    pub fn written(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.files.iter().filter(|f| f.status != WriteStatus::Skipped)
    }
}

pub struct Generator<'a> {
    layout: &'a ProjectLayout,
    force: bool,
}

impl<'a> Generator<'a> {
    pub fn new(layout: &'a ProjectLayout) -> Self {
        Self { layout, force: false }
    }

    /// Overwrite existing artifacts instead of refusing or skipping
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn generate(&self, kind: GeneratorKind, name: &str, fields: &[String]) -> Result<GenerationReport> {
        let entity = EntityDefinition::from_args(name, fields)?;
        let mut report = GenerationReport::default();

        match kind.artifact() {
            Some(artifact) => {
                let file = self.write(artifact, &entity, false)?;
                report.files.push(file);
            }
            None => {
                // model first so the rest of the stack has something to require
                for artifact in [
                    ArtifactKind::Model,
                    ArtifactKind::Service,
                    ArtifactKind::Controller,
                    ArtifactKind::Route,
                    ArtifactKind::Validation,
                ] {
                    report.files.push(self.write(artifact, &entity, true)?);
                }
                report.route_registration =
                    Some(register_route(&self.layout.routes_index_path(), entity.name())?);
            }
        }

        Ok(report)
    }

    fn write(&self, kind: ArtifactKind, entity: &EntityDefinition, skip_existing: bool) -> Result<GeneratedFile> {
        let path = self.layout.artifact_path(kind, entity.name());
        let exists = path.exists();

        if exists && !self.force {
            if !skip_existing {
                return Err(ExpmvcError::AlreadyExists(path));
            }
            warn!("{} already exists, skipping", path.display());
            return Ok(GeneratedFile { kind, path, status: WriteStatus::Skipped });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render(kind, entity))?;
        info!("Wrote {}", path.display());

        let status = if exists { WriteStatus::Overwritten } else { WriteStatus::Created };
        Ok(GeneratedFile { kind, path, status })
    }
}

/// Content of one artifact for an entity
pub fn render(kind: ArtifactKind, entity: &EntityDefinition) -> String {
    match kind {
        ArtifactKind::Model => entity.render_model(),
        ArtifactKind::Controller => templates::controller(entity.name()),
        ArtifactKind::Route => templates::route(entity.name()),
        ArtifactKind::Service => templates::service(entity.name(), None),
        ArtifactKind::Validation => templates::validation(entity),
        ArtifactKind::View => templates::view(entity.name()),
    }
}
