//! expmvc
//!
//! Scaffolding for Express + Mongoose MVC projects.
//!
//! ## Features
//!
//! - **Generation**: project skeletons, models, controllers, routes, services,
//!   validations, views and full CRUD scaffolds
//! - **Relationships**: `belongsTo`, `hasMany` and `belongsToMany` declarations
//!   patched into existing models (field + populate virtual), idempotently
//! - **Dependency inventory**: required-but-undeclared npm packages found by
//!   scanning source, then installed
//! - **Watch**: per-file debounced scanning and installing while you edit
//!
//! ## Architecture
//!
//! ```text
//! generate ─┐
//!           ├─► layout, entity
//! relationship ─► patch ─► entity
//!
//! watch ─► deps::Scanner ─► deps::install
//! ```

pub mod config;
pub mod deps;
pub mod entity;
pub mod error;
pub mod generate;
pub mod layout;
pub mod patch;
pub mod relationship;
pub mod watch;

pub use config::ExpmvcConfig;
pub use deps::{check_and_install, DependencyReport, Manifest, NpmInstaller, PackageInstaller, Scanner};
pub use entity::{Cardinality, EntityDefinition, FieldKind, FieldSpec};
pub use error::{ExpmvcError, Result};
pub use generate::{Generator, GeneratorKind};
pub use layout::ProjectLayout;
pub use patch::{inject_field, inject_virtual, ModelArtifact, VirtualDecl};
pub use relationship::{RelationshipKind, RelationshipOptions, RelationshipOutcome, RelationshipResolver};
pub use watch::{ChangeKind, FileWatcher, WatchEvent, WatchHandle};
