//! Project layout conventions
//!
//! Every generator, the relationship resolver and the patcher agree on where an
//! artifact lives through [`ProjectLayout`]:
//!
//! ```text
//! <root>/
//! ├── package.json
//! ├── server.js
//! ├── config/
//! └── src/
//!     ├── models/        <name>.model.js
//!     ├── controllers/   <name>.controller.js
//!     ├── routes/        <name>.routes.js (+ index.js)
//!     ├── services/      <name>.service.js
//!     ├── validations/   <name>.validation.js
//!     └── views/         <name>.ejs
//! ```

use std::fs;
use std::path::{Path, PathBuf};

pub const MODELS_DIR: &str = "src/models";
pub const CONTROLLERS_DIR: &str = "src/controllers";
pub const ROUTES_DIR: &str = "src/routes";
pub const SERVICES_DIR: &str = "src/services";
pub const VALIDATIONS_DIR: &str = "src/validations";
pub const VIEWS_DIR: &str = "src/views";
pub const MANIFEST_FILE: &str = "package.json";

/// Kind of generated artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Model,
    Controller,
    Route,
    Service,
    Validation,
    View,
}

impl ArtifactKind {
    /// Project-relative directory holding this kind of artifact
    pub fn dir(&self) -> &'static str {
        match self {
            ArtifactKind::Model => MODELS_DIR,
            ArtifactKind::Controller => CONTROLLERS_DIR,
            ArtifactKind::Route => ROUTES_DIR,
            ArtifactKind::Service => SERVICES_DIR,
            ArtifactKind::Validation => VALIDATIONS_DIR,
            ArtifactKind::View => VIEWS_DIR,
        }
    }

    /// File name suffix appended to the lowercased entity name
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Model => ".model.js",
            ArtifactKind::Controller => ".controller.js",
            ArtifactKind::Route => ".routes.js",
            ArtifactKind::Service => ".service.js",
            ArtifactKind::Validation => ".validation.js",
            ArtifactKind::View => ".ejs",
        }
    }
}

/// Resolves artifact locations inside a generated project
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an entity's artifact of the given kind
    pub fn artifact_path(&self, kind: ArtifactKind, entity: &str) -> PathBuf {
        self.root
            .join(kind.dir())
            .join(format!("{}{}", entity.to_lowercase(), kind.suffix()))
    }

    pub fn model_path(&self, entity: &str) -> PathBuf {
        self.artifact_path(ArtifactKind::Model, entity)
    }

    pub fn service_path(&self, entity: &str) -> PathBuf {
        self.artifact_path(ArtifactKind::Service, entity)
    }

    pub fn routes_index_path(&self) -> PathBuf {
        self.root.join(ROUTES_DIR).join("index.js")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Lowercased names of every model artifact currently on disk, sorted
    pub fn existing_models(&self) -> Vec<String> {
        let dir = self.root.join(MODELS_DIR);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|f| f.strip_suffix(ArtifactKind::Model.suffix()))
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }
}

// =============================================================================
// Naming
// =============================================================================

/// English plural of a lowercase identifier, as used for route paths and
/// many-cardinality fields.
///
/// `s`, `x`, `z`, `ch`, `sh` take `es`; consonant + `y` becomes `ies`.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", word);
    }
    if let Some(stem) = word.strip_suffix('y').or_else(|| word.strip_suffix('Y')) {
        let before = stem.chars().last();
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u' | 'A' | 'E' | 'I' | 'O' | 'U')) {
            return format!("{}ies", stem);
        }
    }
    format!("{}s", word)
}

/// Name of the populate virtual for a reference field (`authorId` -> `authorDetails`)
pub fn details_name(field: &str) -> String {
    let base = match field.strip_suffix("Id") {
        Some(stem) if !stem.is_empty() => stem,
        _ => field,
    };
    format!("{}Details", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let layout = ProjectLayout::new("/tmp/app");
        assert_eq!(
            layout.model_path("BlogPost"),
            PathBuf::from("/tmp/app/src/models/blogpost.model.js")
        );
        assert_eq!(
            layout.artifact_path(ArtifactKind::View, "Post"),
            PathBuf::from("/tmp/app/src/views/post.ejs")
        );
        assert_eq!(layout.routes_index_path(), PathBuf::from("/tmp/app/src/routes/index.js"));
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("post"), "posts");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("status"), "statuses");
    }

    #[test]
    fn test_details_name() {
        assert_eq!(details_name("posts"), "postsDetails");
        assert_eq!(details_name("authorId"), "authorDetails");
        assert_eq!(details_name("Id"), "IdDetails");
    }

    #[test]
    fn test_existing_models() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        assert!(layout.existing_models().is_empty());

        fs::create_dir_all(dir.path().join(MODELS_DIR)).unwrap();
        fs::write(layout.model_path("User"), "").unwrap();
        fs::write(layout.model_path("Post"), "").unwrap();
        fs::write(dir.path().join(MODELS_DIR).join("README.md"), "").unwrap();

        assert_eq!(layout.existing_models(), vec!["post", "user"]);
    }
}
