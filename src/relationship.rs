//! Relationship Resolution
//!
//! Turns a relationship declaration (`Author hasMany Post`) into concrete
//! mutations of model artifacts. Two modes:
//!
//! - [`ResolveMode::Plain`]: both entities must already exist, otherwise
//!   [`ExpmvcError::EntityNotFound`].
//! - [`ResolveMode::Scaffold`]: missing entities are bootstrapped from the
//!   configured baseline fields (reported in [`RelationshipOutcome::created`]),
//!   and a service for the parent is generated when absent.
//!
//! Every change is planned in memory first. Files are written only once all
//! patches succeeded, in the order entity creation → field injection →
//! virtual injection. Existing fields and virtuals are detected by name and
//! skipped, so resolving the same declaration twice changes nothing.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use similar::TextDiff;
use tracing::{debug, info};

use crate::config::ScaffoldConfig;
use crate::entity::{Cardinality, EntityDefinition, FieldSpec};
use crate::error::{ExpmvcError, Result};
use crate::generate::templates;
use crate::layout::{details_name, pluralize, ProjectLayout};
use crate::patch::{ModelArtifact, VirtualDecl};

// =============================================================================
// Declaration
// =============================================================================

/// Kind of association between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    BelongsTo,
    HasMany,
    BelongsToMany,
}

impl RelationshipKind {
    /// Cardinality of the field stored on the declaring side
    pub fn cardinality(&self) -> Cardinality {
        match self {
            RelationshipKind::BelongsTo => Cardinality::One,
            RelationshipKind::HasMany | RelationshipKind::BelongsToMany => Cardinality::Many,
        }
    }
}

impl FromStr for RelationshipKind {
    type Err = ExpmvcError;

    /// Case-insensitive; `-` and `_` are ignored (`has-many`, `HAS_MANY`)
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "belongsto" => Ok(RelationshipKind::BelongsTo),
            "hasmany" => Ok(RelationshipKind::HasMany),
            "belongstomany" => Ok(RelationshipKind::BelongsToMany),
            _ => Err(ExpmvcError::InvalidRelationshipKind(s.to_string())),
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationshipKind::BelongsTo => "belongsTo",
            RelationshipKind::HasMany => "hasMany",
            RelationshipKind::BelongsToMany => "belongsToMany",
        };
        f.write_str(s)
    }
}

/// Per-declaration options
#[derive(Debug, Clone, Default)]
pub struct RelationshipOptions {
    /// Overrides the default field name on the declaring side
    pub field_name: Option<String>,
    /// Single references only; many-references always default to `[]`
    pub required: bool,
}

/// Whether missing entities are rejected or bootstrapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    Plain,
    Scaffold,
}

// =============================================================================
// Outcome
// =============================================================================

/// One artifact the resolver created or changed
#[derive(Debug, Clone)]
pub struct PlannedWrite {
    pub entity: String,
    pub path: PathBuf,
    /// `None` when the artifact is created by this resolution
    pub before: Option<String>,
    pub after: String,
}

impl PlannedWrite {
    pub fn is_creation(&self) -> bool {
        self.before.is_none()
    }

    /// Unified diff of the change, for dry-run previews
    pub fn diff(&self) -> String {
        let before = self.before.as_deref().unwrap_or("");
        let header = self.path.display().to_string();
        TextDiff::from_lines(before, self.after.as_str())
            .unified_diff()
            .context_radius(3)
            .header(&header, &header)
            .to_string()
    }
}

/// What a resolution did (or would do, when not applied)
#[derive(Debug, Clone, Default)]
pub struct RelationshipOutcome {
    /// Entities bootstrapped from baseline fields
    pub created: Vec<String>,
    /// `(entity, field)` pairs injected
    pub added_fields: Vec<(String, String)>,
    /// `(entity, virtual)` pairs injected
    pub added_virtuals: Vec<(String, String)>,
    /// Human-readable notes on work skipped because it already existed
    pub skipped: Vec<String>,
    /// Artifacts to write, in commit order
    pub writes: Vec<PlannedWrite>,
    /// Whether `writes` reached the disk
    pub applied: bool,
}

impl RelationshipOutcome {
    pub fn is_noop(&self) -> bool {
        self.writes.is_empty()
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// An artifact loaded (or synthesized) during planning
struct Document {
    entity: String,
    path: PathBuf,
    original: Option<String>,
    current: String,
}

/// Resolves relationship declarations against a project's model artifacts
pub struct RelationshipResolver<'a> {
    layout: &'a ProjectLayout,
    scaffold: &'a ScaffoldConfig,
    dry_run: bool,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(layout: &'a ProjectLayout, scaffold: &'a ScaffoldConfig) -> Self {
        Self {
            layout,
            scaffold,
            dry_run: false,
        }
    }

    /// Plan only; nothing is written
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// `relationship <kind> <from> <to>`: both entities must exist
    pub fn relationship(
        &self,
        source: &str,
        target: &str,
        kind: RelationshipKind,
        options: &RelationshipOptions,
    ) -> Result<RelationshipOutcome> {
        self.resolve(source, target, kind, options, ResolveMode::Plain)
    }

    /// `scaffold-relationship <parent> <child> <kind>`: missing entities are created
    pub fn scaffold_relationship(
        &self,
        parent: &str,
        child: &str,
        kind: RelationshipKind,
    ) -> Result<RelationshipOutcome> {
        self.resolve(parent, child, kind, &RelationshipOptions::default(), ResolveMode::Scaffold)
    }

    pub fn resolve(
        &self,
        source: &str,
        target: &str,
        kind: RelationshipKind,
        options: &RelationshipOptions,
        mode: ResolveMode,
    ) -> Result<RelationshipOutcome> {
        debug!(%source, %target, %kind, ?mode, "resolving relationship");
        let mut outcome = RelationshipOutcome::default();
        let mut docs: Vec<Document> = Vec::new();

        let parent_fields = &self.scaffold.parent_fields;
        let child_fields = &self.scaffold.child_fields;
        let (source_idx, target_idx) = match mode {
            ResolveMode::Plain => {
                let source_idx = self.load(source, mode, parent_fields, &mut docs, &mut outcome)?;
                let target_idx = self.load(target, mode, child_fields, &mut docs, &mut outcome)?;
                (source_idx, target_idx)
            }
            ResolveMode::Scaffold => {
                // Creation order: the child first, then the parent
                let target_idx = self.load(target, mode, child_fields, &mut docs, &mut outcome)?;
                let source_idx = self.load(source, mode, parent_fields, &mut docs, &mut outcome)?;
                (source_idx, target_idx)
            }
        };

        match (mode, kind) {
            (ResolveMode::Scaffold, RelationshipKind::BelongsTo) => {
                // The child carries the foreign key
                let field = options
                    .field_name
                    .clone()
                    .unwrap_or_else(|| format!("{}Id", source.to_lowercase()));
                let spec = FieldSpec::reference(field, source, Cardinality::One, true);
                self.link(&mut docs[target_idx], &spec, &mut outcome)?;
            }
            (ResolveMode::Scaffold, RelationshipKind::BelongsToMany) => {
                let field = options
                    .field_name
                    .clone()
                    .unwrap_or_else(|| pluralize(&target.to_lowercase()));
                let spec = FieldSpec::reference(field, target, Cardinality::Many, false);
                self.link(&mut docs[source_idx], &spec, &mut outcome)?;

                let back = FieldSpec::reference(pluralize(&source.to_lowercase()), source, Cardinality::Many, false);
                self.link(&mut docs[target_idx], &back, &mut outcome)?;
            }
            _ => {
                let spec = self.source_field(target, kind, options);
                self.link(&mut docs[source_idx], &spec, &mut outcome)?;
            }
        }

        if mode == ResolveMode::Scaffold {
            self.plan_parent_service(source, target, kind, &mut docs, &mut outcome);
        }

        outcome.writes = docs
            .into_iter()
            .filter(|d| d.original.as_deref() != Some(d.current.as_str()))
            .map(|d| PlannedWrite {
                entity: d.entity,
                path: d.path,
                before: d.original,
                after: d.current,
            })
            .collect();

        if !self.dry_run {
            commit(&outcome.writes)?;
            outcome.applied = true;
        }

        Ok(outcome)
    }

    /// Field stored on the declaring entity for plain declarations
    fn source_field(&self, target: &str, kind: RelationshipKind, options: &RelationshipOptions) -> FieldSpec {
        let cardinality = kind.cardinality();
        let default_name = match cardinality {
            Cardinality::One => target.to_lowercase(),
            Cardinality::Many => pluralize(&target.to_lowercase()),
        };
        let name = options.field_name.clone().unwrap_or(default_name);
        let required = options.required && cardinality == Cardinality::One;
        FieldSpec::reference(name, target, cardinality, required)
    }

    /// Load an entity's model, bootstrapping it in scaffold mode
    fn load(
        &self,
        entity: &str,
        mode: ResolveMode,
        baseline: &[String],
        docs: &mut Vec<Document>,
        outcome: &mut RelationshipOutcome,
    ) -> Result<usize> {
        let path = self.layout.model_path(entity);
        if let Some(idx) = docs.iter().position(|d| d.path == path) {
            return Ok(idx);
        }

        let doc = if path.exists() {
            let text = fs::read_to_string(&path)?;
            Document {
                entity: entity.to_string(),
                path,
                original: Some(text.clone()),
                current: text,
            }
        } else if mode == ResolveMode::Scaffold {
            info!(%entity, "bootstrapping entity with baseline fields");
            let definition = EntityDefinition::from_args(entity, baseline)?;
            outcome.created.push(entity.to_string());
            Document {
                entity: entity.to_string(),
                path,
                original: None,
                current: definition.render_model(),
            }
        } else {
            return Err(ExpmvcError::EntityNotFound {
                entity: entity.to_string(),
                suggestion: suggest_entity(self.layout, entity),
                path,
            });
        };

        docs.push(doc);
        Ok(docs.len() - 1)
    }

    /// Inject `field` and its populate virtual into `doc`, skipping what exists
    fn link(&self, doc: &mut Document, field: &FieldSpec, outcome: &mut RelationshipOutcome) -> Result<()> {
        let mut artifact = ModelArtifact::parse(&doc.current).map_err(|e| patch_error(e, doc))?;

        if artifact.has_field(&field.name) {
            debug!(entity = %doc.entity, field = %field.name, "field already present");
            outcome
                .skipped
                .push(format!("{}.{} already exists", doc.entity, field.name));
        } else {
            artifact.push_field(field);
            outcome.added_fields.push((doc.entity.clone(), field.name.clone()));
        }

        let Some(reference) = &field.reference else {
            doc.current = artifact.render();
            return Ok(());
        };

        let virtual_decl = VirtualDecl {
            schema_var: artifact
                .schema_var()
                .unwrap_or_else(|| format!("{}Schema", doc.entity)),
            name: details_name(&field.name),
            target: reference.target.clone(),
            local_field: field.name.clone(),
            just_one: reference.cardinality == Cardinality::One,
        };

        if artifact.has_virtual(&virtual_decl.name) {
            outcome
                .skipped
                .push(format!("{}.{} virtual already exists", doc.entity, virtual_decl.name));
        } else {
            artifact
                .push_virtual(&virtual_decl)
                .map_err(|e| patch_error(e, doc))?;
            outcome
                .added_virtuals
                .push((doc.entity.clone(), virtual_decl.name.clone()));
        }

        doc.current = artifact.render();
        Ok(())
    }

    fn plan_parent_service(
        &self,
        parent: &str,
        child: &str,
        kind: RelationshipKind,
        docs: &mut Vec<Document>,
        outcome: &mut RelationshipOutcome,
    ) {
        let path = self.layout.service_path(parent);
        if path.exists() {
            outcome.skipped.push(format!("{} service already exists", parent));
            return;
        }
        let relation = (kind == RelationshipKind::HasMany).then_some(child);
        docs.push(Document {
            entity: parent.to_string(),
            path,
            original: None,
            current: templates::service(parent, relation),
        });
    }
}

/// Write planned artifacts in order, creating parent directories
fn commit(writes: &[PlannedWrite]) -> Result<()> {
    for write in writes {
        if let Some(dir) = write.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&write.path, &write.after)?;
        info!(path = %write.path.display(), created = write.is_creation(), "wrote artifact");
    }
    Ok(())
}

fn patch_error(err: ExpmvcError, doc: &Document) -> ExpmvcError {
    match err {
        ExpmvcError::MarkerNotFound { marker } => ExpmvcError::PatchTargetNotFound {
            entity: doc.entity.clone(),
            path: doc.path.clone(),
            marker,
        },
        other => other,
    }
}

/// Closest existing model name, for "did you mean" hints
pub fn suggest_entity(layout: &ProjectLayout, entity: &str) -> Option<String> {
    let matcher = SkimMatcherV2::default();
    let query = entity.to_lowercase();
    layout
        .existing_models()
        .into_iter()
        .filter_map(|name| {
            let score = matcher
                .fuzzy_match(&name, &query)
                .or_else(|| matcher.fuzzy_match(&query, &name))?;
            Some((score, name))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("hasMany".parse::<RelationshipKind>().unwrap(), RelationshipKind::HasMany);
        assert_eq!("belongs-to".parse::<RelationshipKind>().unwrap(), RelationshipKind::BelongsTo);
        assert_eq!(
            "BELONGS_TO_MANY".parse::<RelationshipKind>().unwrap(),
            RelationshipKind::BelongsToMany
        );
        assert!(matches!(
            "hasOne".parse::<RelationshipKind>(),
            Err(ExpmvcError::InvalidRelationshipKind(_))
        ));
    }

    #[test]
    fn test_kind_display_round_trips() {
        for kind in [
            RelationshipKind::BelongsTo,
            RelationshipKind::HasMany,
            RelationshipKind::BelongsToMany,
        ] {
            assert_eq!(kind.to_string().parse::<RelationshipKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_default_source_field() {
        let layout = ProjectLayout::new("/nonexistent");
        let scaffold = ScaffoldConfig::default();
        let resolver = RelationshipResolver::new(&layout, &scaffold);

        let opts = RelationshipOptions {
            required: true,
            ..Default::default()
        };
        let one = resolver.source_field("User", RelationshipKind::BelongsTo, &opts);
        assert_eq!(one.name, "user");
        assert!(one.required);

        let many = resolver.source_field("Category", RelationshipKind::BelongsToMany, &opts);
        assert_eq!(many.name, "categories");
        assert!(many.is_many());
        assert!(!many.required);
    }

    #[test]
    fn test_suggest_entity() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        fs::create_dir_all(dir.path().join("src/models")).unwrap();
        fs::write(layout.model_path("Author"), "").unwrap();
        fs::write(layout.model_path("Comment"), "").unwrap();

        assert_eq!(suggest_entity(&layout, "Autor").as_deref(), Some("author"));
        assert_eq!(suggest_entity(&layout, "Zebra"), None);
    }
}
