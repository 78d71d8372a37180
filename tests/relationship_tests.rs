//! Relationship resolution against model files on disk

use std::fs;

use expmvc::config::ScaffoldConfig;
use expmvc::entity::{EntityDefinition, FieldSpec};
use expmvc::patch::ModelArtifact;
use expmvc::relationship::{RelationshipKind, RelationshipOptions, RelationshipResolver};
use expmvc::{ExpmvcError, ProjectLayout};
use tempfile::TempDir;

fn project() -> (TempDir, ProjectLayout) {
    let dir = tempfile::tempdir().unwrap();
    let layout = ProjectLayout::new(dir.path());
    (dir, layout)
}

fn write_model(layout: &ProjectLayout, name: &str, fields: &[&str]) {
    let args: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    let model = EntityDefinition::from_args(name, &args).unwrap().render_model();
    let path = layout.model_path(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, model).unwrap();
}

fn read_model(layout: &ProjectLayout, name: &str) -> String {
    fs::read_to_string(layout.model_path(name)).unwrap()
}

// =============================================================================
// Scaffold mode
// =============================================================================

#[test]
fn test_scaffold_has_many_end_to_end() {
    let (_dir, layout) = project();
    let scaffold = ScaffoldConfig::default();
    let resolver = RelationshipResolver::new(&layout, &scaffold);

    let outcome = resolver
        .scaffold_relationship("Author", "Post", RelationshipKind::HasMany)
        .unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.created, vec!["Post", "Author"]);

    let author = read_model(&layout, "Author");
    assert!(author.contains(
        "    posts: [{\n        type: mongoose.Schema.Types.ObjectId,\n        ref: 'Post',\n        default: []\n    }]"
    ));
    assert!(author.contains("AuthorSchema.virtual('postsDetails', {"));
    assert!(author.contains("AuthorSchema.set('toJSON', { virtuals: true });"));

    let post = read_model(&layout, "Post");
    let post_fields = ModelArtifact::parse(&post).unwrap().field_names();
    assert_eq!(post_fields, vec!["title", "content"]);

    let service = fs::read_to_string(layout.service_path("Author")).unwrap();
    assert!(service.contains("async addPost(authorId, postId)"));

    // same declaration again changes nothing
    let again = resolver
        .scaffold_relationship("Author", "Post", RelationshipKind::HasMany)
        .unwrap();
    assert!(again.is_noop());
    assert!(again.created.is_empty());
    assert_eq!(read_model(&layout, "Author"), author);
    assert_eq!(read_model(&layout, "Post"), post);
}

#[test]
fn test_scaffold_belongs_to_puts_key_on_child() {
    let (_dir, layout) = project();
    let scaffold = ScaffoldConfig {
        parent_fields: vec!["name".to_string()],
        child_fields: vec!["body".to_string()],
    };

    RelationshipResolver::new(&layout, &scaffold)
        .scaffold_relationship("User", "Comment", RelationshipKind::BelongsTo)
        .unwrap();

    let comment = ModelArtifact::parse(&read_model(&layout, "Comment")).unwrap();
    assert_eq!(comment.field_names(), vec!["body", "userId"]);
    assert_eq!(comment.virtual_names(), vec!["userDetails"]);

    let user = ModelArtifact::parse(&read_model(&layout, "User")).unwrap();
    assert_eq!(user.field_names(), vec!["name"]);

    // belongsTo gets a plain service, no child helpers
    let service = fs::read_to_string(layout.service_path("User")).unwrap();
    assert!(!service.contains("addComment"));
}

#[test]
fn test_scaffold_belongs_to_many_links_both_sides() {
    let (_dir, layout) = project();
    let scaffold = ScaffoldConfig::default();

    RelationshipResolver::new(&layout, &scaffold)
        .scaffold_relationship("Student", "Course", RelationshipKind::BelongsToMany)
        .unwrap();

    let student = ModelArtifact::parse(&read_model(&layout, "Student")).unwrap();
    let course = ModelArtifact::parse(&read_model(&layout, "Course")).unwrap();
    assert!(student.has_field("courses"));
    assert!(student.has_virtual("coursesDetails"));
    assert!(course.has_field("students"));
    assert!(course.has_virtual("studentsDetails"));
}

// =============================================================================
// Plain mode
// =============================================================================

#[test]
fn test_belongs_to_round_trip() {
    let (_dir, layout) = project();
    write_model(&layout, "Post", &["title"]);
    write_model(&layout, "User", &["email"]);

    let options = RelationshipOptions {
        field_name: Some("authorId".to_string()),
        required: true,
    };
    RelationshipResolver::new(&layout, &ScaffoldConfig::default())
        .relationship("Post", "User", RelationshipKind::BelongsTo, &options)
        .unwrap();

    let text = read_model(&layout, "Post");
    assert_eq!(text.matches("authorId:").count(), 1);
    assert!(text.contains(
        "    authorId: {\n        type: mongoose.Schema.Types.ObjectId,\n        ref: 'User',\n        required: true\n    }"
    ));

    let artifact = ModelArtifact::parse(&text).unwrap();
    let field: &FieldSpec = artifact.fields().find(|f| f.name == "authorId").unwrap();
    assert!(field.required);
    assert_eq!(field.reference.as_ref().unwrap().target, "User");
    assert!(text.contains("    localField: 'authorId',\n    foreignField: '_id',\n    justOne: true\n"));
}

#[test]
fn test_relationship_is_idempotent() {
    let (_dir, layout) = project();
    write_model(&layout, "Author", &["name"]);
    write_model(&layout, "Book", &["title"]);
    let scaffold = ScaffoldConfig::default();
    let resolver = RelationshipResolver::new(&layout, &scaffold);
    let options = RelationshipOptions::default();

    let first = resolver
        .relationship("Author", "Book", RelationshipKind::HasMany, &options)
        .unwrap();
    assert_eq!(first.added_fields, vec![("Author".to_string(), "books".to_string())]);
    let after_first = read_model(&layout, "Author");

    let second = resolver
        .relationship("Author", "Book", RelationshipKind::HasMany, &options)
        .unwrap();
    assert!(second.is_noop());
    assert_eq!(second.skipped.len(), 2);
    assert_eq!(read_model(&layout, "Author"), after_first);
    assert_eq!(after_first.matches("books:").count(), 1);
}

#[test]
fn test_missing_entity_aborts_without_writes() {
    let (_dir, layout) = project();
    write_model(&layout, "Author", &["name"]);
    let before = read_model(&layout, "Author");

    let err = RelationshipResolver::new(&layout, &ScaffoldConfig::default())
        .relationship("Author", "Autor", RelationshipKind::HasMany, &RelationshipOptions::default())
        .unwrap_err();

    match err {
        ExpmvcError::EntityNotFound { entity, suggestion, .. } => {
            assert_eq!(entity, "Autor");
            assert_eq!(suggestion.as_deref(), Some("author"));
        }
        other => panic!("Expected EntityNotFound, got {:?}", other),
    }
    assert_eq!(read_model(&layout, "Author"), before);
    assert!(!layout.model_path("Autor").exists());
}

#[test]
fn test_hand_edited_model_is_left_untouched() {
    let (_dir, layout) = project();
    write_model(&layout, "User", &["email"]);
    let hand_edited = include_str!("fixtures/hand_edited.model.js");
    fs::write(layout.model_path("Note"), hand_edited).unwrap();

    let err = RelationshipResolver::new(&layout, &ScaffoldConfig::default())
        .relationship("Note", "User", RelationshipKind::BelongsTo, &RelationshipOptions::default())
        .unwrap_err();

    assert!(matches!(err, ExpmvcError::PatchTargetNotFound { ref entity, .. } if entity == "Note"));
    assert_eq!(read_model(&layout, "Note"), hand_edited);
}

#[test]
fn test_dry_run_writes_nothing() {
    let (_dir, layout) = project();
    write_model(&layout, "Post", &["title"]);
    write_model(&layout, "User", &["email"]);
    let before = read_model(&layout, "Post");

    let outcome = RelationshipResolver::new(&layout, &ScaffoldConfig::default())
        .dry_run(true)
        .relationship("Post", "User", RelationshipKind::BelongsTo, &RelationshipOptions::default())
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.writes.len(), 1);
    let diff = outcome.writes[0].diff();
    assert!(diff.contains("+    user: {"));
    assert!(diff.contains("+PostSchema.virtual('userDetails', {"));
    assert_eq!(read_model(&layout, "Post"), before);
}
