//! Entity definitions
//!
//! Typed, in-memory description of a model: ordered fields with kinds,
//! optional references to other entities and their cardinality. Generation
//! renders an [`EntityDefinition`] into a fresh model artifact; the patcher
//! renders single [`FieldSpec`]s into existing ones.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExpmvcError, Result};

/// Primitive kind of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Date,
    Array,
    ObjectId,
}

impl FieldKind {
    /// Mongoose type expression for this kind
    pub fn mongoose_type(&self) -> &'static str {
        match self {
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Array => "Array",
            FieldKind::ObjectId => "mongoose.Schema.Types.ObjectId",
        }
    }

    /// Inverse of [`FieldKind::mongoose_type`], also accepting the short `Schema.Types.ObjectId`
    pub fn from_mongoose_type(expr: &str) -> Option<Self> {
        match expr {
            "String" => Some(FieldKind::String),
            "Number" => Some(FieldKind::Number),
            "Boolean" => Some(FieldKind::Boolean),
            "Date" => Some(FieldKind::Date),
            "Array" => Some(FieldKind::Array),
            e if e.ends_with("Types.ObjectId") || e == "ObjectId" => Some(FieldKind::ObjectId),
            _ => None,
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(FieldKind::String),
            "number" => Ok(FieldKind::Number),
            "boolean" | "bool" => Ok(FieldKind::Boolean),
            "date" => Ok(FieldKind::Date),
            "array" => Ok(FieldKind::Array),
            "objectid" | "id" | "ref" => Ok(FieldKind::ObjectId),
            other => Err(other.to_string()),
        }
    }
}

/// How many target entities a reference field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    One,
    Many,
}

/// Reference from a field to another entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub target: String,
    pub cardinality: Cardinality,
}

/// A single field of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// A plain scalar field
    pub fn scalar(name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            reference: None,
            required,
        }
    }

    /// A reference to one or many entities of `target`
    pub fn reference(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::ObjectId,
            reference: Some(Reference {
                target: target.into(),
                cardinality,
            }),
            required,
        }
    }

    /// Parse a command-line field argument.
    ///
    /// Accepted forms: `name`, `name:kind`, `name:objectid:Target`.
    pub fn parse_arg(arg: &str) -> Result<Self> {
        let mut parts = arg.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let kind_str = parts.next().map(str::trim).unwrap_or("string");
        let target = parts.next().map(str::trim).filter(|t| !t.is_empty());

        let kind = kind_str.parse::<FieldKind>().map_err(|kind| ExpmvcError::InvalidFieldKind {
            field: name.clone(),
            kind,
        })?;

        if name.is_empty() {
            return Err(ExpmvcError::InvalidFieldKind {
                field: arg.to_string(),
                kind: kind_str.to_string(),
            });
        }

        Ok(match (kind, target) {
            (FieldKind::ObjectId, Some(target)) => {
                FieldSpec::reference(name, target, Cardinality::One, true)
            }
            _ => FieldSpec::scalar(name, kind, true),
        })
    }

    pub fn is_many(&self) -> bool {
        matches!(
            self.reference,
            Some(Reference {
                cardinality: Cardinality::Many,
                ..
            })
        )
    }

    /// Render the field declaration as it appears inside `new mongoose.Schema({ ... })`
    pub fn render(&self) -> String {
        let name = &self.name;
        let ty = self.kind.mongoose_type();
        match &self.reference {
            Some(Reference {
                target,
                cardinality: Cardinality::Many,
            }) => format!(
                "    {name}: [{{\n        type: {ty},\n        ref: '{target}',\n        default: []\n    }}]"
            ),
            Some(Reference {
                target,
                cardinality: Cardinality::One,
            }) => {
                let tail = if self.required {
                    "required: true"
                } else {
                    "default: null"
                };
                format!("    {name}: {{\n        type: {ty},\n        ref: '{target}',\n        {tail}\n    }}")
            }
            None => {
                let mut lines = vec![format!("type: {ty}")];
                if self.kind == FieldKind::String {
                    lines.push("trim: true".to_string());
                }
                if self.required {
                    lines.push(format!("required: [true, '{name} is required']"));
                }
                format!("    {name}: {{\n        {}\n    }}", lines.join(",\n        "))
            }
        }
    }

    /// Best-effort recovery of a field from its rendered declaration.
    ///
    /// Leading comment lines are skipped. Returns `None` when the text holds
    /// no `name:` entry (e.g. a placeholder comment).
    pub fn parse_declaration(text: &str) -> Option<Self> {
        let body: String = text
            .lines()
            .map(str::trim_start)
            .filter(|l| !l.is_empty() && !l.starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let caps = field_head_re().captures(&body)?;
        let name = caps.get(1)?.as_str().trim_matches(|c| c == '\'' || c == '"').to_string();
        let value = body[caps.get(0)?.end()..].trim_start();
        let many = value.starts_with('[');

        let kind = type_re()
            .captures(value)
            .and_then(|c| FieldKind::from_mongoose_type(c.get(1)?.as_str()))
            // shorthand `tags: [String]` / `name: String`
            .or_else(|| {
                let bare = value.trim_start_matches('[');
                let ident: String = bare
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '.' || *c == '_')
                    .collect();
                FieldKind::from_mongoose_type(&ident)
            })
            .unwrap_or(FieldKind::String);

        let required = required_re().is_match(value);
        let reference = ref_re().captures(value).map(|c| Reference {
            target: c[1].to_string(),
            cardinality: if many { Cardinality::Many } else { Cardinality::One },
        });

        Some(Self {
            name,
            kind: if reference.is_some() { FieldKind::ObjectId } else { kind },
            reference,
            required,
        })
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            Some(r) if r.cardinality == Cardinality::Many => write!(f, "{}: [{}]", self.name, r.target),
            Some(r) => write!(f, "{}: {}", self.name, r.target),
            None => write!(f, "{}: {:?}", self.name, self.kind),
        }
    }
}

fn field_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*([A-Za-z_$][\w$]*|'[^']+'|"[^"]+")\s*:"#).unwrap())
}

fn type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btype\s*:\s*([\w.]+)").unwrap())
}

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bref\s*:\s*['"]([^'"]+)['"]"#).unwrap())
}

fn required_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\brequired\s*:\s*\[?\s*true").unwrap())
}

// =============================================================================
// Entity Definition
// =============================================================================

/// A named record type with uniquely named, ordered fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    name: String,
    fields: Vec<FieldSpec>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Build from command-line `name:kind` arguments
    pub fn from_args(name: impl Into<String>, args: &[String]) -> Result<Self> {
        let mut entity = Self::new(name);
        for arg in args {
            entity.add_field(FieldSpec::parse_arg(arg)?)?;
        }
        Ok(entity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Append a field; names must stay unique
    pub fn add_field(&mut self, field: FieldSpec) -> Result<()> {
        if self.has_field(&field.name) {
            return Err(ExpmvcError::DuplicateField {
                entity: self.name.clone(),
                field: field.name,
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Builder-style [`EntityDefinition::add_field`]
    pub fn with_field(mut self, field: FieldSpec) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    /// Variable name of the mongoose schema (`PostSchema`)
    pub fn schema_var(&self) -> String {
        format!("{}Schema", self.name)
    }

    /// Render a complete model artifact
    pub fn render_model(&self) -> String {
        let schema = self.schema_var();
        let lower = self.name.to_lowercase();
        let fields = if self.fields.is_empty() {
            "    // Add your fields here".to_string()
        } else {
            self.fields
                .iter()
                .map(FieldSpec::render)
                .collect::<Vec<_>>()
                .join(",\n\n")
        };

        let indexes: Vec<String> = self
            .fields
            .iter()
            .filter(|f| matches!(&f.reference, Some(r) if r.cardinality == Cardinality::One))
            .map(|f| format!("{schema}.index({{ {}: 1 }});\n", f.name))
            .collect();

        format!(
            "const mongoose = require('mongoose');

const {schema} = new mongoose.Schema({{
{fields}
}}, {{
    timestamps: true
}});

// Indexes
{indexes}{schema}.index({{ createdAt: -1 }});

// Methods
{schema}.methods.toJSON = function() {{
    const {lower} = this.toObject({{ virtuals: true }});
    {lower}.id = {lower}._id;
    delete {lower}._id;
    delete {lower}.__v;
    return {lower};
}};

module.exports = mongoose.model('{name}', {schema});
",
            indexes = indexes.concat(),
            name = self.name,
        )
    }
}
