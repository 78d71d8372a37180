//! Model Artifact Patching
//!
//! A generated model file is parsed into a [`ModelArtifact`]:
//!
//! ```text
//! head     const mongoose = ...;\n\nconst PostSchema = new mongoose.Schema({
//! entries  \n    title: {...}  |  \n\n    content: {...}      (split on top-level commas)
//! trailer  \n}, {\n    timestamps: true\n});\n ... module.exports = ...
//! ```
//!
//! Each entry keeps its raw text, so `render()` reproduces the input byte for
//! byte. Injections only append an entry or splice into the trailer; nothing
//! else is touched. The patcher never deduplicates; callers check
//! [`ModelArtifact::field_names`] / [`ModelArtifact::virtual_names`] first.

use std::sync::OnceLock;

use regex::Regex;

use crate::entity::FieldSpec;
use crate::error::{ExpmvcError, Result};

/// Opening of the primary field block
pub const SCHEMA_OPEN_MARKER: &str = "mongoose.Schema({";
/// End of field declarations, start of the options block
pub const FIELDS_END_MARKER: &str = "}, {";
/// Comment introducing the virtuals region
pub const VIRTUALS_MARKER: &str = "// Virtuals";
/// Export statement that closes every model artifact
pub const EXPORT_MARKER: &str = "module.exports";

/// A populate virtual (`PostSchema.virtual('authorDetails', {...})`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDecl {
    /// Schema variable the virtual is declared on (`PostSchema`)
    pub schema_var: String,
    pub name: String,
    pub target: String,
    pub local_field: String,
    pub just_one: bool,
}

impl VirtualDecl {
    pub fn render(&self) -> String {
        let just_one = if self.just_one { ",\n    justOne: true" } else { "" };
        format!(
            "{}.virtual('{}', {{\n    ref: '{}',\n    localField: '{}',\n    foreignField: '_id'{}\n}});",
            self.schema_var, self.name, self.target, self.local_field, just_one
        )
    }
}

/// One top-level entry of the field block, raw text plus what could be parsed from it
#[derive(Debug, Clone)]
struct FieldEntry {
    raw: String,
    field: Option<FieldSpec>,
}

/// Structured view of a generated model artifact
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    head: String,
    entries: Vec<FieldEntry>,
    trailer: String,
}

impl ModelArtifact {
    /// Split artifact text around its field block.
    ///
    /// Fails with [`ExpmvcError::MarkerNotFound`] when the schema opening is
    /// missing or its closing brace is not followed by the options object.
    pub fn parse(text: &str) -> Result<Self> {
        let open = text
            .find(SCHEMA_OPEN_MARKER)
            .ok_or_else(|| marker_missing(SCHEMA_OPEN_MARKER))?
            + SCHEMA_OPEN_MARKER.len();

        // The field block ends at the brace closing `Schema({`, which must open the options
        let fields_end = closing_brace(&text[open..])
            .map(|i| i + open)
            .filter(|&i| text[i..].starts_with(FIELDS_END_MARKER))
            .ok_or_else(|| marker_missing(FIELDS_END_MARKER))?;

        // The block ends at the line break preceding the marker
        let block_end = text[open..fields_end]
            .rfind('\n')
            .map(|i| i + open)
            .unwrap_or(fields_end);

        let entries = split_top_level(&text[open..block_end])
            .into_iter()
            .map(|raw| FieldEntry {
                field: FieldSpec::parse_declaration(&raw),
                raw,
            })
            .collect();

        Ok(Self {
            head: text[..open].to_string(),
            entries,
            trailer: text[block_end..].to_string(),
        })
    }

    pub fn render(&self) -> String {
        let body = self
            .entries
            .iter()
            .map(|e| e.raw.as_str())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}{}{}", self.head, body, self.trailer)
    }

    /// Fields recovered from the block, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.entries.iter().filter_map(|e| e.field.as_ref())
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields().map(|f| f.name.clone()).collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields().any(|f| f.name == name)
    }

    /// Names of `<Schema>.virtual('<name>', ...)` declarations in the trailer
    pub fn virtual_names(&self) -> Vec<String> {
        virtual_re()
            .captures_iter(&self.trailer)
            .map(|c| c[1].to_string())
            .collect()
    }

    pub fn has_virtual(&self, name: &str) -> bool {
        self.virtual_names().iter().any(|v| v == name)
    }

    /// Schema variable name declared in the head (`PostSchema`), if recognizable
    pub fn schema_var(&self) -> Option<String> {
        schema_var_re()
            .captures(&self.head)
            .map(|c| c[1].to_string())
    }

    /// Append a field declaration after the last entry
    pub fn push_field(&mut self, field: &FieldSpec) {
        let decl = field.render();
        match self.entries.iter().rposition(|e| e.field.is_some()) {
            Some(last) => {
                // A trailing comma leaves a blank entry behind the last field
                self.entries.insert(
                    last + 1,
                    FieldEntry {
                        raw: format!("\n\n{}", decl),
                        field: Some(field.clone()),
                    },
                );
            }
            None => {
                // Only comments or whitespace: keep them, add the field below
                let mut raw = self.entries.iter().map(|e| e.raw.as_str()).collect::<Vec<_>>().join(",");
                raw.push('\n');
                raw.push_str(&decl);
                self.entries = vec![FieldEntry {
                    raw,
                    field: Some(field.clone()),
                }];
            }
        }
    }

    /// Insert a virtual after the `// Virtuals` marker line, or open a new
    /// virtuals region before the final export statement.
    pub fn push_virtual(&mut self, virtual_decl: &VirtualDecl) -> Result<()> {
        let rendered = virtual_decl.render();

        if let Some(marker) = self.trailer.find(VIRTUALS_MARKER) {
            let insert_at = self.trailer[marker..]
                .find('\n')
                .map(|i| marker + i + 1)
                .unwrap_or(self.trailer.len());
            self.trailer.insert_str(insert_at, &format!("{}\n\n", rendered));
            return Ok(());
        }

        let export = self
            .trailer
            .rfind(&format!("\n{}", EXPORT_MARKER))
            .ok_or_else(|| marker_missing(EXPORT_MARKER))?;

        let schema = &virtual_decl.schema_var;
        let mut region = format!("\n{}\n{}\n", VIRTUALS_MARKER, rendered);
        if !self.trailer.contains(&format!("{}.set('toJSON'", schema)) {
            region.push_str(&format!(
                "\n{schema}.set('toJSON', {{ virtuals: true }});\n{schema}.set('toObject', {{ virtuals: true }});\n"
            ));
        }
        self.trailer.insert_str(export, &region);
        Ok(())
    }
}

/// Inject a field declaration into artifact text
pub fn inject_field(text: &str, field: &FieldSpec) -> Result<String> {
    let mut artifact = ModelArtifact::parse(text)?;
    artifact.push_field(field);
    Ok(artifact.render())
}

/// Inject a virtual declaration into artifact text
pub fn inject_virtual(text: &str, virtual_decl: &VirtualDecl) -> Result<String> {
    let mut artifact = ModelArtifact::parse(text)?;
    artifact.push_virtual(virtual_decl)?;
    Ok(artifact.render())
}

fn marker_missing(marker: &str) -> ExpmvcError {
    ExpmvcError::MarkerNotFound {
        marker: marker.to_string(),
    }
}

fn virtual_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\w+\.virtual\(\s*['"]([^'"]+)['"]"#).unwrap())
}

fn schema_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:const|let|var)\s+(\w+)\s*=\s*new\s+mongoose\.Schema\(\{$").unwrap())
}

/// Byte offsets of the characters of `text` outside string literals and comments
fn code_chars(text: &str) -> Vec<(usize, char)> {
    let mut code = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, next) in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => code.push((i, c)),
        }
    }
    code
}

/// Offset of the first unmatched closing bracket, i.e. the one closing the
/// block `text` starts inside of
fn closing_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in code_chars(text) {
        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' if depth == 0 => return (c == '}').then_some(i),
            '}' | ']' | ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split a field block on commas at nesting depth zero, outside strings and comments
fn split_top_level(block: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth: i32 = 0;

    for (i, c) in code_chars(block) {
        match c {
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(block[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(block[start..].to_string());
    parts
}
