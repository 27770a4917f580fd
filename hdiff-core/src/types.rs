//! Declaration model for a parsed C header surface.
//!
//! These types represent the public API of one source revision: function
//! prototypes and struct/union records with their fields. They are produced
//! by the header parser and consumed, read-only, by the diff engine.

use serde::{Deserialize, Serialize};

/// Common capability of every declaration the engine compares.
pub trait Declaration {
    fn name(&self) -> &str;
    fn documentation(&self) -> Option<&str>;
    fn source_path(&self) -> &str;
}

/// A function prototype.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Header the declaration was read from, relative to the tree root.
    pub source_path: String,
    pub documentation: Option<String>,
    pub return_type: String,
    /// Whitespace-normalised text of each parameter, in order.
    pub parameters: Vec<String>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Set documentation.
    pub fn with_documentation(mut self, doc: &str) -> Self {
        self.documentation = Some(doc.to_string());
        self
    }

    /// C-style signature, e.g. `int libvlc_add(libvlc_instance_t *p, int n)`.
    pub fn signature(&self) -> String {
        let ret = if self.return_type.is_empty() {
            "int"
        } else {
            self.return_type.as_str()
        };
        let sep = if ret.ends_with('*') { "" } else { " " };
        let params = if self.parameters.is_empty() {
            "void".to_string()
        } else {
            self.parameters.join(", ")
        };
        format!("{}{}{}({})", ret, sep, self.name, params)
    }
}

impl Declaration for FunctionDecl {
    fn name(&self) -> &str {
        &self.name
    }

    fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    fn source_path(&self) -> &str {
        &self.source_path
    }
}

/// Whether a record is a `struct` or a `union`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    #[default]
    Struct,
    Union,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        }
    }
}

/// A struct or union declaration.
///
/// Forward declarations are kept as opaque records: no fields and a size of 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub kind: RecordKind,
    pub size_in_bytes: u64,
    pub fields: Vec<FieldDecl>,
    pub documentation: Option<String>,
    pub source_path: String,
}

impl RecordDecl {
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    /// Set the layout size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size_in_bytes = size;
        self
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Set documentation.
    pub fn with_documentation(mut self, doc: &str) -> Self {
        self.documentation = Some(doc.to_string());
        self
    }

    /// Set the originating header.
    pub fn with_source_path(mut self, path: &str) -> Self {
        self.source_path = path.to_string();
        self
    }

    /// True for forward-declared records without a body.
    pub fn is_opaque(&self) -> bool {
        self.fields.is_empty() && self.size_in_bytes == 0
    }

    /// Look up a field by name. The first match wins.
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Declaration for RecordDecl {
    fn name(&self) -> &str {
        &self.name
    }

    fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    fn source_path(&self) -> &str {
        &self.source_path
    }
}

/// The type of a record field.
///
/// Inline struct/union bodies (anonymous unions in particular) are kept as
/// nested records so they can be inspected without any cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum TypeRef {
    Primitive(String),
    Record(Box<RecordDecl>),
}

impl TypeRef {
    pub fn primitive(name: &str) -> Self {
        TypeRef::Primitive(name.to_string())
    }

    /// The nested record, if this type is one.
    pub fn as_record(&self) -> Option<&RecordDecl> {
        match self {
            TypeRef::Record(record) => Some(record),
            TypeRef::Primitive(_) => None,
        }
    }

    /// Display name of the type.
    pub fn display_name(&self) -> String {
        match self {
            TypeRef::Primitive(name) => name.clone(),
            TypeRef::Record(record) if record.name.is_empty() => {
                format!("{} {{...}}", record.kind.as_str())
            }
            TypeRef::Record(record) => format!("{} {}", record.kind.as_str(), record.name),
        }
    }
}

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::Primitive(String::new())
    }
}

/// A single field inside a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_ref: TypeRef,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
        }
    }

    /// Shorthand for a field of a scalar or named type.
    pub fn primitive(name: &str, type_name: &str) -> Self {
        Self::new(name, TypeRef::primitive(type_name))
    }

    /// Shorthand for a field whose type is an inline record.
    pub fn nested(name: &str, record: RecordDecl) -> Self {
        Self::new(name, TypeRef::Record(Box::new(record)))
    }
}

/// The parsed public surface of one source tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationModel {
    /// Tree root the model was parsed from.
    pub root: String,
    /// Entry header, relative to `root`.
    pub entry_header: String,
    /// Headers that contributed declarations, in parse order.
    pub headers: Vec<String>,
    pub functions: Vec<FunctionDecl>,
    pub records: Vec<RecordDecl>,
}

impl DeclarationModel {
    pub fn new(functions: Vec<FunctionDecl>, records: Vec<RecordDecl>) -> Self {
        Self {
            functions,
            records,
            ..Default::default()
        }
    }

    /// Total number of top-level declarations.
    pub fn declaration_count(&self) -> usize {
        self.functions.len() + self.records.len()
    }
}
