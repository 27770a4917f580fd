//! C header parsing module.
//!
//! Turns a source tree into a [`DeclarationModel`]: the entry header and its
//! include closure are discovered, rewritten (export macros and C++ guards
//! blanked), parsed in parallel with the tree-sitter C grammar, merged in
//! discovery order, and finally sized by the layout engine.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HdiffError, Result};
use crate::types::{DeclarationModel, FunctionDecl, RecordDecl};

pub mod c_header;
pub mod includes;
pub mod layout;
pub mod preprocess;

mod helpers;

pub use layout::DataModel;

/// Entry header of a libvlc source tree.
pub const DEFAULT_ENTRY_HEADER: &str = "include/vlc/libvlc.h";

/// Export, deprecation and attribute macros blanked before parsing.
pub const DEFAULT_STRIP_MACROS: &[&str] = &[
    "LIBVLC_API",
    "LIBVLC_DEPRECATED",
    "VLC_API",
    "VLC_DEPRECATED",
    "VLC_USED",
];

/// How a tree is parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Entry header, relative to the tree root.
    pub entry_header: String,
    /// Directories, relative to the tree root, searched for includes.
    pub include_dirs: Vec<String>,
    pub follow_includes: bool,
    pub strip_macros: Vec<String>,
    pub data_model: DataModel,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            entry_header: DEFAULT_ENTRY_HEADER.to_string(),
            include_dirs: vec!["include".to_string()],
            follow_includes: true,
            strip_macros: DEFAULT_STRIP_MACROS.iter().map(|s| s.to_string()).collect(),
            data_model: DataModel::default(),
        }
    }
}

/// A typedef name and the type text it stands for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAlias {
    pub name: String,
    pub target: String,
}

/// Declarations extracted from a single header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUnit {
    pub path: String,
    pub functions: Vec<FunctionDecl>,
    /// Records with a body.
    pub records: Vec<RecordDecl>,
    /// Bodiless `struct x;` / `typedef struct x x;` declarations.
    pub forward_declarations: Vec<RecordDecl>,
    pub aliases: Vec<TypeAlias>,
    /// tree-sitter recovered from syntax errors somewhere in the header.
    pub has_errors: bool,
}

impl HeaderUnit {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }
}

/// Parse the header text of one file.
pub fn parse_source(source: &str, path: &str, options: &ParserOptions) -> Result<HeaderUnit> {
    c_header::parse(source, path, options)
}

/// Parse the public surface of the tree at `root`.
pub fn parse_tree(root: &Path, options: &ParserOptions) -> Result<DeclarationModel> {
    let entry = root.join(&options.entry_header);
    if !entry.is_file() {
        return Err(HdiffError::HeaderNotFound {
            path: entry.display().to_string(),
        });
    }

    let files = includes::discover(root, &entry, options)?;
    tracing::debug!(root = %root.display(), headers = files.len(), "discovered headers");

    let units = files
        .par_iter()
        .map(|file| parse_source(&file.source, &file.path, options))
        .collect::<Result<Vec<_>>>()?;

    for unit in units.iter().filter(|u| u.has_errors) {
        tracing::warn!(path = %unit.path, "header parsed with errors");
    }

    let (mut model, aliases) = merge_units(units);
    model.records = layout::apply(&model.records, &aliases, options.data_model);
    model.root = root.display().to_string();
    model.entry_header = options.entry_header.clone();

    tracing::info!(
        root = %model.root,
        headers = model.headers.len(),
        functions = model.functions.len(),
        records = model.records.len(),
        "parsed declaration model"
    );

    Ok(model)
}

/// Merge per-file units in order.
///
/// A definition replaces an earlier forward declaration of the same name
/// and keeps its documentation when it has none of its own. A forward
/// declaration never replaces a definition.
pub fn merge_units(units: Vec<HeaderUnit>) -> (DeclarationModel, Vec<TypeAlias>) {
    let mut model = DeclarationModel::default();
    let mut aliases = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut defined = Vec::<bool>::new();

    for unit in units {
        model.headers.push(unit.path);
        model.functions.extend(unit.functions);
        aliases.extend(unit.aliases);

        for record in unit.forward_declarations {
            if !positions.contains_key(&record.name) {
                positions.insert(record.name.clone(), model.records.len());
                model.records.push(record);
                defined.push(false);
            }
        }

        for mut record in unit.records {
            match positions.get(&record.name) {
                Some(&index) => {
                    if record.documentation.is_none() && !defined[index] {
                        record.documentation = model.records[index].documentation.take();
                    }
                    model.records[index] = record;
                    defined[index] = true;
                }
                None => {
                    positions.insert(record.name.clone(), model.records.len());
                    model.records.push(record);
                    defined.push(true);
                }
            }
        }
    }

    (model, aliases)
}
