//! hdiff core - C header API surface parsing and diffing.
//!
//! This crate reads the public headers of a source tree into a
//! [`DeclarationModel`] and compares two such models to report what changed
//! in the exported API: functions added or removed, records added, removed
//! or resized, fields added or removed (including the members of libvlc's
//! event union), and record documentation edits.
//!
//! # Features
//!
//! - **Header parsing**: tree-sitter C grammar, include closure discovery,
//!   parallel per-file parsing with Rayon
//! - **Layout**: record sizes under LP64, LLP64 or ILP32
//! - **Diffing**: name-keyed reconciliation with deprecated-symbol exclusion
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use hdiff_core::{diff_models, parse_tree, DiffOptions, ParserOptions};
//!
//! let options = ParserOptions::default();
//! let old = parse_tree(Path::new("vlc-3.0/"), &options)?;
//! let new = parse_tree(Path::new("vlc-4.0/"), &options)?;
//!
//! let report = diff_models(&old, &new, &DiffOptions::default());
//! println!("{}", report.summary_text());
//! # Ok::<(), hdiff_core::HdiffError>(())
//! ```

pub mod differ;
pub mod error;
pub mod parser;
pub mod types;

pub use differ::{diff_models, ChangeDetail, ChangeEntry, ChangeKind, DiffOptions, DiffReport, EntityType};
pub use error::{HdiffError, Result};
pub use parser::{parse_source, parse_tree, DataModel, HeaderUnit, ParserOptions};
pub use types::{Declaration, DeclarationModel, FieldDecl, FunctionDecl, RecordDecl, RecordKind, TypeRef};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_parse_and_diff_in_memory() {
        let options = ParserOptions::default();
        let old = parse_source(
            "LIBVLC_API int libvlc_a(void);\nstruct S { int x; };\n",
            "include/vlc/libvlc.h",
            &options,
        )
        .unwrap();
        let new = parse_source(
            "LIBVLC_API int libvlc_a(void);\nLIBVLC_API int libvlc_b(void);\nstruct S { int x; int y; };\n",
            "include/vlc/libvlc.h",
            &options,
        )
        .unwrap();

        let (old, _) = parser::merge_units(vec![old]);
        let (new, _) = parser::merge_units(vec![new]);
        let report = diff_models(&old, &new, &DiffOptions::default());

        assert_eq!(report.subjects(ChangeKind::Added), vec!["libvlc_b"]);
        assert_eq!(report.subjects(ChangeKind::FieldAdded), vec!["y"]);
    }
}
