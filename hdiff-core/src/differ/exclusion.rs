//! Deprecated-symbol filtering applied before reconciliation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::Declaration;

const DEPRECATED_MARKER: &str = "deprecated";

/// Decides which declarations take part in a comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPolicy {
    /// Keep deprecated declarations instead of dropping them.
    pub include_deprecated: bool,
}

impl ExclusionPolicy {
    pub fn new(include_deprecated: bool) -> Self {
        Self { include_deprecated }
    }

    /// Whether `decl` is dropped from comparison under this policy.
    pub fn is_excluded<D: Declaration + ?Sized>(&self, decl: &D) -> bool {
        !self.include_deprecated && is_deprecated(decl)
    }

    /// The declarations of `decls` that survive the policy, in input order.
    pub fn retain<'a, D: Declaration>(&self, decls: &'a [D]) -> Vec<&'a D> {
        decls
            .iter()
            .filter(|decl| {
                let excluded = self.is_excluded(*decl);
                if excluded {
                    tracing::trace!(name = decl.name(), "excluding deprecated declaration");
                }
                !excluded
            })
            .collect()
    }
}

/// True when the documentation or the source path marks `decl` deprecated.
pub fn is_deprecated<D: Declaration + ?Sized>(decl: &D) -> bool {
    documentation_marks_deprecated(decl.documentation())
        || path_marks_deprecated(decl.source_path())
}

fn documentation_marks_deprecated(doc: Option<&str>) -> bool {
    doc.is_some_and(|text| text.to_lowercase().contains(DEPRECATED_MARKER))
}

/// Matches any path component, so both `deprecated/` directories and
/// `deprecated.h` headers count.
fn path_marks_deprecated(path: &str) -> bool {
    Path::new(path).components().any(|component| {
        component
            .as_os_str()
            .to_string_lossy()
            .to_lowercase()
            .contains(DEPRECATED_MARKER)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionDecl, RecordDecl, RecordKind};

    #[test]
    fn test_documentation_marker_is_case_insensitive() {
        let func = FunctionDecl::new("libvlc_audio_output_device_count", "include/vlc/libvlc.h")
            .with_documentation("\\deprecated Use libvlc_audio_output_device_list_get() instead");
        assert!(is_deprecated(&func));

        let func = FunctionDecl::new("f", "x.h").with_documentation("DEPRECATED since 3.0");
        assert!(is_deprecated(&func));
    }

    #[test]
    fn test_path_marker() {
        let func = FunctionDecl::new("libvlc_media_player_get_fps", "include/vlc/deprecated.h");
        assert!(is_deprecated(&func));

        let func = FunctionDecl::new("f", "include/deprecated/old.h");
        assert!(is_deprecated(&func));

        let func = FunctionDecl::new("f", "include/vlc/libvlc_media.h");
        assert!(!is_deprecated(&func));
    }

    #[test]
    fn test_plain_declaration_not_deprecated() {
        let record = RecordDecl::new("libvlc_event_t", RecordKind::Struct)
            .with_documentation("A LibVLC event")
            .with_source_path("include/vlc/libvlc_events.h");
        assert!(!is_deprecated(&record));
    }

    #[test]
    fn test_retain_drops_only_when_not_included() {
        let funcs = vec![
            FunctionDecl::new("keep", "a.h"),
            FunctionDecl::new("old", "a.h").with_documentation("Deprecated"),
            FunctionDecl::new("also_keep", "a.h"),
        ];

        let kept = ExclusionPolicy::new(false).retain(&funcs);
        let names: Vec<_> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["keep", "also_keep"]);

        let kept = ExclusionPolicy::new(true).retain(&funcs);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_default_excludes_deprecated() {
        let func = FunctionDecl::new("old", "deprecated.h");
        assert!(ExclusionPolicy::default().is_excluded(&func));
        assert!(!ExclusionPolicy::new(true).is_excluded(&func));
    }
}
