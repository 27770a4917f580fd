//! Record-level diff: presence, layout size, fields and documentation.

use super::changes::{ChangeDetail, ChangeEntry, ChangeKind, DocChange, EntityType};
use super::fields::diff_fields;
use super::reconcile::reconcile_by_name;
use super::DiffOptions;
use crate::types::RecordDecl;

/// Compare two record collections by name.
pub fn diff_records(
    old: &[RecordDecl],
    new: &[RecordDecl],
    options: &DiffOptions,
) -> Vec<ChangeEntry> {
    let policy = options.exclusion_policy();
    let old = policy.retain(old);
    let new = policy.retain(new);

    let result = reconcile_by_name(&old, &new);

    tracing::debug!(
        matched = result.matched.len(),
        removed = result.left_only.len(),
        added = result.right_only.len(),
        "reconciled records"
    );

    let mut changes = Vec::new();

    for record in &result.left_only {
        changes.push(ChangeEntry::create(
            ChangeKind::Removed,
            EntityType::Record,
            &record.name,
        ));
    }

    for record in &result.right_only {
        changes.push(ChangeEntry::create(
            ChangeKind::Added,
            EntityType::Record,
            &record.name,
        ));
    }

    for (old_record, new_record) in &result.matched {
        changes.extend(diff_record_pair(old_record, new_record, options));
    }

    changes
}

/// Compare two versions of the same record.
fn diff_record_pair(old: &RecordDecl, new: &RecordDecl, options: &DiffOptions) -> Vec<ChangeEntry> {
    let mut changes = Vec::new();

    if old.size_in_bytes != new.size_in_bytes {
        changes.push(
            ChangeEntry::create(ChangeKind::SizeChanged, EntityType::Record, &new.name)
                .with_detail(ChangeDetail::Size {
                    old: old.size_in_bytes,
                    new: new.size_in_bytes,
                }),
        );
    }

    changes.extend(diff_fields(&new.name, &old.fields, &new.fields));

    if options.include_comments {
        if let Some(doc) = compare_documentation(old.documentation.as_deref(), new.documentation.as_deref()) {
            changes.push(
                ChangeEntry::create(ChangeKind::CommentChanged, EntityType::Record, &new.name)
                    .with_detail(ChangeDetail::Documentation(doc)),
            );
        }
    }

    changes
}

/// Tri-state documentation comparison.
///
/// Returns `None` when both sides are absent or textually equal.
pub fn compare_documentation(old: Option<&str>, new: Option<&str>) -> Option<DocChange> {
    match (old, new) {
        (None, None) => None,
        (None, Some(new)) => Some(DocChange::Added {
            new: new.to_string(),
        }),
        (Some(old), None) => Some(DocChange::Removed {
            old: old.to_string(),
        }),
        (Some(old), Some(new)) if old == new => None,
        (Some(old), Some(new)) => Some(DocChange::Edited {
            old: old.to_string(),
            new: new.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, RecordKind};

    fn make_record(name: &str, size: u64, fields: &[&str]) -> RecordDecl {
        let mut record = RecordDecl::new(name, RecordKind::Struct).with_size(size);
        record.fields = fields.iter().map(|f| FieldDecl::primitive(f, "int")).collect();
        record
    }

    fn kinds(changes: &[ChangeEntry]) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_size_and_field_scenario() {
        let old = vec![make_record("S", 8, &["x"])];
        let new = vec![make_record("S", 12, &["x", "y"])];

        let changes = diff_records(&old, &new, &DiffOptions::default());
        let findings: Vec<_> = changes.iter().filter(|c| !c.kind.is_informational()).collect();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, ChangeKind::SizeChanged);
        assert_eq!(findings[0].subject, "S");
        assert_eq!(findings[0].detail, Some(ChangeDetail::Size { old: 8, new: 12 }));
        assert_eq!(findings[1].kind, ChangeKind::FieldAdded);
        assert_eq!(findings[1].subject, "y");
        assert_eq!(findings[1].scope.as_deref(), Some("S"));

        let notes: Vec<_> = changes.iter().filter(|c| c.kind.is_informational()).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].subject, "S");
    }

    #[test]
    fn test_added_and_removed_records() {
        let old = vec![make_record("gone_t", 4, &["a"]), make_record("kept_t", 4, &["a"])];
        let new = vec![make_record("kept_t", 4, &["a"]), make_record("new_t", 4, &["a"])];

        let changes = diff_records(&old, &new, &DiffOptions::default());

        assert_eq!(kinds(&changes), vec![ChangeKind::Removed, ChangeKind::Added]);
        assert_eq!(changes[0].subject, "gone_t");
        assert_eq!(changes[1].subject, "new_t");
        assert!(changes.iter().all(|c| c.entity == EntityType::Record));
    }

    #[test]
    fn test_self_comparison_is_clean() {
        let records = vec![
            make_record("a_t", 16, &["x", "y"]),
            make_record("opaque_t", 0, &[]).with_documentation("Opaque handle"),
            make_record("b_t", 8, &["p"]).with_documentation("B"),
        ];

        assert!(diff_records(&records, &records, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn test_comment_tri_state() {
        assert_eq!(compare_documentation(None, None), None);
        assert_eq!(compare_documentation(Some("same"), Some("same")), None);
        assert_eq!(
            compare_documentation(None, Some("new")),
            Some(DocChange::Added {
                new: "new".to_string()
            })
        );
        assert_eq!(
            compare_documentation(Some("old"), None),
            Some(DocChange::Removed {
                old: "old".to_string()
            })
        );
        assert_eq!(
            compare_documentation(Some("old"), Some("new")),
            Some(DocChange::Edited {
                old: "old".to_string(),
                new: "new".to_string()
            })
        );
    }

    #[test]
    fn test_comment_change_reported_and_suppressible() {
        let old = vec![make_record("S", 4, &["x"]).with_documentation("Old text")];
        let new = vec![make_record("S", 4, &["x"]).with_documentation("New text")];

        let changes = diff_records(&old, &new, &DiffOptions::default());
        assert_eq!(kinds(&changes), vec![ChangeKind::CommentChanged]);
        assert_eq!(changes[0].detail.as_ref().map(|d| d.to_string()).as_deref(), Some("documentation changed"));

        let options = DiffOptions {
            include_comments: false,
            ..DiffOptions::default()
        };
        assert!(diff_records(&old, &new, &options).is_empty());
    }

    #[test]
    fn test_comment_added_detail() {
        let old = vec![make_record("S", 4, &["x"])];
        let new = vec![make_record("S", 4, &["x"]).with_documentation("Now documented")];

        let changes = diff_records(&old, &new, &DiffOptions::default());
        assert_eq!(
            changes[0].detail.as_ref().map(|d| d.to_string()).as_deref(),
            Some("documentation added")
        );
    }

    #[test]
    fn test_deprecated_record_excluded() {
        let old = vec![make_record("S", 4, &["x"])];
        let new = vec![
            make_record("S", 4, &["x"]),
            make_record("old_t", 4, &["x"]).with_source_path("include/vlc/deprecated.h"),
        ];

        assert!(diff_records(&old, &new, &DiffOptions::default()).is_empty());

        let options = DiffOptions {
            include_deprecated: true,
            ..DiffOptions::default()
        };
        let changes = diff_records(&old, &new, &options);
        assert_eq!(kinds(&changes), vec![ChangeKind::Added]);
    }

    #[test]
    fn test_record_deprecated_by_documentation_excluded() {
        let old = vec![
            make_record("S", 4, &["x"]),
            make_record("libvlc_audio_output_device_t", 16, &["next", "name"])
                .with_documentation("Deprecated: use libvlc_audio_output_device_enum()"),
        ];
        let new = vec![make_record("S", 4, &["x"])];

        assert!(diff_records(&old, &new, &DiffOptions::default()).is_empty());

        let options = DiffOptions {
            include_deprecated: true,
            ..DiffOptions::default()
        };
        let changes = diff_records(&old, &new, &options);
        assert_eq!(kinds(&changes), vec![ChangeKind::Removed]);
        assert_eq!(changes[0].subject, "libvlc_audio_output_device_t");
    }

    #[test]
    fn test_opaque_to_defined_reports_fields() {
        let old = vec![make_record("handle_t", 0, &[])];
        let new = vec![make_record("handle_t", 8, &["ptr"])];

        let changes = diff_records(&old, &new, &DiffOptions::default());
        assert_eq!(
            kinds(&changes),
            vec![
                ChangeKind::SizeChanged,
                ChangeKind::CountMismatch,
                ChangeKind::FieldAdded
            ]
        );
    }
}
