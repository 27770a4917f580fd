//! Field-level diff for a matched record pair, including the event union.

use super::changes::{ChangeDetail, ChangeEntry, ChangeKind, EntityType};
use super::reconcile::{reconcile, Reconciliation};
use crate::types::FieldDecl;

/// Field name libvlc uses for its event payload unions.
pub const UNION_FIELD: &str = "u";

/// Compare the fields of two versions of `record_name`.
///
/// Fields are treated as opaque leaves except the `u` field, whose nested
/// union members are reconciled when both sides carry an inline record.
pub fn diff_fields(record_name: &str, old: &[FieldDecl], new: &[FieldDecl]) -> Vec<ChangeEntry> {
    // Opaque and forward-declared records have nothing to compare.
    if old.is_empty() && new.is_empty() {
        return Vec::new();
    }

    let mut changes = Vec::new();

    if old.len() != new.len() {
        changes.push(
            ChangeEntry::create(ChangeKind::CountMismatch, EntityType::Record, record_name)
                .with_detail(ChangeDetail::Count {
                    old: old.len(),
                    new: new.len(),
                }),
        );
    }

    let result = reconcile_fields(old, new);
    push_presence_changes(&mut changes, record_name, &result);

    let union_pair = result
        .matched
        .iter()
        .find(|(field, _)| field.name == UNION_FIELD);

    if let Some((old_union, new_union)) = union_pair {
        match (old_union.type_ref.as_record(), new_union.type_ref.as_record()) {
            (Some(old_members), Some(new_members)) => {
                let scope = format!("{}.{}", record_name, UNION_FIELD);
                let members = reconcile_fields(&old_members.fields, &new_members.fields);
                push_presence_changes(&mut changes, &scope, &members);
            }
            _ => {
                tracing::trace!(
                    record = record_name,
                    "union field is not an inline record on both sides"
                );
            }
        }
    }

    changes
}

fn reconcile_fields<'a>(old: &'a [FieldDecl], new: &'a [FieldDecl]) -> Reconciliation<'a, FieldDecl> {
    let old: Vec<&FieldDecl> = old.iter().collect();
    let new: Vec<&FieldDecl> = new.iter().collect();
    reconcile(&old, &new, |field| field.name.as_str())
}

fn push_presence_changes(
    changes: &mut Vec<ChangeEntry>,
    scope: &str,
    result: &Reconciliation<'_, FieldDecl>,
) {
    for field in &result.left_only {
        changes.push(
            ChangeEntry::create(ChangeKind::FieldRemoved, EntityType::Field, &field.name)
                .with_scope(scope),
        );
    }
    for field in &result.right_only {
        changes.push(
            ChangeEntry::create(ChangeKind::FieldAdded, EntityType::Field, &field.name)
                .with_scope(scope),
        );
    }
}
