//! Function-level diff: presence and counts.

use super::changes::{ChangeDetail, ChangeEntry, ChangeKind, EntityType};
use super::exclusion::ExclusionPolicy;
use super::reconcile::reconcile_by_name;
use crate::types::FunctionDecl;

/// Subject used for the function count note.
pub const FUNCTIONS_SUBJECT: &str = "functions";

/// Compare two function collections by name.
///
/// Matched pairs produce no entries; parameter and return type comparison
/// would hook in at the matched-pair loop.
pub fn diff_functions(
    old: &[FunctionDecl],
    new: &[FunctionDecl],
    policy: &ExclusionPolicy,
) -> Vec<ChangeEntry> {
    let old = policy.retain(old);
    let new = policy.retain(new);

    let mut changes = Vec::new();

    if old.len() != new.len() {
        changes.push(
            ChangeEntry::create(
                ChangeKind::CountMismatch,
                EntityType::Function,
                FUNCTIONS_SUBJECT,
            )
            .with_detail(ChangeDetail::Count {
                old: old.len(),
                new: new.len(),
            }),
        );
    }

    let result = reconcile_by_name(&old, &new);

    tracing::debug!(
        matched = result.matched.len(),
        removed = result.left_only.len(),
        added = result.right_only.len(),
        "reconciled functions"
    );

    for func in &result.left_only {
        changes.push(
            ChangeEntry::create(ChangeKind::Removed, EntityType::Function, &func.name)
                .with_detail(ChangeDetail::Signature {
                    signature: func.signature(),
                }),
        );
    }

    for func in &result.right_only {
        changes.push(
            ChangeEntry::create(ChangeKind::Added, EntityType::Function, &func.name)
                .with_detail(ChangeDetail::Signature {
                    signature: func.signature(),
                }),
        );
    }

    changes
}
