//! API surface diff engine for parsed C headers.
//!
//! Compares two [`DeclarationModel`]s and produces an ordered [`DiffReport`].
//!
//! # Pipeline
//!
//! - **Exclusion**: deprecated declarations are dropped from both sides
//! - **Reconciliation**: name-keyed partition into matched / removed / added
//! - **Functions**: presence and count changes
//! - **Records**: presence, layout size, field sets (with the `u` event
//!   union), documentation
//!
//! Function and record diffs share nothing and run concurrently via Rayon.
//! Function entries always precede record entries in the report.
//!
//! # Example
//!
//! ```
//! use hdiff_core::differ::{diff_models, DiffOptions};
//! use hdiff_core::types::{DeclarationModel, FunctionDecl};
//!
//! let old = DeclarationModel::new(vec![FunctionDecl::new("libvlc_new", "libvlc.h")], vec![]);
//! let new = DeclarationModel::new(vec![], vec![]);
//!
//! let report = diff_models(&old, &new, &DiffOptions::default());
//! assert!(report.has_differences());
//! assert_eq!(report.summary.functions_removed, 1);
//! ```

pub mod changes;
pub mod exclusion;
pub mod fields;
pub mod functions;
pub mod index;
pub mod reconcile;
pub mod records;

use serde::{Deserialize, Serialize};

use crate::types::DeclarationModel;

pub use changes::{ChangeDetail, ChangeEntry, ChangeKind, DiffReport, DiffSummary, DocChange, EntityType};
pub use exclusion::ExclusionPolicy;
pub use fields::diff_fields;
pub use functions::diff_functions;
pub use index::SymbolIndex;
pub use reconcile::{reconcile, reconcile_by_name, Reconciliation};
pub use records::diff_records;

/// Options that shape a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Compare deprecated declarations instead of dropping them.
    pub include_deprecated: bool,
    /// Report record documentation changes.
    pub include_comments: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_deprecated: false,
            include_comments: true,
        }
    }
}

impl DiffOptions {
    pub fn exclusion_policy(&self) -> ExclusionPolicy {
        ExclusionPolicy::new(self.include_deprecated)
    }
}

/// Compute the diff between two declaration models.
pub fn diff_models(old: &DeclarationModel, new: &DeclarationModel, options: &DiffOptions) -> DiffReport {
    let policy = options.exclusion_policy();

    let (function_changes, record_changes) = rayon::join(
        || diff_functions(&old.functions, &new.functions, &policy),
        || diff_records(&old.records, &new.records, options),
    );

    let report = DiffReport::from_changes(function_changes.into_iter().chain(record_changes));

    tracing::info!(
        entries = report.change_count(),
        summary = %report.summary_text(),
        "diff complete"
    );

    report
}
