//! Change types and the report produced by a header diff.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of structural difference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    SizeChanged,
    FieldAdded,
    FieldRemoved,
    /// Reserved for per-field type comparison; not produced yet.
    FieldChanged,
    CommentChanged,
    CountMismatch,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::SizeChanged => "size_changed",
            ChangeKind::FieldAdded => "field_added",
            ChangeKind::FieldRemoved => "field_removed",
            ChangeKind::FieldChanged => "field_changed",
            ChangeKind::CommentChanged => "comment_changed",
            ChangeKind::CountMismatch => "count_mismatch",
        }
    }

    /// Informational entries accompany findings but are not findings themselves.
    pub fn is_informational(&self) -> bool {
        matches!(self, ChangeKind::CountMismatch)
    }
}

/// Kind of declaration a change is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Function,
    Record,
    Field,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Function => "function",
            EntityType::Record => "record",
            EntityType::Field => "field",
        }
    }
}

/// How a documentation block changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum DocChange {
    Added { new: String },
    Removed { old: String },
    Edited { old: String, new: String },
}

impl fmt::Display for DocChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocChange::Added { .. } => write!(f, "documentation added"),
            DocChange::Removed { .. } => write!(f, "documentation removed"),
            DocChange::Edited { .. } => write!(f, "documentation changed"),
        }
    }
}

/// Structured payload attached to a change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeDetail {
    Count { old: usize, new: usize },
    Size { old: u64, new: u64 },
    Signature { signature: String },
    Documentation(DocChange),
}

impl fmt::Display for ChangeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeDetail::Count { old, new } => write!(f, "count: {} -> {}", old, new),
            ChangeDetail::Size { old, new } => write!(f, "size: {} -> {} bytes", old, new),
            ChangeDetail::Signature { signature } => write!(f, "{}", signature),
            ChangeDetail::Documentation(doc) => write!(f, "{}", doc),
        }
    }
}

/// One reported structural difference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    pub entity: EntityType,

    /// Name of the affected symbol (function, record or field name)
    pub subject: String,

    /// Enclosing record for field changes, `record.u` for union members
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ChangeDetail>,
}

impl ChangeEntry {
    pub fn create(kind: ChangeKind, entity: EntityType, subject: &str) -> Self {
        Self {
            kind,
            entity,
            subject: subject.to_string(),
            scope: None,
            detail: None,
        }
    }

    /// Set the enclosing scope.
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// Set the detail payload.
    pub fn with_detail(mut self, detail: ChangeDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Fully qualified subject, e.g. `libvlc_event_t.u.media_meta_changed`.
    pub fn full_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}.{}", scope, self.subject),
            None => self.subject.clone(),
        }
    }
}

/// Per-kind counters for a report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub functions_added: u32,
    pub functions_removed: u32,

    pub records_added: u32,
    pub records_removed: u32,
    pub records_resized: u32,

    pub fields_added: u32,
    pub fields_removed: u32,
    pub fields_changed: u32,

    pub comments_changed: u32,
    pub count_mismatches: u32,
}

impl DiffSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter matching an entry.
    pub fn record(&mut self, change: &ChangeEntry) {
        match (change.kind, change.entity) {
            (ChangeKind::Added, EntityType::Function) => self.functions_added += 1,
            (ChangeKind::Removed, EntityType::Function) => self.functions_removed += 1,
            (ChangeKind::Added, _) => self.records_added += 1,
            (ChangeKind::Removed, _) => self.records_removed += 1,
            (ChangeKind::SizeChanged, _) => self.records_resized += 1,
            (ChangeKind::FieldAdded, _) => self.fields_added += 1,
            (ChangeKind::FieldRemoved, _) => self.fields_removed += 1,
            (ChangeKind::FieldChanged, _) => self.fields_changed += 1,
            (ChangeKind::CommentChanged, _) => self.comments_changed += 1,
            (ChangeKind::CountMismatch, _) => self.count_mismatches += 1,
        }
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();

        let functions = join_counts(&[
            (self.functions_added, "added"),
            (self.functions_removed, "removed"),
        ]);
        if !functions.is_empty() {
            parts.push(format!("functions: {}", functions));
        }

        let records = join_counts(&[
            (self.records_added, "added"),
            (self.records_removed, "removed"),
            (self.records_resized, "resized"),
        ]);
        if !records.is_empty() {
            parts.push(format!("records: {}", records));
        }

        let fields = join_counts(&[
            (self.fields_added, "added"),
            (self.fields_removed, "removed"),
            (self.fields_changed, "changed"),
        ]);
        if !fields.is_empty() {
            parts.push(format!("fields: {}", fields));
        }

        if self.comments_changed > 0 {
            parts.push(format!("comments: {} changed", self.comments_changed));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}

fn join_counts(counts: &[(u32, &str)]) -> String {
    counts
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered result of comparing two declaration models.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// All entries, in the order they were produced
    pub changes: Vec<ChangeEntry>,

    /// Summary statistics
    pub summary: DiffSummary,
}

impl DiffReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a report from entries, preserving their order.
    pub fn from_changes(changes: impl IntoIterator<Item = ChangeEntry>) -> Self {
        let mut report = Self::new();
        for change in changes {
            report.add_change(change);
        }
        report
    }

    /// Append a change and update summary.
    pub fn add_change(&mut self, change: ChangeEntry) {
        self.summary.record(&change);
        self.changes.push(change);
    }

    /// True when the two APIs produced no entries at all.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// True when at least one non-informational entry exists.
    pub fn has_differences(&self) -> bool {
        self.findings().next().is_some()
    }

    /// Get change count.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Entries that are findings, skipping informational notes.
    pub fn findings(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.changes.iter().filter(|c| !c.kind.is_informational())
    }

    /// Filter changes by entity type.
    pub fn filter_entity(&self, entity: EntityType) -> Vec<&ChangeEntry> {
        self.changes.iter().filter(|c| c.entity == entity).collect()
    }

    /// Subjects of all entries of a kind, in report order.
    pub fn subjects(&self, kind: ChangeKind) -> Vec<&str> {
        self.changes
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.subject.as_str())
            .collect()
    }

    /// Human-readable summary text.
    pub fn summary_text(&self) -> String {
        self.summary.text()
    }
}
