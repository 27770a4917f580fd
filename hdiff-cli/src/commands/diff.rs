//! Diff and compare commands - API surface diff between two header trees
//!
//! `diff` checks out two git revisions first; `compare` takes two local
//! directories. Both parse the trees concurrently and render the report.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use hdiff_core::{
    diff_models, parse_tree, ChangeEntry, ChangeKind, DeclarationModel, DiffOptions, DiffReport,
    EntityType, ParserOptions,
};

use crate::git::{self, SourceOptions};
use crate::output::{stderr_is_tty, Output, OutputFormat, TableDisplay};

/// Where the two trees come from.
#[derive(Debug, Clone)]
pub enum TreeSource {
    /// Two revisions of one repository.
    Git {
        options: SourceOptions,
        old_rev: String,
        new_rev: String,
    },
    /// Two directories already on disk.
    Local { old_dir: PathBuf, new_dir: PathBuf },
}

impl TreeSource {
    fn labels(&self) -> (String, String) {
        match self {
            TreeSource::Git {
                old_rev, new_rev, ..
            } => (old_rev.clone(), new_rev.clone()),
            TreeSource::Local { old_dir, new_dir } => (
                old_dir.display().to_string(),
                new_dir.display().to_string(),
            ),
        }
    }
}

/// Diff result rendered by both commands
#[derive(Debug, Serialize)]
pub struct DiffResult {
    pub old: String,
    pub new: String,
    pub report: DiffReport,
    pub duration_ms: u64,
}

impl TableDisplay for DiffResult {
    fn to_table(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} -> {}\n",
            "DIFF:".cyan().bold(),
            self.old.yellow(),
            self.new.green()
        ));

        if !self.report.has_differences() {
            output.push_str(&format!(
                "{} ({}ms)\n",
                "No API differences.".dimmed(),
                self.duration_ms
            ));
            return output;
        }

        output.push_str(&format!(
            "Found {} changes: {} ({}ms)\n",
            self.report.findings().count().to_string().cyan(),
            self.report.summary_text(),
            self.duration_ms
        ));

        let functions = self.report.filter_entity(EntityType::Function);
        let records: Vec<&ChangeEntry> = self
            .report
            .changes
            .iter()
            .filter(|c| c.entity != EntityType::Function)
            .collect();

        for (title, entries) in [("FUNCTIONS", &functions), ("RECORDS", &records)] {
            if entries.is_empty() {
                continue;
            }
            output.push_str(&format!("\n{} ({}):\n", title.bold(), entries.len()));
            for change in entries.iter() {
                output.push_str(&change_line(change));
                output.push('\n');
            }
        }

        output
    }
}

/// One table row: marker, qualified subject, kind and detail.
fn change_line(change: &ChangeEntry) -> String {
    let name = change.full_name();
    let (marker, name) = match change.kind {
        ChangeKind::Added | ChangeKind::FieldAdded => ("+".green(), name.green()),
        ChangeKind::Removed | ChangeKind::FieldRemoved => ("-".red(), name.red()),
        ChangeKind::CountMismatch => ("~".dimmed(), name.dimmed()),
        _ => ("~".yellow(), name.yellow()),
    };

    let mut line = format!(
        "  {} {} {}",
        marker,
        name,
        format!("[{}]", change.kind.as_str()).dimmed()
    );
    if let Some(detail) = &change.detail {
        line.push_str(&format!("  {}", detail.to_string().dimmed()));
    }
    line
}

/// Run a diff and render it. Returns whether the report has findings.
pub async fn run(
    source: TreeSource,
    parser: ParserOptions,
    options: DiffOptions,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    let start = Instant::now();
    let (old, new) = source.labels();

    let spinner = create_spinner();
    let (old_root, new_root) = match source {
        TreeSource::Git {
            options: source,
            old_rev,
            new_rev,
        } => {
            spinner.set_message(format!("Checking out {} and {}...", old_rev, new_rev));
            checkout_both(source, old_rev, new_rev).await?
        }
        TreeSource::Local { old_dir, new_dir } => (old_dir, new_dir),
    };

    spinner.set_message("Parsing headers...");
    let (old_model, new_model) = tokio::try_join!(
        parse_in_background(old_root, parser.clone()),
        parse_in_background(new_root, parser),
    )?;

    spinner.set_message("Comparing...");
    let report = diff_models(&old_model, &new_model, &options);
    spinner.finish_and_clear();

    let has_differences = report.has_differences();
    let result = DiffResult {
        old,
        new,
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    Output::new(result, format).render()?;
    Ok(has_differences)
}

async fn checkout_both(
    options: SourceOptions,
    old_rev: String,
    new_rev: String,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    if old_rev == new_rev {
        let root = checkout_in_background(options, old_rev).await?;
        return Ok((root.clone(), root));
    }

    tokio::try_join!(
        checkout_in_background(options.clone(), old_rev),
        checkout_in_background(options, new_rev),
    )
}

async fn checkout_in_background(
    options: SourceOptions,
    revision: String,
) -> anyhow::Result<PathBuf> {
    tokio::task::spawn_blocking(move || {
        git::checkout(&options, &revision)
            .with_context(|| format!("Failed to check out {}", revision))
    })
    .await
    .context("Checkout task panicked")?
}

/// Parse a tree on the blocking pool.
pub(crate) async fn parse_in_background(
    root: PathBuf,
    options: ParserOptions,
) -> anyhow::Result<DeclarationModel> {
    tokio::task::spawn_blocking(move || {
        parse_tree(&root, &options)
            .with_context(|| format!("Failed to parse headers under {}", root.display()))
    })
    .await
    .context("Parser task panicked")?
}

/// Spinner on stderr, hidden when stderr is not a terminal.
pub(crate) fn create_spinner() -> ProgressBar {
    if !stderr_is_tty() {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
