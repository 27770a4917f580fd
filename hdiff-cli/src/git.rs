//! Git checkouts of the trees being compared.
//!
//! Each revision gets its own work tree under the work directory, named
//! `<repo-name>-<short revision>`, so that two revisions can be parsed side
//! by side and reused across runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};
use xxhash_rust::xxh3::xxh3_64;

/// Where and how revisions are checked out.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Clone URL or local path.
    pub repo: String,
    pub workdir: PathBuf,
    /// Keep an existing checkout directory instead of recloning.
    pub reuse_checkouts: bool,
}

/// Check out `revision` and return the absolute path of its work tree.
pub fn checkout(options: &SourceOptions, revision: &str) -> anyhow::Result<PathBuf> {
    validate_revision(revision)?;

    fs::create_dir_all(&options.workdir).with_context(|| {
        format!(
            "Failed to create work directory {}",
            options.workdir.display()
        )
    })?;

    let dir = options.workdir.join(checkout_name(&options.repo, revision));

    if dir.exists() && !(options.reuse_checkouts && is_work_tree(&dir)) {
        tracing::debug!(dir = %dir.display(), "removing stale checkout");
        fs::remove_dir_all(&dir)
            .with_context(|| format!("Failed to remove {}", dir.display()))?;
    }

    if !is_work_tree(&dir) {
        tracing::info!(repo = %options.repo, dir = %dir.display(), "cloning");
        let target = dir.to_string_lossy();
        run_git(None, &["clone", "--no-checkout", &options.repo, &target])?;
    }

    let commit = resolve_commit(&dir, revision)?;
    run_git(Some(&dir), &["checkout", "--force", "--detach", &commit])?;
    tracing::debug!(revision, commit = %commit, dir = %dir.display(), "checked out");

    dir.canonicalize()
        .with_context(|| format!("Failed to resolve {}", dir.display()))
}

/// Resolve `revision` to a full commit id inside the clone at `dir`.
///
/// Full commit ids present locally are used as is. Anything else (branches,
/// tags) is fetched from `origin` so reused checkouts follow the remote;
/// when the fetch fails the local and `origin/` refs are tried.
fn resolve_commit(dir: &Path, revision: &str) -> anyhow::Result<String> {
    if is_full_hash(revision) {
        if let Some(commit) = rev_parse(dir, revision) {
            return Ok(commit);
        }
    }

    match run_git(Some(dir), &["fetch", "--quiet", "origin", revision]) {
        Ok(_) => {
            if let Some(commit) = rev_parse(dir, "FETCH_HEAD") {
                return Ok(commit);
            }
        }
        Err(e) => tracing::debug!(revision, error = %e, "fetch failed, trying local refs"),
    }

    let remote = format!("origin/{}", revision);
    let found = [revision, remote.as_str()]
        .into_iter()
        .find_map(|candidate| rev_parse(dir, candidate))
        .with_context(|| format!("Revision '{}' not found in {}", revision, dir.display()));
    found
}

fn rev_parse(dir: &Path, revision: &str) -> Option<String> {
    let spec = format!("{}^{{commit}}", revision);
    run_git(Some(dir), &["rev-parse", "--verify", "--quiet", &spec])
        .ok()
        .map(|out| out.trim().to_string())
        .filter(|commit| !commit.is_empty())
}

fn is_full_hash(revision: &str) -> bool {
    matches!(revision.len(), 40 | 64) && revision.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reject revisions git would read as options or that cannot name a ref.
pub fn validate_revision(revision: &str) -> anyhow::Result<()> {
    if revision.is_empty() {
        bail!("Revision must not be empty");
    }
    if revision.starts_with('-') {
        bail!("Invalid revision '{}': must not start with '-'", revision);
    }
    if revision.chars().any(char::is_whitespace) {
        bail!("Invalid revision '{}': must not contain whitespace", revision);
    }
    Ok(())
}

/// Directory name for a checkout of `revision`.
pub fn checkout_name(repo: &str, revision: &str) -> String {
    format!("{}-{}", repo_name(repo), short_revision(revision))
}

/// Last path component of a clone URL, without `.git`.
pub fn repo_name(repo: &str) -> String {
    let trimmed = repo.trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

/// Abbreviated, filesystem-safe form of a revision.
///
/// Full commit hashes are cut to 12 characters. Branch and tag names keep
/// their length; when characters had to be replaced, a hash of the raw name
/// is appended so `release/3.0` and `release-3.0` stay distinct.
pub fn short_revision(revision: &str) -> String {
    let is_hash = revision.len() > 12 && revision.chars().all(|c| c.is_ascii_hexdigit());
    if is_hash {
        return revision[..12].to_string();
    }

    let safe: String = revision
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if safe == revision {
        safe
    } else {
        format!("{}-{:08x}", safe, xxh3_64(revision.as_bytes()) as u32)
    }
}

fn is_work_tree(dir: &Path) -> bool {
    dir.join(".git").exists()
}

fn run_git(dir: Option<&Path>, args: &[&str]) -> anyhow::Result<String> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let output = command
        .args(args)
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
