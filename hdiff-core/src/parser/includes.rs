//! Include closure discovery.
//!
//! Headers are visited depth-first in pre-order, so the entry header comes
//! first and every header precedes the headers it pulls in.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::ParserOptions;
use crate::error::{HdiffError, Result};

static INCLUDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*#[ \t]*include[ \t]*([<"])([^>"\n]+)[>"]"#).unwrap()
});

/// A header read from disk.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Path relative to the tree root, `/`-separated.
    pub path: String,
    pub source: String,
}

/// One `#include` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Include {
    pub name: String,
    /// `"x"` rather than `<x>`.
    pub quoted: bool,
}

/// Every `#include` in `source`, in order.
pub fn scan_includes(source: &str) -> Vec<Include> {
    INCLUDE_PATTERN
        .captures_iter(source)
        .map(|caps| Include {
            name: caps[2].trim().to_string(),
            quoted: &caps[1] == "\"",
        })
        .collect()
}

/// Read `entry` and, when enabled, every header it transitively includes.
pub fn discover(root: &Path, entry: &Path, options: &ParserOptions) -> Result<Vec<SourceFile>> {
    let root = canonical(root)?;
    let entry = canonical(entry)?;

    let mut walker = Walker {
        include_dirs: options.include_dirs.iter().map(|dir| root.join(dir)).collect(),
        root,
        follow: options.follow_includes,
        visited: HashSet::new(),
        files: Vec::new(),
    };
    walker.visit(entry)?;
    Ok(walker.files)
}

struct Walker {
    root: PathBuf,
    include_dirs: Vec<PathBuf>,
    follow: bool,
    visited: HashSet<PathBuf>,
    files: Vec<SourceFile>,
}

impl Walker {
    fn visit(&mut self, path: PathBuf) -> Result<()> {
        if !self.visited.insert(path.clone()) {
            return Ok(());
        }

        let source = fs::read_to_string(&path).map_err(|source| HdiffError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let includes = if self.follow {
            scan_includes(&source)
        } else {
            Vec::new()
        };

        self.files.push(SourceFile {
            path: self.relative(&path),
            source,
        });

        let dir = path.parent().map(Path::to_path_buf);
        for include in includes {
            match self.resolve(&include, dir.as_deref()) {
                Some(found) => self.visit(found)?,
                None => tracing::debug!(include = %include.name, "skipping unresolved include"),
            }
        }
        Ok(())
    }

    fn resolve(&self, include: &Include, including_dir: Option<&Path>) -> Option<PathBuf> {
        let local = including_dir
            .filter(|_| include.quoted)
            .map(|dir| dir.join(&include.name));

        local
            .into_iter()
            .chain(self.include_dirs.iter().map(|dir| dir.join(&include.name)))
            .find(|candidate| candidate.is_file())
            .and_then(|found| found.canonicalize().ok())
    }

    fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.display().to_string(),
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|source| HdiffError::Io {
        path: path.display().to_string(),
        source,
    })
}
