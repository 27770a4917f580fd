//! hdiff configuration loading from `.hdiffrc.toml`.
//!
//! Configuration is optional; every setting has a built-in default and every
//! command-line flag overrides the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! repo = "https://code.videolan.org/videolan/vlc.git"
//! workdir = ".hdiff/checkouts"
//! reuse_checkouts = true
//!
//! [parser]
//! entry_header = "include/vlc/libvlc.h"
//! include_dirs = ["include"]
//! follow_includes = true
//! strip_macros = ["LIBVLC_API", "LIBVLC_DEPRECATED"]
//! data_model = "lp64"
//!
//! [diff]
//! include_deprecated = false
//! include_comments = true
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use hdiff_core::{DataModel, DiffOptions, ParserOptions};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".hdiffrc.toml";

/// Repository checked out by `hdiff diff` when none is configured.
pub const DEFAULT_REPO: &str = "https://code.videolan.org/videolan/vlc.git";

/// Directory holding revision checkouts when none is configured.
pub const DEFAULT_WORKDIR: &str = ".hdiff/checkouts";

/// Root configuration structure loaded from `.hdiffrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct HdiffConfig {
    /// Where `hdiff diff` gets its trees from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Header parsing overrides.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Diff engine switches.
    #[serde(default)]
    pub diff: DiffConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Git source settings.
#[derive(Debug, Deserialize, Default)]
pub struct SourceConfig {
    /// Clone URL or local path of the repository.
    #[serde(default)]
    pub repo: Option<String>,

    /// Directory where per-revision checkouts are kept.
    #[serde(default)]
    pub workdir: Option<String>,

    /// Keep existing checkouts between runs.
    ///
    /// Default: `true`
    #[serde(default)]
    pub reuse_checkouts: Option<bool>,
}

/// Parser settings. Unset keys keep the parser defaults.
#[derive(Debug, Deserialize, Default)]
pub struct ParserConfig {
    #[serde(default)]
    pub entry_header: Option<String>,

    #[serde(default)]
    pub include_dirs: Option<Vec<String>>,

    #[serde(default)]
    pub follow_includes: Option<bool>,

    /// Replaces the default macro list entirely.
    #[serde(default)]
    pub strip_macros: Option<Vec<String>>,

    /// `lp64`, `llp64` or `ilp32`.
    #[serde(default)]
    pub data_model: Option<DataModel>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiffConfig {
    #[serde(default)]
    pub include_deprecated: Option<bool>,

    #[serde(default)]
    pub include_comments: Option<bool>,
}

/// Output formatting preferences.
///
/// Distinct from the runtime `OutputConfig` in the output module.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `table`, `json`
    #[serde(default)]
    pub format: Option<String>,

    /// Defaults to auto-detection when unset.
    #[serde(default)]
    pub color: Option<bool>,
}

impl HdiffConfig {
    /// Load configuration from `.hdiffrc.toml` in the given directory.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is
    /// logged and also yields defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Parser options with config values applied, then the `--header` flag.
    pub fn parser_options(&self, header: Option<&str>) -> ParserOptions {
        let mut options = ParserOptions::default();
        let parser = &self.parser;

        if let Some(entry) = &parser.entry_header {
            options.entry_header = entry.clone();
        }
        if let Some(dirs) = &parser.include_dirs {
            options.include_dirs = dirs.clone();
        }
        if let Some(follow) = parser.follow_includes {
            options.follow_includes = follow;
        }
        if let Some(macros) = &parser.strip_macros {
            options.strip_macros = macros.clone();
        }
        if let Some(model) = parser.data_model {
            options.data_model = model;
        }
        if let Some(header) = header {
            options.entry_header = header.to_string();
        }

        options
    }

    /// Diff options from flags, falling back to config, then defaults.
    ///
    /// Flags can only switch behaviour away from the default, so an unset
    /// flag defers to the config file.
    pub fn diff_options(&self, include_deprecated: bool, no_comments: bool) -> DiffOptions {
        let defaults = DiffOptions::default();
        DiffOptions {
            include_deprecated: include_deprecated
                || self
                    .diff
                    .include_deprecated
                    .unwrap_or(defaults.include_deprecated),
            include_comments: !no_comments
                && self
                    .diff
                    .include_comments
                    .unwrap_or(defaults.include_comments),
        }
    }

    pub fn repo(&self) -> &str {
        self.source.repo.as_deref().unwrap_or(DEFAULT_REPO)
    }

    pub fn workdir(&self) -> PathBuf {
        PathBuf::from(self.source.workdir.as_deref().unwrap_or(DEFAULT_WORKDIR))
    }

    pub fn reuse_checkouts(&self) -> bool {
        self.source.reuse_checkouts.unwrap_or(true)
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}
