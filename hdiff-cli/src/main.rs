//! hdiff CLI - Compare the public C header API of two source trees
//!
//! Reports functions, records and fields that were added, removed or
//! resized between two revisions of a C library (libvlc by default).

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod git;
mod output;

use commands::*;
use commands::diff::TreeSource;
use config::HdiffConfig;
use git::SourceOptions;
use output::OutputFormat;

/// Structural diff of a C library's public headers.
#[derive(Parser)]
#[command(name = "hdiff")]
#[command(author, version)]
#[command(about = "Structural diff of a C library's public headers")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  hdiff diff 3.0.x master           Compare two libvlc revisions
  hdiff compare vlc-3.0/ vlc-4.0/   Compare two local trees
  hdiff parse vlc/ --format json    Dump the parsed API surface")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check out two revisions and diff their headers
    Diff {
        /// Baseline revision (commit, tag or branch)
        old_rev: String,

        /// Revision compared against the baseline
        new_rev: String,

        /// Repository to clone (URL or local path)
        #[arg(long)]
        repo: Option<String>,

        /// Directory holding the checkouts
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Entry header, relative to the tree root
        #[arg(long)]
        header: Option<String>,

        /// Compare symbols marked deprecated too
        #[arg(long)]
        include_deprecated: bool,

        /// Ignore documentation changes
        #[arg(long)]
        no_comments: bool,

        /// Reclone instead of reusing existing checkouts
        #[arg(long)]
        fresh: bool,

        /// Exit with status 1 when differences are found
        #[arg(long)]
        exit_code: bool,
    },

    /// Diff the headers of two local source trees
    Compare {
        /// Baseline tree
        old_dir: PathBuf,

        /// Tree compared against the baseline
        new_dir: PathBuf,

        /// Entry header, relative to the tree root
        #[arg(long)]
        header: Option<String>,

        /// Compare symbols marked deprecated too
        #[arg(long)]
        include_deprecated: bool,

        /// Ignore documentation changes
        #[arg(long)]
        no_comments: bool,

        /// Exit with status 1 when differences are found
        #[arg(long)]
        exit_code: bool,
    },

    /// Parse one tree and print its API surface
    Parse {
        /// Tree root
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Entry header, relative to the tree root
        #[arg(long)]
        header: Option<String>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = HdiffConfig::load(Path::new("."));

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    match config.use_color() {
        Some(use_color) => colored::control::set_override(use_color),
        None if !output::is_tty() => colored::control::set_override(false),
        None => {}
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    let (has_differences, exit_code) = match command {
        Commands::Diff {
            old_rev,
            new_rev,
            repo,
            workdir,
            header,
            include_deprecated,
            no_comments,
            fresh,
            exit_code,
        } => {
            let source = TreeSource::Git {
                options: SourceOptions {
                    repo: repo.unwrap_or_else(|| config.repo().to_string()),
                    workdir: workdir.unwrap_or_else(|| config.workdir()),
                    reuse_checkouts: !fresh && config.reuse_checkouts(),
                },
                old_rev,
                new_rev,
            };
            let differs = diff::run(
                source,
                config.parser_options(header.as_deref()),
                config.diff_options(include_deprecated, no_comments),
                format,
            )
            .await?;
            (differs, exit_code)
        }

        Commands::Compare {
            old_dir,
            new_dir,
            header,
            include_deprecated,
            no_comments,
            exit_code,
        } => {
            let source = TreeSource::Local { old_dir, new_dir };
            let differs = diff::run(
                source,
                config.parser_options(header.as_deref()),
                config.diff_options(include_deprecated, no_comments),
                format,
            )
            .await?;
            (differs, exit_code)
        }

        Commands::Parse { dir, header } => {
            parse::run(dir, config.parser_options(header.as_deref()), format).await?;
            (false, false)
        }
    };

    if exit_code && has_differences {
        std::process::exit(1);
    }

    Ok(())
}
