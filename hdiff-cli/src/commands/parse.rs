//! Parse command - show the API surface of one tree

use std::path::PathBuf;
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use hdiff_core::{DeclarationModel, ParserOptions};

use super::diff::{create_spinner, parse_in_background};
use crate::output::{truncate, JsonOutput, Output, OutputConfig, OutputFormat, Outputter};

const SIGNATURE_WIDTH: usize = 100;

/// A parsed tree. JSON output is the model itself.
#[derive(Debug, Serialize)]
pub struct ParseResult {
    pub model: DeclarationModel,
    pub duration_ms: u64,
}

impl Outputter for ParseResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let model = &self.model;
        let opaque = model.records.iter().filter(|r| r.is_opaque()).count();
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} ({})\n",
            "PARSE:".cyan().bold(),
            model.root.yellow(),
            model.entry_header
        ));
        output.push_str(&format!(
            "{} headers, {} declarations: {} functions, {} records ({} opaque) ({}ms)\n",
            model.headers.len().to_string().cyan(),
            model.declaration_count(),
            model.functions.len().to_string().cyan(),
            model.records.len().to_string().cyan(),
            opaque,
            self.duration_ms
        ));

        output.push_str(&format!("\n{}:\n", "HEADERS".bold()));
        for header in &model.headers {
            output.push_str(&format!("  {}\n", header.dimmed()));
        }

        if !model.functions.is_empty() {
            output.push_str(&format!("\n{} ({}):\n", "FUNCTIONS".bold(), model.functions.len()));
            for function in &model.functions {
                output.push_str(&format!(
                    "  {}\n",
                    truncate(&function.signature(), SIGNATURE_WIDTH)
                ));
            }
        }

        if !model.records.is_empty() {
            output.push_str(&format!("\n{} ({}):\n", "RECORDS".bold(), model.records.len()));
            for record in &model.records {
                let shape = if record.is_opaque() {
                    "opaque".to_string()
                } else {
                    format!(
                        "{} bytes, {} fields",
                        record.size_in_bytes,
                        record.fields.len()
                    )
                };
                output.push_str(&format!(
                    "  {} {} {}\n",
                    record.kind.as_str().dimmed(),
                    record.name.green(),
                    format!("({})", shape).dimmed()
                ));
            }
        }

        output
    }

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(&self.model, config)
    }
}

/// Run the parse command
pub async fn run(dir: PathBuf, parser: ParserOptions, format: OutputFormat) -> anyhow::Result<()> {
    let start = Instant::now();

    let spinner = create_spinner();
    spinner.set_message("Parsing headers...");
    let model = parse_in_background(dir, parser).await;
    spinner.finish_and_clear();

    let result = ParseResult {
        model: model?,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    Output::new(result, format).render()
}
