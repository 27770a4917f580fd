//! JSON output formatting for machine-readable output.

use super::OutputConfig;
use serde::Serialize;

/// JSON output formatter
pub struct JsonOutput;

impl JsonOutput {
    /// Format data as JSON string
    ///
    /// Uses pretty-printing by default. When `config.compact` is true,
    /// outputs minified JSON on a single line.
    pub fn format<T: Serialize + ?Sized>(data: &T, config: &OutputConfig) -> String {
        if config.compact {
            serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string_pretty(data)
                .unwrap_or_else(|e| format!("{{\n  \"error\": \"{}\"\n}}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[derive(Serialize)]
    struct Sizes {
        record: String,
        old: u64,
        new: u64,
    }

    fn sample() -> Sizes {
        Sizes {
            record: "libvlc_media_stats_t".to_string(),
            old: 8,
            new: 12,
        }
    }

    #[test]
    fn test_format_pretty() {
        let config = OutputConfig::new(OutputFormat::Json);
        let output = JsonOutput::format(&sample(), &config);

        assert!(output.contains("\"record\""));
        assert!(output.contains("\"libvlc_media_stats_t\""));
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_format_compact() {
        let config = OutputConfig {
            compact: true,
            ..OutputConfig::new(OutputFormat::Json)
        };
        let output = JsonOutput::format(&sample(), &config);

        assert_eq!(output, r#"{"record":"libvlc_media_stats_t","old":8,"new":12}"#);
    }
}
