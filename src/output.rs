//! CLI output formatting.
//!
//! Batch results print as a two-level report: a header line per item
//! (3-digit position + operation tag) with indented context lines for the
//! written path, metadata summary, or error. A count summary closes the
//! report.
//!
//! ```text
//! 001 resize-image
//!     Saved: /out/dawn-800.png
//! 002 get-image-metadata
//!     1920x1080 jpeg, 245301 bytes
//! 003 rotate-image FAILED
//!     Error: Unknown tool: rotate-image
//!
//! 2 succeeded, 1 failed
//! ```
//!
//! `format_*` functions are pure and return lines for testability; `print_*`
//! wrappers write to stdout.

use crate::batch::{BatchItem, BatchOutcome};
use crate::metadata::ImageMetadata;
use crate::ops::OperationOutput;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn summary_line(meta: &ImageMetadata) -> String {
    format!(
        "    {}x{} {}, {} bytes",
        meta.width, meta.height, meta.format, meta.size
    )
}

/// Render a full batch report, one entry per outcome, submission order.
pub fn format_batch_report(items: &[BatchItem], outcomes: &[BatchOutcome]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0usize;

    for (pos, (item, outcome)) in items.iter().zip(outcomes).enumerate() {
        if outcome.success {
            lines.push(format!("{} {}", format_index(pos + 1), item.tool_name));
            match &outcome.result {
                Some(OperationOutput::Path(path)) => {
                    lines.push(format!("    Saved: {}", path.display()));
                }
                Some(OperationOutput::Metadata(meta)) => lines.push(summary_line(meta)),
                None => {}
            }
        } else {
            failed += 1;
            lines.push(format!(
                "{} {} FAILED",
                format_index(pos + 1),
                item.tool_name
            ));
            if let Some(error) = &outcome.error {
                lines.push(format!("    Error: {error}"));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("{} succeeded, {} failed", outcomes.len() - failed, failed));
    lines
}

/// Print a batch report to stdout.
pub fn print_batch_report(items: &[BatchItem], outcomes: &[BatchOutcome]) {
    for line in format_batch_report(items, outcomes) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(tool: &str) -> BatchItem {
        serde_json::from_value(json!({"toolName": tool, "options": {}})).unwrap()
    }

    fn success_path(path: &str) -> BatchOutcome {
        BatchOutcome {
            success: true,
            result: Some(OperationOutput::Path(path.into())),
            error: None,
            index: None,
        }
    }

    fn failure(index: usize, error: &str) -> BatchOutcome {
        BatchOutcome {
            success: false,
            result: None,
            error: Some(error.to_string()),
            index: Some(index),
        }
    }

    #[test]
    fn report_lists_entries_in_order_with_summary() {
        let items = vec![item("resize-image"), item("rotate-image")];
        let outcomes = vec![
            success_path("/out/a.png"),
            failure(1, "Unknown tool: rotate-image"),
        ];

        let lines = format_batch_report(&items, &outcomes);
        assert_eq!(lines[0], "001 resize-image");
        assert_eq!(lines[1], "    Saved: /out/a.png");
        assert_eq!(lines[2], "002 rotate-image FAILED");
        assert_eq!(lines[3], "    Error: Unknown tool: rotate-image");
        assert_eq!(lines.last().unwrap(), "1 succeeded, 1 failed");
    }

    #[test]
    fn metadata_outcome_renders_summary_line() {
        let meta = ImageMetadata {
            filename: "x.jpg".into(),
            path: "/p/x.jpg".into(),
            size: 999,
            format: "jpeg".into(),
            width: 64,
            height: 32,
            resolution: None,
            color_space: Some("srgb".into()),
            orientation: None,
        };
        let items = vec![item("get-image-metadata")];
        let outcomes = vec![BatchOutcome {
            success: true,
            result: Some(OperationOutput::Metadata(meta)),
            error: None,
            index: None,
        }];

        let lines = format_batch_report(&items, &outcomes);
        assert_eq!(lines[1], "    64x32 jpeg, 999 bytes");
    }

    #[test]
    fn empty_batch_report_is_just_the_summary() {
        let lines = format_batch_report(&[], &[]);
        assert_eq!(lines, vec![String::new(), "0 succeeded, 0 failed".to_string()]);
    }
}
