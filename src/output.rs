//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every item leads with its positional index and source name, with the
//! details of what was produced shown as indented context lines. Failures use
//! the same header so a run reads as a list of the inputs in order.
//!
//! # Output Format
//!
//! ## Resize
//!
//! ```text
//! Resizing 3 images
//! 001 beach.jpg → beach-400x300.jpeg
//!     400x300 JPEG, 41.2 KB, quality 0.75
//!     Target: 40.0 KB, converged after 4 attempts
//!     Saved: out/beach-400x300.jpeg
//! 002 broken.jpg
//!     Failed: Failed to decode broken.jpg: ...
//! 003 logo.png → logo-200x100.png
//!     200x100 PNG, 3.1 KB
//!     Export failed: ...
//!
//! 2 of 3 processed
//! ```
//!
//! ## Estimate
//!
//! ```text
//! 400x300 at medium quality: ~17.6 KB
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns lines) for testability and
//! a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::batch::{BatchEvent, BatchReport};
use crate::estimate::Estimate;
use crate::imaging::{QualityPreset, SeekStatus};
use crate::types::{ArtifactInfo, SeekReport};
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_kb(bytes: usize) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// `400x300 JPEG, 41.2 KB, quality 0.75`
fn artifact_detail(artifact: &ArtifactInfo) -> String {
    let mut line = format!(
        "{}x{} {}, {}",
        artifact.width,
        artifact.height,
        artifact.format,
        format_kb(artifact.byte_size)
    );
    if let Some(quality) = artifact.quality {
        line.push_str(&format!(", quality {quality:.2}"));
    }
    line
}

/// `Target: 40.0 KB, converged after 4 attempts`
fn seek_detail(seek: &SeekReport) -> String {
    let outcome = match seek.status {
        SeekStatus::Converged => "converged",
        SeekStatus::Saturated => "quality limit reached",
        SeekStatus::CapExceeded => "gave up, kept last attempt",
    };
    format!(
        "Target: {:.1} KB, {} after {}",
        seek.target_kb,
        outcome,
        plural(seek.iterations as usize, "attempt")
    )
}

// ============================================================================
// Resize output
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => vec![format!("Resizing {}", plural(*total, "image"))],
        BatchEvent::ItemDone {
            index,
            name,
            artifact,
            export,
            ..
        } => {
            let mut lines = vec![
                format!(
                    "{} {} \u{2192} {}",
                    format_index(*index),
                    name,
                    artifact.file_name
                ),
                format!("{}{}", indent(1), artifact_detail(artifact)),
            ];
            if let Some(seek) = &artifact.seek {
                lines.push(format!("{}{}", indent(1), seek_detail(seek)));
            }
            match export {
                Ok(path) => lines.push(format!("{}Saved: {}", indent(1), path.display())),
                Err(e) => lines.push(format!("{}Export failed: {}", indent(1), e)),
            }
            lines
        }
        BatchEvent::ItemFailed {
            index, name, error, ..
        } => vec![
            format!("{} {}", format_index(*index), name),
            format!("{}Failed: {}", indent(1), error),
        ],
    }
}

/// Format the end-of-run summary.
pub fn format_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![report.to_string()];
    let export_failures = report.export_failures();
    if export_failures > 0 {
        lines.push(format!(
            "{}{} not saved",
            indent(1),
            plural(export_failures, "image")
        ));
    }
    lines
}

pub fn print_summary(report: &BatchReport) {
    println!();
    for line in format_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Estimate output
// ============================================================================

/// Format a display estimate for a given output size.
pub fn format_estimate(width: u32, height: u32, preset: QualityPreset, estimate: &Estimate) -> String {
    format!(
        "{}x{} at {} quality: ~{:.1} KB",
        width, height, preset, estimate.estimated_kb
    )
}

// ============================================================================
// JSON report
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    processed: usize,
    total: usize,
    items: Vec<JsonItem<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonItem<'a> {
    index: usize,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<&'a ArtifactInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_error: Option<String>,
}

/// Machine-readable run report (pretty-printed JSON).
pub fn report_json(report: &BatchReport) -> serde_json::Result<String> {
    let items = report
        .items
        .iter()
        .map(|item| match &item.outcome {
            Ok(processed) => JsonItem {
                index: item.index,
                name: &item.name,
                artifact: Some(&processed.artifact),
                saved_to: processed
                    .export
                    .as_ref()
                    .ok()
                    .map(|r| r.destination.as_path()),
                error: None,
                export_error: processed.export.as_ref().err().map(|e| e.to_string()),
            },
            Err(e) => JsonItem {
                index: item.index,
                name: &item.name,
                artifact: None,
                saved_to: None,
                error: Some(e.to_string()),
                export_error: None,
            },
        })
        .collect();

    serde_json::to_string_pretty(&JsonReport {
        processed: report.succeeded(),
        total: report.total(),
        items,
    })
}
