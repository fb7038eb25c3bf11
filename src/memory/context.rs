//! Context block assembly for completion prompts
//!
//! Records are expected to arrive ranked, most relevant first. The assembler
//! keeps that order, skips records without text and caps the number of
//! lines; it never cuts a line short.

use super::record::{value_to_text, MemoryRecord};
use serde_json::Value;

/// Format up to `cap` records as a bulleted context block.
///
/// Each line reads `- [source: <S>] <text>` when the record's metadata names
/// a source, otherwise `- <text>`. Returns an empty string when no record is
/// eligible.
pub fn assemble_context(records: &[MemoryRecord], cap: usize) -> String {
    records
        .iter()
        .filter(|r| !r.text.trim().is_empty())
        .take(cap)
        .map(format_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_line(record: &MemoryRecord) -> String {
    match record.metadata_value("source").and_then(source_label) {
        Some(source) => format!("- [source: {}] {}", source, record.text),
        None => format!("- {}", record.text),
    }
}

fn source_label(value: &Value) -> Option<String> {
    if super::record::is_present(value) {
        Some(value_to_text(value))
    } else {
        None
    }
}
