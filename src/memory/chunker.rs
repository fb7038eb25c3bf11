//! Paragraph-aware text chunking for document ingestion
//!
//! Long documents are split on blank lines into paragraphs, which are then
//! packed greedily into chunks no longer than `max_size` characters. A
//! paragraph that alone exceeds the bound is cut into fixed-size slices.
//!
//! Lengths are counted in characters, never bytes, so a slice boundary can
//! not land inside a multi-byte UTF-8 sequence.

use serde::Serialize;

/// Separator placed between paragraphs packed into the same chunk.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A positional slice of an ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position of the chunk in the document (0-based)
    pub index: usize,
    /// Chunk text, at most `max_size` characters
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the chunk holds no text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Split `text` into ordered chunks of at most `max_size` characters.
///
/// Returns an empty vector for empty or whitespace-only input. A `max_size`
/// of zero is treated as one.
pub fn chunk_text(text: &str, max_size: usize) -> Vec<Chunk> {
    let max_size = max_size.max(1);
    let separator_len = PARAGRAPH_SEPARATOR.chars().count();

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let paragraph_len = paragraph.chars().count();

        if current_len > 0 && current_len + paragraph_len + separator_len <= max_size {
            current.push_str(PARAGRAPH_SEPARATOR);
            current.push_str(paragraph);
            current_len += paragraph_len + separator_len;
            continue;
        }

        if current_len > 0 {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if paragraph_len <= max_size {
            current.push_str(paragraph);
            current_len = paragraph_len;
        } else {
            pieces.extend(hard_split(paragraph, max_size));
        }
    }

    if current_len > 0 {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// Cut an oversized paragraph into successive `max_size`-character slices.
fn hard_split(paragraph: &str, max_size: usize) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    chars
        .chunks(max_size)
        .map(|slice| slice.iter().collect())
        .collect()
}
