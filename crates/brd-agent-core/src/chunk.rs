//! Overlapping fixed-window text chunker.
//!
//! Splits document content into windows of `size` characters that advance by
//! `size - overlap`, so consecutive chunks share `overlap` characters of
//! context. Character (not byte) indexing keeps the windows UTF-8 safe.
//!
//! # Algorithm
//!
//! 1. Start at character offset 0.
//! 2. Emit `text[offset .. offset + size]` (clamped to the end of the text).
//! 3. Advance the offset by `size - overlap` and repeat.
//! 4. Stop once the remaining tail is already covered by the previous
//!    window — a final window starting inside the last `overlap` characters
//!    would be wholly contained in its predecessor and is not emitted.
//!
//! Empty input produces no chunks. A final partial window shorter than
//! `size` is still emitted. Deterministic; pure function of its inputs.

use crate::models::Chunk;

/// Split `text` into overlapping character windows.
///
/// `size` must be greater than `overlap`; both are counts of characters.
/// For a text of `L > overlap` characters the chunk count is
/// `ceil((L - overlap) / (size - overlap))`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    assert!(size > overlap, "chunk size must exceed overlap");

    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character boundary, plus the end of the text,
    // so char-indexed windows can slice without scanning repeatedly.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let total_chars = bounds.len() - 1;

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        if start > 0 && start + overlap >= total_chars {
            // Tail already covered by the previous window.
            break;
        }
        let end = (start + size).min(total_chars);
        chunks.push(Chunk {
            text: text[bounds[start]..bounds[end]].to_string(),
            offset: start,
        });
        start += step;
    }

    chunks
}
