//! Overlapping-window text chunker.
//!
//! Splits document body text into [`Chunk`]s of at most `max_chars`
//! characters, carrying `overlap_chars` from the tail of each chunk into
//! the next so that content near a boundary stays retrievable from both
//! sides.
//!
//! Window boundaries prefer semantic separators before falling back to a
//! hard cut: paragraph break (`\n\n`), then sentence end (`. `), then word
//! boundary (space), then a cut snapped to the nearest UTF-8 character
//! boundary. The result is deterministic for identical input and
//! configuration.
//!
//! Each chunk id is `{source_id}_{index}` with contiguous indices starting
//! at 0, so re-ingesting the same document addresses the same ids. The
//! chunk hash is the SHA-256 of its text.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split `text` into overlapping chunks of at most `max_chars` characters.
///
/// Whitespace-only input yields no chunks. Every non-whitespace character
/// of the input appears in at least one chunk; each chunk is trimmed of
/// surrounding whitespace before storage.
pub fn chunk_text(source_id: &str, text: &str, max_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    if text.trim().is_empty() {
        return chunks;
    }

    let len = text.len();
    let mut index: i64 = 0;
    let mut start = 0usize;

    while start < len {
        let hard_end = snap_down(text, (start + max_chars).min(len));
        let mut end = if hard_end <= start {
            // A single character wider than the window; take it whole.
            next_boundary(text, start)
        } else {
            hard_end
        };

        if end < len {
            end = start + split_point(&text[start..end]);
        }

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            chunks.push(make_chunk(source_id, index, piece));
            index += 1;
        }

        if end >= len {
            break;
        }

        // Carry the overlap back from the window end; always move forward.
        let mut next = snap_down(text, end.saturating_sub(overlap_chars));
        if next <= start {
            next = end;
        }
        start = next;
    }

    chunks
}

/// Pick the split offset within a full window, preferring a paragraph
/// break, then a sentence end, then a word boundary. Falls back to the
/// window length when no separator exists.
fn split_point(window: &str) -> usize {
    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return pos + 2;
        }
    }
    if let Some(pos) = window.rfind(". ") {
        if pos > 0 {
            return pos + 2;
        }
    }
    if let Some(pos) = window.rfind(char::is_whitespace) {
        if pos > 0 {
            return pos + 1;
        }
    }
    window.len()
}

/// Snap a byte index down to the nearest valid UTF-8 character boundary.
fn snap_down(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte index just past the character starting at `index`.
fn next_boundary(s: &str, index: usize) -> usize {
    let mut i = index + 1;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i.min(s.len())
}

fn make_chunk(source_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}_{}", source_id, index),
        source_id: source_id.to_string(),
        index,
        text: text.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "doc1_0");
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        assert!(chunk_text("doc1", "   \n\n\t  ", 500, 50).is_empty());
        assert!(chunk_text("doc1", "", 500, 50).is_empty());
    }

    #[test]
    fn ids_are_sequential_and_namespaced() {
        let text = "one two three four five six seven eight nine ten ".repeat(20);
        let chunks = chunk_text("runbook", &text, 100, 10);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.id, format!("runbook_{}", i));
            assert_eq!(c.index, i as i64);
            assert_eq!(c.source_id, "runbook");
        }
    }

    #[test]
    fn windows_respect_max_chars() {
        let text = "word ".repeat(400);
        for c in chunk_text("doc1", &text, 120, 20) {
            assert!(c.text.len() <= 120, "chunk too large: {}", c.text.len());
        }
    }

    #[test]
    fn hard_cut_carries_overlap() {
        // No separators anywhere: cuts are hard, so consecutive chunks
        // must share exactly the configured overlap region.
        let text = "0123456789".repeat(120);
        let chunks = chunk_text("doc1", &text, 500, 50);
        assert!(chunks.len() >= 2);
        let first = &chunks[0].text;
        let tail = &first[first.len() - 50..];
        assert!(chunks[1].text.starts_with(tail));
    }

    #[test]
    fn paragraph_boundary_preferred_over_hard_cut() {
        let text = format!("{}\n\n{}", "a".repeat(200), "b".repeat(200));
        let chunks = chunk_text("doc1", &text, 300, 0);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.chars().all(|c| c == 'a'));
        assert!(chunks[1].text.chars().all(|c| c == 'b'));
    }

    #[test]
    fn sentence_boundary_preferred_over_word_boundary() {
        let text = format!("{}. {}", "left sentence here", "right side words ".repeat(30));
        let chunks = chunk_text("doc1", &text, 40, 0);
        assert_eq!(chunks[0].text, "left sentence here.");
    }

    #[test]
    fn every_word_lands_in_some_chunk() {
        let text = (0..80)
            .map(|i| format!("token{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text("doc1", &text, 64, 8);
        let joined: String = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        for i in 0..80 {
            let token = format!("token{}", i);
            assert!(joined.contains(&token), "missing {}", token);
        }
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        let text = "日本語のテキストです。".repeat(40);
        let chunks = chunk_text("doc1", &text, 50, 10);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(!c.text.is_empty());
        }
    }

    #[test]
    fn deterministic_for_identical_input() {
        let text = "Alpha bravo charlie. Delta echo foxtrot.\n\nGolf hotel india.".repeat(10);
        let a = chunk_text("doc1", &text, 80, 16);
        let b = chunk_text("doc1", &text, 80, 16);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.text, y.text);
            assert_eq!(x.hash, y.hash);
        }
    }
}
