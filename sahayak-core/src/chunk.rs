//! Text chunking for retrieval.
//!
//! Splits extracted document text into bounded-length chunks with a fixed
//! overlap, preferring paragraph, then line, then sentence, then word
//! boundaries. Lengths are measured in characters, not bytes; the corpus
//! includes Devanagari and other multibyte scripts.

use serde::{Deserialize, Serialize};

/// A retrievable slice of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub chunk_index: usize,
}

/// Chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Boundary preference, most to least desirable.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_separators() -> Vec<String> {
    vec!["\n\n".into(), "\n".into(), ". ".into(), " ".into()]
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
        }
    }
}

/// Split `text` into chunks according to `config`.
///
/// Pieces are cut at the highest-preference separator that keeps them under
/// `chunk_size`, then merged greedily; when a chunk fills up, up to
/// `chunk_overlap` trailing characters carry into the next one, shrunk so
/// no chunk ever exceeds `chunk_size`. Separators stay attached to the
/// preceding piece; chunk text is trimmed.
pub fn split_text(document_id: &str, text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    if text.trim().is_empty() {
        return chunks;
    }

    let size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(size.saturating_sub(1));
    let pieces = split_pieces(text, &config.separators, size, overlap);

    let mut current = String::new();
    let mut current_len = 0usize;
    for piece in pieces {
        let piece_len = char_len(&piece);
        if current_len > 0 && current_len + piece_len > size {
            push_chunk(&mut chunks, document_id, &current);
            // The carry shrinks so tail + piece still fits the cap.
            let carry = overlap.min(size.saturating_sub(piece_len));
            let tail = overlap_tail(&current, carry);
            current_len = char_len(&tail);
            current = tail;
        }
        current.push_str(&piece);
        current_len += piece_len;
    }
    push_chunk(&mut chunks, document_id, &current);

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Cut `text` into pieces no longer than `max_len` characters, trying each
/// separator in order and recursing into oversized pieces with the
/// remaining separators. When no separator is left, falls back to
/// fixed-length slices short enough to leave room for the carried overlap.
fn split_pieces(text: &str, separators: &[String], max_len: usize, overlap: usize) -> Vec<String> {
    if char_len(text) <= max_len {
        return vec![text.to_string()];
    }
    let Some((sep, rest)) = separators.split_first() else {
        return fixed_slices(text, max_len.saturating_sub(overlap).max(1));
    };

    let mut pieces = Vec::new();
    for part in text.split_inclusive(sep.as_str()) {
        if char_len(part) <= max_len {
            pieces.push(part.to_string());
        } else {
            pieces.extend(split_pieces(part, rest, max_len, overlap));
        }
    }
    pieces
}

fn fixed_slices(text: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|c| c.iter().collect())
        .collect()
}

/// The last `overlap` characters of `text`, or nothing when the text is not
/// longer than the overlap (carrying the whole chunk forward would just
/// duplicate it).
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return String::new();
    }
    chars[chars.len() - overlap..].iter().collect()
}

fn push_chunk(chunks: &mut Vec<Chunk>, document_id: &str, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    let chunk_index = chunks.len();
    chunks.push(Chunk {
        id: format!("{document_id}-chunk-{chunk_index}"),
        document_id: document_id.to_string(),
        text: trimmed.to_string(),
        chunk_index,
    });
}
