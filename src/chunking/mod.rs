//! Splitting transcripts into overlapping word windows.

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default number of words shared by consecutive chunks.
pub const DEFAULT_OVERLAP: usize = 200;

/// Split `text` into windows of `chunk_size` whitespace-separated words.
///
/// Consecutive windows start `chunk_size - overlap` words apart (at least
/// one), so each window repeats the tail of the previous one. The final
/// window may be shorter than `chunk_size`.
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        start += step;
    }

    chunks
}
