//! Splitting long documents into model-sized chunks.

use crate::loader::Document;

/// Break points, most preferred first. Cuts land just after the separator.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "? ", "! ", "; ", ", ", " "];

/// Character-budgeted splitter that prefers natural boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_chars: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(12_000, 200)
    }
}

impl TextSplitter {
    /// `overlap` is clamped to half of `chunk_chars`.
    pub fn new(chunk_chars: usize, overlap: usize) -> Self {
        let chunk_chars = chunk_chars.max(1);
        Self {
            chunk_chars,
            overlap: overlap.min(chunk_chars / 2),
        }
    }

    pub fn chunk_chars(&self) -> usize {
        self.chunk_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into trimmed, non-empty chunks of at most `chunk_chars` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        let len = text.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let window_end = advance_chars(text, start, self.chunk_chars);
            let cut = if window_end >= len {
                len
            } else {
                self.find_cut(text, start, window_end)
            };

            let chunk = text[start..cut].trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if cut >= len {
                break;
            }

            let mut next = retreat_chars(text, cut, self.overlap);
            if self.overlap > 0 {
                next = snap_to_word_start(text, next, cut);
            }
            start = if next > start { next } else { cut };
        }

        chunks
    }

    /// Split each document, keeping its page number on every chunk.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split(&doc.content).into_iter().map(move |content| Document {
                    content,
                    page: doc.page,
                })
            })
            .collect()
    }

    /// Best cut in `[start + chunk/2, window_end]`, falling back to a hard cut.
    fn find_cut(&self, text: &str, start: usize, window_end: usize) -> usize {
        let min_cut = advance_chars(text, start, self.chunk_chars / 2);
        if min_cut >= window_end {
            return window_end;
        }
        let window = &text[min_cut..window_end];
        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                return min_cut + pos + sep.len();
            }
        }
        window_end
    }
}

/// Byte offset `n` characters after `from` (clamped to the end).
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte offset `n` characters before `from` (clamped to the start).
fn retreat_chars(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Move `pos` forward to the start of the next word, unless already at one.
fn snap_to_word_start(text: &str, pos: usize, limit: usize) -> usize {
    let at_word_start = text[..pos]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace);
    if at_word_start {
        return pos;
    }
    text[pos..limit]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| pos + i + c.len_utf8())
        .unwrap_or(pos)
}
