//! Byte ↔ char offset conversion for one chunk of text.
//!
//! Regex matches come back as byte offsets while candidates and recognizer
//! results are counted in characters.

#[derive(Debug, Clone)]
pub(crate) struct CharMap {
    /// Byte offset of each char start, plus the text length as a sentinel
    starts: Vec<usize>,
}

impl CharMap {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        starts.push(text.len());
        Self { starts }
    }

    /// Number of characters.
    pub(crate) fn char_len(&self) -> usize {
        self.starts.len() - 1
    }

    /// Char index of a byte offset that lies on a char boundary.
    pub(crate) fn to_char(&self, byte: usize) -> Option<usize> {
        self.starts.binary_search(&byte).ok()
    }

    /// Byte offset of a char index (the text length for `char_len()`).
    pub(crate) fn to_byte(&self, ch: usize) -> Option<usize> {
        self.starts.get(ch).copied()
    }
}
