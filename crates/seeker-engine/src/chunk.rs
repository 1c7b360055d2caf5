use anyhow::{bail, Result};

/// Fixed-size character chunker with overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if overlap >= size {
            bail!("chunk overlap ({}) must be smaller than chunk size ({})", overlap, size);
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into windows of `size` chars, each starting `size - overlap` after the last.
    /// Counts chars, not bytes, so multi-byte UTF-8 never gets cut mid-codepoint.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}
