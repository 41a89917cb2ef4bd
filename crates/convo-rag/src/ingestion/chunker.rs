//! Sentence-bounded text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;

use super::parser::ParsedDocument;

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    /// Page the chunk came from, when known
    pub page: Option<u32>,
    /// Position within the document
    pub index: u32,
}

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
            min_size: config.min_chunk_size,
        }
    }

    /// Chunk every page of a parsed document, numbering chunks document-wide
    pub fn chunk_document(&self, parsed: &ParsedDocument) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        for page in &parsed.pages {
            for text in self.chunk_text(&page.content) {
                chunks.push(TextChunk {
                    text,
                    page: page.page_number,
                    index: chunks.len() as u32,
                });
            }
        }
        chunks
    }

    /// Split text into chunks of at most `chunk_size` characters
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in self.split_into_pieces(text) {
            if !current.is_empty() && char_len(&current) + char_len(sentence) > self.chunk_size {
                self.push_chunk(&mut chunks, &current);
                current = self.get_overlap_text(&current);
                // Drop the overlap when it would not leave room for the sentence
                if char_len(&current) + char_len(sentence) > self.chunk_size {
                    current.clear();
                }
            }
            current.push_str(sentence);
        }

        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if char_len(trimmed) >= self.min_size && !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentence bounds, with sentences longer than a chunk hard-split
    fn split_into_pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if char_len(sentence) <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }
            let mut rest = sentence;
            while !rest.is_empty() {
                let end = rest
                    .char_indices()
                    .nth(self.chunk_size)
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                pieces.push(&rest[..end]);
                rest = &rest[end..];
            }
        }
        pieces
    }

    /// Tail of a chunk to carry into the next one, starting at a word boundary
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        let len = char_len(text);
        if len <= self.overlap {
            return text.to_string();
        }

        let start = text
            .char_indices()
            .nth(len - self.overlap)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let overlap_text = &text[start..];
        if text[..start].ends_with(char::is_whitespace) {
            return overlap_text.to_string();
        }

        // Prefer starting at a sentence boundary, then a word boundary
        if let Some(pos) = overlap_text.find(". ") {
            if !overlap_text[pos + 2..].trim().is_empty() {
                return overlap_text[pos + 2..].to_string();
            }
        }
        if let Some(pos) = overlap_text.find(' ') {
            return overlap_text[pos + 1..].to_string();
        }

        overlap_text.to_string()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
