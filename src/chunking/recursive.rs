//! Recursive character splitting.
//!
//! Text is split on the coarsest separator that occurs in it. Pieces that still
//! exceed the chunk size are split again with the next separator; pieces that
//! fit are merged greedily back up to the chunk size, keeping an overlap
//! window between neighbours. Lengths are measured in characters.

use super::{Chunker, ChunkingConfig, DEFAULT_SEPARATORS};
use crate::error::{LexwiseError, Result};

/// Recursive character text splitter.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter with the default separators.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        Self::with_separators(config, DEFAULT_SEPARATORS)
    }

    /// Create a splitter with custom separators, tried in order.
    pub fn with_separators(config: ChunkingConfig, separators: &[&str]) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(LexwiseError::Chunking(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(LexwiseError::Chunking(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self {
            config,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();

        // Coarsest separator present in the text; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut finer: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut fitting: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily join pieces up to the chunk size, carrying an overlap window.
    ///
    /// Separators are already attached to the pieces, so they are joined as-is.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut merged = Vec::new();
        let mut window: std::collections::VecDeque<(&str, usize)> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > size && !window.is_empty() {
                push_joined(&mut merged, window.iter().map(|(s, _)| *s));

                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.as_str(), len));
            total += len;
        }

        push_joined(&mut merged, window.iter().map(|(s, _)| *s));
        merged
    }
}

impl Chunker for RecursiveSplitter {
    fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.split_recursive(text, &self.separators))
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined<'a>(out: &mut Vec<String>, parts: impl Iterator<Item = &'a str>) {
    let joined: String = parts.collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split on `separator`, attaching it to the start of each following piece.
/// An empty separator splits into characters. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(|c| c.to_string()).collect();
    }

    let mut pieces = Vec::new();
    for (i, part) in text.split(separator).enumerate() {
        let piece = if i == 0 {
            part.to_string()
        } else {
            format!("{}{}", separator, part)
        };
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
    pieces
}
