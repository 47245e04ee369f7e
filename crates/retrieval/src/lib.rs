mod chunking;
mod tokenize;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use chunking::chunk_words;
pub use tokenize::tokenize;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_TOP_K: usize = 3;
pub const FALLBACK_PREFIX_CHARS: usize = 2000;

const UNIQUE_MATCH_WEIGHT: usize = 10;
const CHUNK_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub chunk_size: usize,
    pub top_k: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPath {
    EmptyDocument,
    EmptyQuery,
    NoChunks,
    BlankSelection,
    Ranked,
}

impl SelectionPath {
    pub fn is_fallback(self) -> bool {
        !matches!(self, Self::Ranked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredChunk {
    pub index: usize,
    pub score: usize,
    pub overlap: usize,
    pub frequency: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedContext {
    pub text: String,
    pub path: SelectionPath,
    pub chunk_indices: Vec<usize>,
    pub total_chunks: usize,
}

impl SelectedContext {
    fn fallback(text: String, path: SelectionPath, total_chunks: usize) -> Self {
        Self {
            text,
            path,
            chunk_indices: Vec::new(),
            total_chunks,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSelector {
    config: SelectorConfig,
}

impl ContextSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> SelectorConfig {
        self.config
    }

    /// Never fails: degenerate inputs resolve to an empty string, a
    /// character prefix of the document, or the first chunk.
    pub fn select(&self, document_text: &str, query: &str) -> SelectedContext {
        if document_text.is_empty() {
            return SelectedContext::fallback(String::new(), SelectionPath::EmptyDocument, 0);
        }

        let query_tokens = tokenize(query).into_iter().collect::<HashSet<_>>();
        if query_tokens.is_empty() {
            return SelectedContext::fallback(
                char_prefix(document_text, FALLBACK_PREFIX_CHARS),
                SelectionPath::EmptyQuery,
                0,
            );
        }

        let chunks = chunk_words(document_text, self.config.chunk_size);
        if chunks.is_empty() {
            return SelectedContext::fallback(String::new(), SelectionPath::NoChunks, 0);
        }

        let mut ranked = score_chunks(&query_tokens, &chunks);
        // stable: equal scores keep ascending chunk order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        let mut chunk_indices = ranked
            .iter()
            .take(self.config.top_k)
            .map(|chunk| chunk.index)
            .collect::<Vec<_>>();
        chunk_indices.sort_unstable();

        let text = chunk_indices
            .iter()
            .map(|&idx| chunks[idx].as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);

        if text.trim().is_empty() {
            let first = chunks
                .first()
                .cloned()
                .unwrap_or_else(|| char_prefix(document_text, FALLBACK_PREFIX_CHARS));
            return SelectedContext::fallback(first, SelectionPath::BlankSelection, chunks.len());
        }

        SelectedContext {
            text,
            path: SelectionPath::Ranked,
            chunk_indices,
            total_chunks: chunks.len(),
        }
    }
}

pub fn select_context(document_text: &str, query: &str, chunk_size: usize, top_k: usize) -> String {
    ContextSelector::new(SelectorConfig { chunk_size, top_k })
        .select(document_text, query)
        .text
}

pub fn rank_chunks(document_text: &str, query: &str, chunk_size: usize) -> Vec<ScoredChunk> {
    let query_tokens = tokenize(query).into_iter().collect::<HashSet<_>>();
    let chunks = chunk_words(document_text, chunk_size);

    let mut ranked = score_chunks(&query_tokens, &chunks);
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

fn score_chunks(query_tokens: &HashSet<String>, chunks: &[String]) -> Vec<ScoredChunk> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let counts = token_counts(chunk);
            let overlap = query_tokens
                .iter()
                .filter(|token| counts.contains_key(token.as_str()))
                .count();
            let frequency = query_tokens
                .iter()
                .map(|token| counts.get(token.as_str()).copied().unwrap_or(0))
                .sum::<usize>();

            ScoredChunk {
                index,
                score: overlap * UNIQUE_MATCH_WEIGHT + frequency,
                overlap,
                frequency,
                text: chunk.clone(),
            }
        })
        .collect()
}

fn token_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

fn char_prefix(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}
