// SPDX-License-Identifier: MIT

//! In-memory corpus with scored-overlap similarity search
//!
//! Stand-in for the vector index: chunks are scored by how many distinct
//! question tokens they contain. The index build proper (embeddings,
//! vector store lifecycle) is outside the workflow core; anything that
//! satisfies [CorpusSearch] can replace this.

use super::{CorpusSearch, Document};
use crate::error::VerityError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Default number of candidates returned per search
pub const DEFAULT_TOP_K: usize = 4;

/// Approximate chunk size, in characters, when splitting loaded files
const CHUNK_SIZE: usize = 500;

/// In-memory document corpus
pub struct InMemoryCorpus {
    chunks: Vec<Document>,
    top_k: usize,
}

impl InMemoryCorpus {
    /// Build a corpus from pre-chunked documents.
    /// Chunks with identical content are dropped, keeping the first.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut seen = HashSet::new();
        let chunks = documents
            .into_iter()
            .filter(|d| seen.insert(d.content.clone()))
            .collect();
        Self {
            chunks,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load every `.txt` and `.md` file under `dir` (non-recursive) and
    /// split each into roughly [CHUNK_SIZE]-character chunks on paragraph
    /// boundaries.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, VerityError> {
        let dir = dir.as_ref();
        let mut documents = Vec::new();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_text = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "txt" || e == "md");
            if !is_text {
                continue;
            }

            let text = fs::read_to_string(&path)?;
            let source = path.to_string_lossy().to_string();
            for chunk in split_chunks(&text, CHUNK_SIZE) {
                documents.push(Document::with_source(chunk, source.clone()));
            }
        }

        log::info!(
            "Loaded corpus from {}: {} chunks",
            dir.display(),
            documents.len()
        );
        Ok(Self::from_documents(documents))
    }

    /// Override the number of candidates returned per search
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split text into chunks of at most ~`size` characters on paragraph
/// boundaries. A single oversized paragraph becomes its own chunk.
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if !current.is_empty() && current.len() + paragraph.len() > size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Count of distinct question tokens present in the chunk
fn overlap_score(question_tokens: &HashSet<String>, chunk: &str) -> usize {
    let chunk_tokens = tokens(chunk);
    question_tokens
        .iter()
        .filter(|t| chunk_tokens.contains(*t))
        .count()
}

#[async_trait]
impl CorpusSearch for InMemoryCorpus {
    async fn search(&self, question: &str) -> Result<Vec<Document>, VerityError> {
        let question_tokens = tokens(question);

        let mut scored: Vec<(usize, &Document)> = self
            .chunks
            .iter()
            .map(|doc| (overlap_score(&question_tokens, &doc.content), doc))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}
