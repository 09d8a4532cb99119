//! Chunking engine: page text → sized, overlapping chunks.
//!
//! The strategy set is closed and chosen by configuration:
//!
//! | Strategy    | Unit   | Boundaries                                        |
//! |-------------|--------|---------------------------------------------------|
//! | `recursive` | chars  | paragraph, line, sentence, clause, word, char     |
//! | `markdown`  | chars  | headings, fences, rules, list items, then above   |
//! | `token`     | tokens | word and punctuation tokens                       |
//! | `hybrid`    | chars  | header-led paragraph groups, oversized → recursive|
//!
//! Every page is chunked on its own, so a chunk never straddles two pages.
//! Chunk ids run sequentially across the whole document.

pub mod hybrid;
pub mod markdown;
pub mod recursive;
pub mod token;

use crate::document::{PageSource, Pages};
use crate::error::Pdf2SlidesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// How text is cut into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Recursive,
    Markdown,
    Token,
    Hybrid,
}

impl ChunkStrategy {
    /// Resolve a strategy name. `semantic` needs an embeddings model and is
    /// served by `recursive`, as is any unknown name.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "recursive" => ChunkStrategy::Recursive,
            "markdown" | "md" => ChunkStrategy::Markdown,
            "token" | "tokens" => ChunkStrategy::Token,
            "hybrid" => ChunkStrategy::Hybrid,
            "semantic" => {
                warn!("Semantic chunking needs an embeddings model; using recursive");
                ChunkStrategy::Recursive
            }
            other => {
                warn!("Unknown chunk strategy '{}'; using recursive", other);
                ChunkStrategy::Recursive
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Recursive => "recursive",
            ChunkStrategy::Markdown => "markdown",
            ChunkStrategy::Token => "token",
            ChunkStrategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy plus size and overlap, in characters (tokens for `token`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    pub strategy: ChunkStrategy,
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkSpec {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Recursive,
            size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkSpec {
    pub fn new(strategy: ChunkStrategy, size: usize, overlap: usize) -> Self {
        Self {
            strategy,
            size,
            overlap,
        }
    }

    pub fn validate(&self) -> Result<(), Pdf2SlidesError> {
        if self.size == 0 {
            return Err(Pdf2SlidesError::InvalidConfig(
                "Chunk size must be ≥ 1".into(),
            ));
        }
        if self.overlap >= self.size {
            return Err(Pdf2SlidesError::InvalidConfig(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// 0-based page index.
    pub page_index: usize,
    /// 1-based page number.
    pub page_number: usize,
    pub source: String,
    pub strategy: ChunkStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub char_count: usize,
    pub byte_count: usize,
}

impl Chunk {
    pub fn new(id: usize, text: String, metadata: ChunkMetadata) -> Self {
        let char_count = text.chars().count();
        let byte_count = text.len();
        Self {
            id,
            text,
            metadata,
            char_count,
            byte_count,
        }
    }
}

/// Split one text with the given spec. Empty pieces are dropped.
pub fn chunk_text(text: &str, spec: &ChunkSpec) -> Vec<String> {
    let pieces = match spec.strategy {
        ChunkStrategy::Recursive => recursive::split_recursive(text, spec.size, spec.overlap),
        ChunkStrategy::Markdown => markdown::split_markdown(text, spec.size, spec.overlap),
        ChunkStrategy::Token => token::split_tokens(text, spec.size, spec.overlap),
        ChunkStrategy::Hybrid => hybrid::split_hybrid(text, spec.size, spec.overlap),
    };
    pieces
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Chunk every page of `source`.
///
/// With `append_tables`, each detected table is appended to its page text as
/// a pipe-format Markdown table first. Fails with `NoContent` when there are
/// no pages or nothing to chunk.
pub fn chunk_document(
    source: &dyn PageSource,
    spec: &ChunkSpec,
    append_tables: bool,
) -> Result<Vec<Chunk>, Pdf2SlidesError> {
    spec.validate()?;
    let metadata = source.metadata();
    let source_name = metadata.source_name();

    if source.page_count() == 0 {
        return Err(Pdf2SlidesError::NoContent {
            source_name,
            cause: "document has no pages".into(),
        });
    }

    let mut chunks = Vec::new();
    for page in Pages::new(source) {
        let page = match page {
            Ok(page) => page,
            Err(Pdf2SlidesError::PageUnreadable { page, detail }) => {
                warn!("Chunking skipping page {}: {}", page, detail);
                continue;
            }
            Err(e) => return Err(e),
        };
        let mut text = page.text.clone();
        if append_tables {
            for table in &page.tables {
                let md = table.to_markdown();
                if !md.is_empty() {
                    text.push_str("\n\n");
                    text.push_str(&md);
                }
            }
        }
        if text.trim().is_empty() {
            continue;
        }

        for piece in chunk_text(&text, spec) {
            let id = chunks.len();
            chunks.push(Chunk::new(
                id,
                piece,
                ChunkMetadata {
                    page_index: page.index,
                    page_number: page.page_number(),
                    source: source_name.clone(),
                    strategy: spec.strategy,
                },
            ));
        }
    }

    if chunks.is_empty() {
        return Err(Pdf2SlidesError::NoContent {
            source_name,
            cause: "no extractable text on any page".into(),
        });
    }
    debug!(
        "Chunked {} pages into {} chunks ({})",
        source.page_count(),
        chunks.len(),
        spec.strategy
    );
    Ok(chunks)
}
