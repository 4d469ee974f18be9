//! Prompt context built from retrieval matches

use super::SimilarityResult;

/// First line of every context block
pub const CONTEXT_HEADER: &str = "INTERNAL COMPANY DOCUMENTS FOUND IN THE SYSTEM:";

/// Shown to users while the cache is still loading
pub const NOT_READY_MESSAGE: &str = "The internal document library is still being loaded into memory \
     (usually 2-3 minutes). Please ask this question again in a few minutes.";

/// Consumer-facing result of a text search
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// Cache still warming up
    NotReady { message: String },
    /// Cache ready, nothing relevant (or the query could not be embedded)
    NoMatches,
    /// Formatted context plus the matches it was built from
    Found {
        context: String,
        matches: Vec<SimilarityResult>,
    },
}

impl RetrievalOutcome {
    pub fn not_ready() -> Self {
        Self::NotReady {
            message: NOT_READY_MESSAGE.to_string(),
        }
    }

    pub fn from_matches(matches: Vec<SimilarityResult>) -> Self {
        if matches.is_empty() {
            return Self::NoMatches;
        }

        Self::Found {
            context: format_context(&matches),
            matches,
        }
    }

    /// Text to splice into a prompt; empty when nothing was found
    pub fn prompt_text(&self) -> &str {
        match self {
            Self::NotReady { message } => message,
            Self::NoMatches => "",
            Self::Found { context, .. } => context,
        }
    }
}

/// Concatenate matches into a block tagged with source file and page
pub fn format_context(matches: &[SimilarityResult]) -> String {
    let mut pieces = Vec::with_capacity(matches.len() + 1);
    pieces.push(CONTEXT_HEADER.to_string());

    for (idx, result) in matches.iter().enumerate() {
        pieces.push(format!(
            "--- DOCUMENT {} [Source: {} | Page: {}] ---\n{}",
            idx + 1,
            result.chunk.source(),
            result.chunk.page(),
            result.chunk.text()
        ));
    }

    pieces.join("\n\n")
}
