use common::storage::types::memory::Memory;
use common::storage::types::memory_vector::VectorMatch;
use serde::{Deserialize, Serialize};

/// A `Memory` hydrated from C3 and carrying the similarity score it was
/// matched with in C2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f32,
}

/// Context bag forwarded to AI query rewriting — opaque beyond being
/// rendered into the rewrite prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteContext {
    pub bindings: Vec<String>,
    pub libraries: Vec<String>,
    pub tags: Vec<String>,
    pub code_snippets: Vec<String>,
}

impl RewriteContext {
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if !self.bindings.is_empty() {
            parts.push(format!("bindings: {}", self.bindings.join(", ")));
        }
        if !self.libraries.is_empty() {
            parts.push(format!("libraries: {}", self.libraries.join(", ")));
        }
        if !self.tags.is_empty() {
            parts.push(format!("tags: {}", self.tags.join(", ")));
        }
        if !self.code_snippets.is_empty() {
            parts.push(format!("code snippets:\n{}", self.code_snippets.join("\n---\n")));
        }
        parts.join("\n")
    }
}

/// One query's result from [`crate::rewritten_search`] — `original_query`
/// is always the caller's input at the matching index (P3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewrittenResult {
    pub original_query: String,
    pub rewritten_query: String,
    pub vector_results: Vec<VectorMatch>,
}
