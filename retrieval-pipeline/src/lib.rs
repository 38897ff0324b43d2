pub mod basic;
pub mod rewritten;
pub mod types;

pub use basic::basic_search;
pub use rewritten::rewritten_search;
pub use types::{RewriteContext, RewrittenResult, ScoredMemory};
