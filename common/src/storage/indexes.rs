//! Index name constants shared between schema setup in
//! [`super::db::SurrealDbClient::build_indexes`] and any query that wants
//! to reference an index by name (e.g. `REBUILD INDEX`).

pub const MEMORY_VECTOR_HNSW: &str = "idx_embedding_memory_vector";
pub const MEMORY_SESSION: &str = "idx_memory_session";
pub const MEMORY_SOURCE: &str = "idx_memory_source";
pub const MEMORY_CREATED: &str = "idx_memory_created";
pub const MEMORY_STATUS: &str = "idx_memory_status";
