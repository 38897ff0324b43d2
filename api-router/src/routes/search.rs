use axum::{
    extract::{Query, State},
    Json,
};
use ai_gateway::{AiProvider, GenerateOpts};
use common::storage::types::memory_vector::VectorMatch;
use retrieval_pipeline::{basic_search, rewritten_search, RewriteContext, RewrittenResult, ScoredMemory};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct BasicSearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

/// Wire shape for `GET /api/search` (§6): a flattened, hydrated memory
/// row rather than the internal `{memory, score}` nesting.
#[derive(Debug, Serialize)]
pub struct MemorySearchResult {
    pub id: String,
    pub text: String,
    pub tags: Vec<String>,
    pub score: f32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub source_app: Option<String>,
    pub session_id: Option<String>,
    pub status: common::storage::types::memory::MemoryStatus,
}

impl From<ScoredMemory> for MemorySearchResult {
    fn from(scored: ScoredMemory) -> Self {
        Self {
            id: scored.memory.id,
            text: scored.memory.text,
            tags: scored.memory.tags,
            score: scored.score,
            created_at: scored.memory.created_at,
            source_app: scored.memory.source_app,
            session_id: scored.memory.session_id,
            status: scored.memory.status,
        }
    }
}

/// `GET /api/search` (§6), the embed → vector query → hydrate path
/// of §4.2.1.
pub async fn basic_search_handler(
    State(state): State<ApiState>,
    Query(params): Query<BasicSearchQuery>,
) -> Result<Json<Vec<MemorySearchResult>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let results = basic_search(&params.q, limit, state.provider_timeout, state.gateway.as_ref(), &state.db).await?;
    Ok(Json(results.into_iter().map(MemorySearchResult::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct RewrittenSearchRequest {
    pub queries: Vec<String>,
    #[serde(default)]
    pub context: RewriteContext,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub provider: Option<AiProvider>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VectorMatchDto {
    pub id: String,
    pub score: f32,
    pub metadata: common::storage::types::memory_vector::VectorMetadata,
}

impl From<VectorMatch> for VectorMatchDto {
    fn from(m: VectorMatch) -> Self {
        Self { id: m.memory_id, score: m.score, metadata: m.metadata }
    }
}

#[derive(Debug, Serialize)]
pub struct VectorResultsDto {
    pub matches: Vec<VectorMatchDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewrittenResultDto {
    pub original_query: String,
    pub rewritten_query: String,
    pub vector_results: VectorResultsDto,
}

impl From<RewrittenResult> for RewrittenResultDto {
    fn from(result: RewrittenResult) -> Self {
        Self {
            original_query: result.original_query,
            rewritten_query: result.rewritten_query,
            vector_results: VectorResultsDto {
                matches: result.vector_results.into_iter().map(VectorMatchDto::from).collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RewrittenSearchResponse {
    pub success: bool,
    pub results: Vec<RewrittenResultDto>,
}

/// `POST /api/search/rewritten` (§6), fanning each query through
/// `rewritten_search`'s bounded-concurrency rewrite-then-embed pipeline
/// (§4.2.2).
pub async fn rewritten_search_handler(
    State(state): State<ApiState>,
    Json(request): Json<RewrittenSearchRequest>,
) -> Result<Json<RewrittenSearchResponse>, ApiError> {
    let top_k = request.top_k.unwrap_or(DEFAULT_LIMIT);
    let mut opts = GenerateOpts {
        provider: request.provider.unwrap_or(AiProvider::Edge),
        timeout: state.provider_timeout,
        ..GenerateOpts::default()
    };
    if let Some(model) = request.model {
        opts = opts.with_model(model);
    }
    let results = rewritten_search(
        request.queries,
        &request.context,
        top_k,
        &opts,
        state.gateway.as_ref(),
        &state.db,
    )
    .await;
    Ok(Json(RewrittenSearchResponse {
        success: true,
        results: results.into_iter().map(RewrittenResultDto::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::types::memory::{Memory, MemoryStatus};
    use common::storage::types::memory_vector::VectorMetadata;

    #[test]
    fn memory_search_result_flattens_scored_memory() {
        let memory = Memory::new("m1".into(), "hello".into(), vec!["tag".into()], Some("cli".into()), None);
        let scored = ScoredMemory { memory, score: 0.87 };

        let dto = MemorySearchResult::from(scored);
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["id"], "m1");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["score"], 0.87);
        assert_eq!(json["sourceApp"], serde_json::Value::Null, "MemorySearchResult keeps snake_case field names");
        assert_eq!(json["source_app"], "cli");
    }

    #[test]
    fn rewritten_result_dto_nests_matches_under_vector_results() {
        let result = RewrittenResult {
            original_query: "q".into(),
            rewritten_query: "q rewritten".into(),
            vector_results: vec![VectorMatch {
                memory_id: "m1".into(),
                score: 0.5,
                metadata: VectorMetadata::for_ingestion(chrono::Utc::now(), &[]),
            }],
        };

        let dto = RewrittenResultDto::from(result);
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["originalQuery"], "q");
        assert_eq!(json["rewrittenQuery"], "q rewritten");
        assert_eq!(json["vectorResults"]["matches"][0]["id"], "m1");
    }

    #[test]
    fn memory_status_round_trips_through_wire_shape() {
        let memory = Memory {
            status: MemoryStatus::Consolidated,
            ..Memory::new("m2".into(), "x".into(), vec![], None, None)
        };
        let dto = MemorySearchResult::from(ScoredMemory { memory, score: 0.1 });
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["status"], "consolidated");
    }
}
