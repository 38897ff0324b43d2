use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use common::{error::AppError, utils::embedding::EmbeddingProvider};
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::provider::{AiProvider, GenerateOpts};
use crate::sanitize::sanitize;

#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        system: &str,
        opts: &GenerateOpts,
    ) -> Result<String, AppError>;

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: Value,
        opts: &GenerateOpts,
    ) -> Result<Value, AppError>;

    async fn generate_embeddings(&self, text: &str, opts: &GenerateOpts) -> Result<Vec<f32>, AppError>;

    async fn rewrite_question_for_mcp(
        &self,
        query: &str,
        context: &str,
        opts: &GenerateOpts,
    ) -> Result<String, AppError>;
}

/// The system prompt for the `Edge` provider's reasoning step of
/// `generate_structured`'s two-step pipeline: small local models rarely
/// hit native structured-output constraints reliably, so we reason in
/// prose first and constrain to schema second.
const EDGE_REASONING_SYSTEM_PROMPT: &str =
    "Think through the request below and produce a plain-text answer covering every \
     piece of information the final structured response will need. Do not format as JSON.";

const REWRITE_SYSTEM_PROMPT: &str =
    "Rewrite the user's query into a short list of alternative search queries that \
     preserve its intent while varying phrasing, synonyms and specificity. Respond with \
     one rewritten query per line, no numbering or commentary.";

pub struct DefaultAiGateway {
    embedding_provider: Arc<EmbeddingProvider>,
    edge_client: Client<OpenAIConfig>,
    gemini_client: Client<OpenAIConfig>,
    openai_client: Client<OpenAIConfig>,
    edge_model: String,
    gemini_model: String,
    openai_model: String,
}

impl DefaultAiGateway {
    pub fn new(
        embedding_provider: Arc<EmbeddingProvider>,
        edge_base_url: &str,
        edge_api_key: Option<&str>,
        edge_model: impl Into<String>,
        gemini_base_url: &str,
        gemini_api_key: Option<&str>,
        gemini_model: impl Into<String>,
        openai_base_url: &str,
        openai_api_key: Option<&str>,
        openai_model: impl Into<String>,
    ) -> Self {
        Self {
            embedding_provider,
            edge_client: build_client(edge_base_url, edge_api_key),
            gemini_client: build_client(gemini_base_url, gemini_api_key),
            openai_client: build_client(openai_base_url, openai_api_key),
            edge_model: edge_model.into(),
            gemini_model: gemini_model.into(),
            openai_model: openai_model.into(),
        }
    }

    fn client_for(&self, provider: AiProvider) -> &Client<OpenAIConfig> {
        match provider {
            AiProvider::Edge => &self.edge_client,
            AiProvider::Gemini => &self.gemini_client,
            AiProvider::OpenAi => &self.openai_client,
        }
    }

    fn default_model_for(&self, provider: AiProvider) -> &str {
        match provider {
            AiProvider::Edge => &self.edge_model,
            AiProvider::Gemini => &self.gemini_model,
            AiProvider::OpenAi => &self.openai_model,
        }
    }

    fn model_for(&self, opts: &GenerateOpts) -> String {
        opts.model
            .clone()
            .unwrap_or_else(|| self.default_model_for(opts.provider).to_string())
    }

    async fn chat(
        &self,
        prompt: &str,
        system: &str,
        opts: &GenerateOpts,
        response_format: Option<ResponseFormat>,
    ) -> Result<String, AppError> {
        let client = self.client_for(opts.provider);
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.model_for(opts))
            .messages(vec![
                ChatCompletionRequestSystemMessage::from(system).into(),
                ChatCompletionRequestUserMessage::from(prompt).into(),
            ]);
        if let Some(format) = response_format {
            builder.response_format(format);
        }
        let request = builder
            .build()
            .map_err(|e| AppError::PermanentBackend(e.to_string()))?;

        let response = tokio::time::timeout(opts.timeout, client.chat().create(request))
            .await
            .map_err(|_| AppError::TransientBackend("ai provider call timed out".into()))?
            .map_err(classify_openai_error)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::PermanentBackend("empty response from ai provider".into()))?;

        Ok(if opts.sanitize { sanitize(&content) } else { content })
    }

    async fn generate_structured_edge(
        &self,
        prompt: &str,
        schema: Value,
        opts: &GenerateOpts,
    ) -> Result<Value, AppError> {
        let reasoning = self
            .chat(prompt, EDGE_REASONING_SYSTEM_PROMPT, opts, None)
            .await?;

        let structuring_prompt = format!(
            "Using the following reasoning, produce a single JSON object matching the \
             required schema and nothing else.\n\nReasoning:\n{reasoning}"
        );

        let response_format = json_schema_response_format(schema);
        let raw = self
            .chat(&structuring_prompt, "Respond with JSON only.", opts, Some(response_format.clone()))
            .await?;

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!("edge provider returned unparsable json, retrying once after sanitize");
                let cleaned = sanitize(&raw);
                serde_json::from_str(&cleaned)
                    .map_err(|e| AppError::StructuredGeneration(e.to_string()))
            }
        }
    }

    async fn generate_structured_native(
        &self,
        prompt: &str,
        schema: Value,
        opts: &GenerateOpts,
    ) -> Result<Value, AppError> {
        let response_format = json_schema_response_format(schema);
        let raw = self
            .chat(prompt, "Respond with JSON only.", opts, Some(response_format))
            .await?;
        serde_json::from_str(&raw).map_err(|e| AppError::StructuredGeneration(e.to_string()))
    }
}

/// `async-openai` doesn't surface the HTTP status of a failed call, only
/// the provider's parsed error body, so permanence is judged by the
/// OpenAI error-object `type` field (documented and stable across
/// OpenAI-compatible providers) rather than a status code.
const PERMANENT_API_ERROR_TYPES: &[&str] = &[
    "invalid_request_error",
    "authentication_error",
    "invalid_api_key",
    "insufficient_quota",
    "permission_error",
];

fn classify_openai_error(err: OpenAIError) -> AppError {
    match &err {
        OpenAIError::ApiError(api_err) if is_permanent_api_error(api_err) => {
            AppError::PermanentBackend(err.to_string())
        }
        _ => AppError::TransientBackend(err.to_string()),
    }
}

fn is_permanent_api_error(api_err: &ApiError) -> bool {
    api_err
        .r#type
        .as_deref()
        .is_some_and(|t| PERMANENT_API_ERROR_TYPES.contains(&t))
}

fn build_client(base_url: &str, api_key: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_base(base_url);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    Client::with_config(config)
}

fn json_schema_response_format(schema: Value) -> ResponseFormat {
    ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            description: None,
            name: "structured_response".into(),
            schema: Some(schema),
            strict: Some(true),
        },
    }
}

#[async_trait]
impl AiGateway for DefaultAiGateway {
    #[instrument(skip(self, prompt, system))]
    async fn generate_text(
        &self,
        prompt: &str,
        system: &str,
        opts: &GenerateOpts,
    ) -> Result<String, AppError> {
        self.chat(prompt, system, opts, None).await
    }

    #[instrument(skip(self, prompt, schema))]
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: Value,
        opts: &GenerateOpts,
    ) -> Result<Value, AppError> {
        match opts.provider {
            AiProvider::Edge => self.generate_structured_edge(prompt, schema, opts).await,
            AiProvider::Gemini | AiProvider::OpenAi => {
                self.generate_structured_native(prompt, schema, opts).await
            }
        }
    }

    #[instrument(skip(self, text))]
    async fn generate_embeddings(&self, text: &str, opts: &GenerateOpts) -> Result<Vec<f32>, AppError> {
        tokio::time::timeout(opts.timeout, self.embedding_provider.embed(text))
            .await
            .map_err(|_| AppError::TransientBackend("embedding call timed out".into()))?
    }

    #[instrument(skip(self, query, context))]
    async fn rewrite_question_for_mcp(
        &self,
        query: &str,
        context: &str,
        opts: &GenerateOpts,
    ) -> Result<String, AppError> {
        let prompt = format!("Context:\n{context}\n\nOriginal query:\n{query}");
        self.chat(&prompt, REWRITE_SYSTEM_PROMPT, opts, None).await
    }
}

impl std::fmt::Debug for DefaultAiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAiGateway").finish_non_exhaustive()
    }
}
