use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_http_port() -> u16 {
    3000
}

fn default_surreal_address() -> String {
    "mem://".to_string()
}

fn default_surreal_namespace() -> String {
    "minne_memory".to_string()
}

fn default_surreal_database() -> String {
    "minne_memory".to_string()
}

fn default_curator_interval_secs() -> u64 {
    86_400
}

fn default_curator_deadline_secs() -> u64 {
    60
}

fn default_provider_call_timeout_secs() -> u64 {
    30
}

fn default_ingestion_retry_attempts() -> u32 {
    3
}

fn default_curator_batch_size() -> usize {
    20
}

fn default_curator_max_consolidations() -> usize {
    10
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_surreal_address")]
    pub surrealdb_address: String,
    #[serde(default)]
    pub surrealdb_username: String,
    #[serde(default)]
    pub surrealdb_password: String,
    #[serde(default = "default_surreal_namespace")]
    pub surrealdb_namespace: String,
    #[serde(default = "default_surreal_database")]
    pub surrealdb_database: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Credentials are optional; absence disables that provider (§6).
    pub edge_api_key: Option<String>,
    #[serde(default = "default_edge_base_url")]
    pub edge_base_url: String,
    pub edge_model: Option<String>,

    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_curator_interval_secs")]
    pub curator_interval_secs: u64,
    #[serde(default = "default_curator_deadline_secs")]
    pub curator_deadline_secs: u64,
    #[serde(default = "default_curator_batch_size")]
    pub curator_batch_size: usize,
    #[serde(default = "default_curator_max_consolidations")]
    pub curator_max_consolidations: usize,

    #[serde(default = "default_provider_call_timeout_secs")]
    pub provider_call_timeout_secs: u64,
    #[serde(default = "default_ingestion_retry_attempts")]
    pub ingestion_retry_attempts: u32,
}

fn default_edge_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
