use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which backend a call is routed to. A tagged union rather than a trait
/// hierarchy: there are exactly three transports and they share one
/// OpenAI-compatible wire format, so dynamic dispatch buys nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiProvider {
    #[default]
    Edge,
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct GenerateOpts {
    pub provider: AiProvider,
    pub model: Option<String>,
    pub reasoning_effort: ReasoningEffort,
    pub sanitize: bool,
    pub timeout: Duration,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            model: None,
            reasoning_effort: ReasoningEffort::default(),
            sanitize: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl GenerateOpts {
    pub fn with_provider(mut self, provider: AiProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
