#[cfg(any(test, feature = "test-utils"))]
pub mod fake;
pub mod gateway;
pub mod provider;
pub mod sanitize;

pub use gateway::{AiGateway, DefaultAiGateway};
pub use provider::{AiProvider, GenerateOpts, ReasoningEffort};
pub use sanitize::sanitize;
