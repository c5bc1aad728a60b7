//! Shared LLM access layer.
//!
//! - [`config`]: model configs and env-driven defaults
//! - [`error_handler`]: unified error type and the [`ErrorClass`] taxonomy
//! - [`services`]: thin provider clients (Ollama, OpenAI, Gemini)
//! - [`service_profiles`]: cached clients behind `generation` / `embedding` profiles
//! - [`telemetry`]: tracing subscriber setup for binaries

pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError, ErrorClass, ProviderError, ProviderErrorKind};
pub use service_profiles::LlmServiceProfiles;
