//! Chat Engine - local LLM chat inference with fine-tuned model fallback
//!
//! This crate answers single chat requests over a JSON line protocol and
//! runs interactive sessions against a locally fine-tuned Llama model,
//! falling back to a baseline checkpoint when the local artifacts are
//! missing or unreadable.

#![warn(missing_docs)]

pub mod chat;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod types;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use chat::{ChatSession, ConversationTurn};
pub use classify::{classify, Mode};
pub use config::{EngineConfig, GenerationConfig, ModelConfig};
pub use engine::InferenceEngine;
pub use error::{EngineError, Result};
pub use logging::{setup_logging, LogConfig};
pub use model::{GenerationParams, ModelHandle, ModelResolver};
pub use pipeline::{emit_result, parse_request, run_request, ResponseGenerator};
pub use prompt::{extract_response, format_prompt, strip_prompt};
pub use types::{DecodeOutput, GenerationRequest, GenerationResult};
