//! Model resolution, tokenization, and sampling-based decoding

mod decoder;
mod resolver;
mod tokenizer;

// Re-export core types
pub use decoder::{Decoder, GenerationParams};
pub use resolver::{ModelHandle, ModelResolver};
pub use tokenizer::ChatTokenizer;

// Defaults shared by the wire protocol and the engine configuration
/// Default token budget added beyond the prompt
pub const DEFAULT_MAX_LENGTH: usize = 150;
/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
/// Default nucleus threshold
pub const DEFAULT_TOP_P: f64 = 0.9;
/// Default candidate cutoff for top-k filtering
pub const DEFAULT_TOP_K: usize = 50;
/// Default divisor applied to already-emitted tokens
pub const DEFAULT_REPETITION_PENALTY: f32 = 1.1;
/// Default base seed for the sampling RNG
pub const DEFAULT_SEED: u64 = 42;

/// Baseline model substituted when the primary artifacts are unusable
pub const FALLBACK_MODEL_ID: &str = "TinyLlama/TinyLlama-1.1B-Chat-v1.0";
/// Default location of the fine-tuned model artifacts
pub const PRIMARY_MODEL_DIR: &str = "./fine_tuned_model";
