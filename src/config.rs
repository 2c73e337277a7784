// Location: src/config.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{
    GenerationParams, DEFAULT_MAX_LENGTH, DEFAULT_REPETITION_PENALTY, DEFAULT_SEED,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P, FALLBACK_MODEL_ID, PRIMARY_MODEL_DIR,
};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Where models come from
    pub model: ModelConfig,
    /// Default sampling behavior
    pub generation: GenerationConfig,
}

/// Model artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the fine-tuned artifacts
    pub primary_dir: PathBuf,

    /// Hub id of the baseline model used when the primary artifacts are
    /// unusable
    pub fallback_model_id: String,
}

/// Default sampling parameters applied when a request leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Token budget added beyond the prompt
    pub max_length: usize,

    /// Sampling temperature
    pub temperature: f64,

    /// Nucleus threshold
    pub top_p: f64,

    /// Top-k cutoff
    pub top_k: usize,

    /// Repetition penalty divisor
    pub repetition_penalty: f32,

    /// Base seed for the sampling RNG
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            primary_dir: PathBuf::from(PRIMARY_MODEL_DIR),
            fallback_model_id: FALLBACK_MODEL_ID.to_string(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
            repetition_penalty: DEFAULT_REPETITION_PENALTY,
            seed: DEFAULT_SEED,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model.primary_dir.as_os_str().is_empty() {
            return Err(EngineError::ConfigurationError {
                message: "Primary model directory cannot be empty".to_string(),
                parameter: "primary_dir".to_string(),
            });
        }
        if self.model.fallback_model_id.is_empty() {
            return Err(EngineError::ConfigurationError {
                message: "Fallback model id cannot be empty".to_string(),
                parameter: "fallback_model_id".to_string(),
            });
        }
        GenerationParams::from_config(&self.generation).validate()
    }
}
