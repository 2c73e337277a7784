//! High-level inference engine tying model resolution, prompt
//! formatting, decoding, and response extraction together

use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{Decoder, GenerationParams, ModelHandle, ModelResolver};
use crate::prompt::{extract_response, format_prompt, strip_prompt};

/// Temperature used for creative generation
pub const CREATIVE_TEMPERATURE: f64 = 1.0;

/// Nucleus threshold used for creative generation
pub const CREATIVE_TOP_P: f64 = 0.95;

/// Repetition penalty used for creative generation
pub const CREATIVE_REPETITION_PENALTY: f32 = 1.2;

/// A resolved model plus the configuration it runs under
pub struct InferenceEngine {
    handle: ModelHandle,
    config: EngineConfig,
}

impl InferenceEngine {
    /// Validate the configuration, resolve a model, and wrap it for
    /// generation
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let handle = ModelResolver::new(config.model.clone()).resolve()?;
        Ok(Self { handle, config })
    }

    /// Generate a chat reply for one user message
    pub fn generate_response(&self, message: &str, params: &GenerationParams) -> Result<String> {
        let prompt = format_prompt(message);
        let output = Decoder::new(&self.handle).decode(&prompt, params)?;
        info!(
            tokens = output.tokens.len(),
            elapsed_ms = output.processing_time.as_millis() as u64,
            "chat generation finished"
        );
        Ok(extract_response(&output.text, &prompt))
    }

    /// Continue raw text without the chat template, using the looser
    /// creative sampling settings
    pub fn generate_creative(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let params = creative_params(params);
        let output = Decoder::new(&self.handle).decode(text, &params)?;
        info!(
            tokens = output.tokens.len(),
            elapsed_ms = output.processing_time.as_millis() as u64,
            "creative generation finished"
        );
        Ok(strip_prompt(&output.text, text))
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The resolved model handle
    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }
}

/// Rebuild sampling parameters with the creative overrides applied
pub fn creative_params(base: &GenerationParams) -> GenerationParams {
    GenerationParams {
        temperature: CREATIVE_TEMPERATURE,
        top_p: CREATIVE_TOP_P,
        repetition_penalty: CREATIVE_REPETITION_PENALTY,
        ..base.clone()
    }
}
