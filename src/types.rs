//! Common type definitions used throughout the engine

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::Mode;
use crate::model::{
    DEFAULT_MAX_LENGTH, DEFAULT_REPETITION_PENALTY, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
    DEFAULT_TOP_P,
};

/// A single chat request as received on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// User message to respond to
    #[serde(default)]
    pub message: String,

    /// Caller-supplied correlation value, echoed back untouched
    #[serde(default)]
    pub conversation_id: Option<Value>,

    /// Token budget added beyond the prompt
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus threshold
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Top-k cutoff
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Repetition penalty divisor
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_repetition_penalty() -> f32 {
    DEFAULT_REPETITION_PENALTY
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            message: String::new(),
            conversation_id: None,
            max_length: default_max_length(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repetition_penalty: default_repetition_penalty(),
        }
    }
}

impl GenerationRequest {
    /// Wrap a bare text payload in a request with default parameters
    pub fn from_raw_text(text: &str) -> Self {
        Self {
            message: text.to_string(),
            ..Default::default()
        }
    }
}

/// Outcome of one request, serialized as a single JSON object
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GenerationResult {
    /// A generated reply
    Success {
        /// Extracted model reply
        response: String,
        /// Classified response mode
        mode: Mode,
        /// Echo of the request's conversation id
        conversation_id: Option<Value>,
        /// Always true
        success: bool,
    },
    /// A failure at any stage
    Failure {
        /// Human-readable failure description
        error: String,
        /// Always false
        success: bool,
    },
}

impl GenerationResult {
    /// Build a success payload
    pub fn success(response: String, mode: Mode, conversation_id: Option<Value>) -> Self {
        Self::Success {
            response,
            mode,
            conversation_id,
            success: true,
        }
    }

    /// Build a failure payload
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            success: false,
        }
    }

    /// Whether this result carries a response
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Process exit code matching the outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Raw output of one decode pass
#[derive(Debug, Clone)]
pub struct DecodeOutput {
    /// Decoded text for the full token sequence, prompt included
    pub text: String,

    /// Tokens produced beyond the prompt
    pub tokens: Vec<u32>,

    /// Number of tokens the prompt encoded to
    pub prompt_tokens: usize,

    /// Wall-clock time the decode loop took
    pub processing_time: Duration,
}
