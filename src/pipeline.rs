//! Single-shot request pipeline
//!
//! A payload moves through parsing, validation, engine resolution,
//! generation, and classification, and always comes out as exactly one
//! JSON result object.

use std::io::{self, Write};

use tracing::{debug, error};

use crate::classify::classify;
use crate::engine::InferenceEngine;
use crate::error::{EngineError, Result};
use crate::model::GenerationParams;
use crate::types::{GenerationRequest, GenerationResult};

/// Anything able to answer a chat request
pub trait ResponseGenerator {
    /// Produce a reply for the request's message
    fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

impl ResponseGenerator for InferenceEngine {
    fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let params = GenerationParams::for_request(request, self.config().generation.seed);
        self.generate_response(&request.message, &params)
    }
}

/// Parse one raw payload into a request.
///
/// Payloads that fail to parse as a request object are treated as bare
/// message text with default parameters. An empty payload and a request
/// without a usable message are rejected.
pub fn parse_request(payload: &str) -> Result<GenerationRequest> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(input_error("No input provided"));
    }

    let request = serde_json::from_str(trimmed)
        .unwrap_or_else(|_| GenerationRequest::from_raw_text(trimmed));

    if request.message.trim().is_empty() {
        return Err(input_error("Message is required"));
    }
    Ok(request)
}

/// Run one request end to end against a lazily resolved generator.
///
/// The generator is resolved only after the payload has been parsed and
/// validated, so malformed input never pays the model load cost.
pub fn run_request<G, F>(payload: &str, resolve: F) -> GenerationResult
where
    G: ResponseGenerator,
    F: FnOnce() -> Result<G>,
{
    let request = match parse_request(payload) {
        Ok(request) => request,
        Err(err) => return GenerationResult::failure(err.to_string()),
    };
    debug!(message_len = request.message.len(), "request accepted");

    let generator = match resolve() {
        Ok(generator) => generator,
        Err(err) => {
            error!(error = %err, "engine setup failed");
            return GenerationResult::failure(err.to_string());
        }
    };

    match generator.generate(&request) {
        Ok(response) => {
            GenerationResult::success(response, classify(&request.message), request.conversation_id)
        }
        Err(err) => {
            error!(error = %err, "generation failed");
            GenerationResult::failure(err.to_string())
        }
    }
}

/// Write a result as exactly one JSON line
pub fn emit_result(out: &mut impl Write, result: &GenerationResult) -> io::Result<()> {
    let line = serde_json::to_string(result)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    writeln!(out, "{}", line)
}

fn input_error(message: &str) -> EngineError {
    EngineError::InputError {
        message: message.to_string(),
    }
}
