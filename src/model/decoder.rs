// Location: src/model/decoder.rs

use std::time::Instant;

use candle_core::{DType, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::llama::{Cache, Config, LlamaEosToks};
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::{EngineError, Result};
use crate::model::{
    ModelHandle, DEFAULT_MAX_LENGTH, DEFAULT_REPETITION_PENALTY, DEFAULT_SEED, DEFAULT_TEMPERATURE,
    DEFAULT_TOP_K, DEFAULT_TOP_P,
};
use crate::types::{DecodeOutput, GenerationRequest};

/// Sampling parameters for a single decode call.
///
/// The seed is explicit so identical parameters always reproduce identical
/// output; no process-wide random state is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Tokens to add beyond the prompt
    pub max_length: usize,
    /// Softmax temperature, must be positive
    pub temperature: f64,
    /// Nucleus threshold in (0, 1]
    pub top_p: f64,
    /// Candidate cutoff, at least 1
    pub top_k: usize,
    /// Divisor applied to already-emitted tokens, at least 1
    pub repetition_penalty: f32,
    /// Seed for the sampling RNG
    pub seed: u64,
}

impl Default for GenerationParams {
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

impl GenerationParams {
    /// Parameters taken from the engine configuration
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_length: config.max_length,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
            seed: config.seed,
        }
    }

    /// Parameters for one wire request; the seed is not part of the wire
    /// format and comes from configuration
    pub fn for_request(request: &GenerationRequest, seed: u64) -> Self {
        Self {
            max_length: request.max_length,
            temperature: request.temperature,
            top_p: request.top_p,
            top_k: request.top_k,
            repetition_penalty: request.repetition_penalty,
            seed,
        }
    }

    /// Reject out-of-range sampling parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(config_error("max_length", "must be at least 1"));
        }
        if self.temperature <= 0.0 {
            return Err(config_error("temperature", "must be positive"));
        }
        if self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(config_error("top_p", "must be in (0, 1]"));
        }
        if self.top_k == 0 {
            return Err(config_error("top_k", "must be at least 1"));
        }
        if self.repetition_penalty < 1.0 {
            return Err(config_error("repetition_penalty", "must be at least 1"));
        }
        Ok(())
    }
}

/// Runs sampling-based autoregressive generation against a resolved model
pub struct Decoder<'a> {
    handle: &'a ModelHandle,
}

impl<'a> Decoder<'a> {
    /// Borrow a resolved model for one or more decode calls
    pub fn new(handle: &'a ModelHandle) -> Self {
        Self { handle }
    }

    /// Generate up to `params.max_length` tokens beyond the prompt.
    ///
    /// Returns the decoded text of the whole sequence, prompt included.
    /// The total token count never exceeds the prompt length plus
    /// `params.max_length`, and the loop always terminates.
    pub fn decode(&self, prompt: &str, params: &GenerationParams) -> Result<DecodeOutput> {
        params.validate()?;
        let start = Instant::now();

        let device = self.handle.device();
        let config = self.handle.config();
        let dtype = if device.is_cuda() {
            DType::BF16
        } else {
            DType::F32
        };
        let mut cache = Cache::new(true, dtype, config, device)
            .map_err(|e| decode_error(format!("Failed to create decode cache: {}", e)))?;

        let mut tokens = self.handle.tokenizer().encode(prompt, true)?;
        let prompt_tokens = tokens.len();
        if prompt_tokens == 0 {
            return Err(decode_error("Prompt produced no tokens"));
        }

        let mut logits_processor = build_logits_processor(params);
        let eos_token = self.handle.tokenizer().eos_token_id();
        let mut generated: Vec<u32> = Vec::new();
        let mut index_pos = 0;

        for index in 0..params.max_length {
            let (context_size, context_index) = if index > 0 {
                (1, index_pos)
            } else {
                (tokens.len(), 0)
            };
            let ctxt = &tokens[tokens.len() - context_size..];
            let input = Tensor::new(ctxt, device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| decode_error(format!("Failed to build input tensor: {}", e)))?;

            let logits = self
                .handle
                .model()
                .forward(&input, context_index, &mut cache)
                .map_err(|e| decode_error(format!("Model forward pass failed: {}", e)))?;
            let logits = logits
                .squeeze(0)
                .and_then(|t| t.to_dtype(DType::F32))
                .map_err(|e| decode_error(format!("Failed to read logits: {}", e)))?;

            let logits = if params.repetition_penalty != 1.0 {
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    params.repetition_penalty,
                    &generated,
                )
                .map_err(|e| decode_error(format!("Failed to apply repetition penalty: {}", e)))?
            } else {
                logits
            };
            index_pos += ctxt.len();

            let next = logits_processor
                .sample(&logits)
                .map_err(|e| decode_error(format!("Sampling failed: {}", e)))?;
            tokens.push(next);
            generated.push(next);

            if reached_end(config, eos_token, next) {
                break;
            }
        }

        let text = self.handle.tokenizer().decode(&tokens, true)?;
        let processing_time = start.elapsed();
        debug!(
            prompt_tokens,
            generated = generated.len(),
            elapsed_ms = processing_time.as_millis() as u64,
            "decode finished"
        );

        Ok(DecodeOutput {
            text,
            tokens: generated,
            prompt_tokens,
            processing_time,
        })
    }
}

// Top-k is applied before the nucleus filter, then the survivors are
// renormalized and sampled.
fn build_logits_processor(params: &GenerationParams) -> LogitsProcessor {
    LogitsProcessor::from_sampling(
        params.seed,
        Sampling::TopKThenTopP {
            k: params.top_k,
            p: params.top_p,
            temperature: params.temperature,
        },
    )
}

fn reached_end(config: &Config, tokenizer_eos: Option<u32>, token: u32) -> bool {
    if tokenizer_eos == Some(token) {
        return true;
    }
    match &config.eos_token_id {
        Some(LlamaEosToks::Single(id)) => *id == token,
        Some(LlamaEosToks::Multiple(ids)) => ids.contains(&token),
        None => false,
    }
}

fn decode_error(message: impl Into<String>) -> EngineError {
    EngineError::DecodeError {
        message: message.into(),
    }
}

fn config_error(parameter: &str, message: &str) -> EngineError {
    EngineError::ConfigurationError {
        message: message.to_string(),
        parameter: parameter.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use candle_core::Device;
    use candle_nn::VarBuilder;
    use candle_transformers::models::llama::Llama;
    use tokenizers::models::wordlevel::WordLevel;
    use tokenizers::Tokenizer;

    use super::*;
    use crate::model::tokenizer::ChatTokenizer;

    // A one-layer Llama with zeroed weights: forward passes work and the
    // sampler sees a uniform distribution, which is all the loop needs.
    fn tiny_model() -> ModelHandle {
        let device = Device::Cpu;
        let mut config = Config::config_7b_v1(false);
        config.hidden_size = 16;
        config.intermediate_size = 32;
        config.vocab_size = 8;
        config.num_hidden_layers = 1;
        config.num_attention_heads = 2;
        config.num_key_value_heads = 2;
        config.max_position_embeddings = 64;
        config.eos_token_id = None;

        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = Llama::load(vb, &config).unwrap();

        let mut vocab: HashMap<String, u32> = HashMap::new();
        for (id, word) in ["<unk>", "hello", "world", "tell", "me", "a", "story", "now"]
            .iter()
            .enumerate()
        {
            vocab.insert(word.to_string(), id as u32);
        }
        let wordlevel = WordLevel::builder()
            .vocab(vocab)
            .unk_token("<unk>".to_string())
            .build()
            .unwrap();
        let tokenizer = ChatTokenizer::from_tokenizer(Tokenizer::new(wordlevel));

        ModelHandle::new(model, config, tokenizer, device)
    }

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.max_length, 150);
        assert_eq!(params.temperature, 0.8);
        assert_eq!(params.top_p, 0.9);
        assert_eq!(params.top_k, 50);
        assert_eq!(params.repetition_penalty, 1.1);
        assert_eq!(params.seed, 42);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_params_validation() {
        let cases = [
            GenerationParams {
                max_length: 0,
                ..Default::default()
            },
            GenerationParams {
                temperature: 0.0,
                ..Default::default()
            },
            GenerationParams {
                temperature: -0.5,
                ..Default::default()
            },
            GenerationParams {
                top_p: 0.0,
                ..Default::default()
            },
            GenerationParams {
                top_p: 1.5,
                ..Default::default()
            },
            GenerationParams {
                top_k: 0,
                ..Default::default()
            },
            GenerationParams {
                repetition_penalty: 0.9,
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(matches!(
                params.validate(),
                Err(EngineError::ConfigurationError { .. })
            ));
        }
    }

    #[test]
    fn test_params_for_request() {
        let request = GenerationRequest {
            message: "hi".to_string(),
            max_length: 64,
            temperature: 1.2,
            ..Default::default()
        };
        let params = GenerationParams::for_request(&request, 7);
        assert_eq!(params.max_length, 64);
        assert_eq!(params.temperature, 1.2);
        assert_eq!(params.top_p, 0.9);
        assert_eq!(params.seed, 7);
    }

    #[test]
    fn test_params_from_config() {
        let config = GenerationConfig::default();
        let params = GenerationParams::from_config(&config);
        assert_eq!(params, GenerationParams::default());
    }

    #[test]
    fn test_decode_respects_token_budget() {
        let handle = tiny_model();
        let decoder = Decoder::new(&handle);
        let params = GenerationParams {
            max_length: 6,
            seed: 99,
            ..Default::default()
        };

        let output = decoder.decode("hello world", &params).unwrap();
        assert!(output.prompt_tokens > 0);
        assert!(output.tokens.len() <= params.max_length);
    }

    #[test]
    fn test_decode_deterministic_for_fixed_seed() {
        let handle = tiny_model();
        let decoder = Decoder::new(&handle);
        let params = GenerationParams {
            max_length: 6,
            seed: 1234,
            ..Default::default()
        };

        let first = decoder.decode("tell me a story", &params).unwrap();
        let second = decoder.decode("tell me a story", &params).unwrap();
        assert_eq!(first.tokens, second.tokens);
        assert_eq!(first.text, second.text);
    }

    #[test]
    fn test_sampling_determinism() {
        let device = Device::Cpu;
        let logits = Tensor::new(&[1.0f32, 2.0, 0.5, 3.0, 0.1, 2.5], &device).unwrap();
        let params = GenerationParams {
            seed: 1234,
            ..Default::default()
        };
        let mut first = build_logits_processor(&params);
        let mut second = build_logits_processor(&params);
        for _ in 0..16 {
            assert_eq!(
                first.sample(&logits).unwrap(),
                second.sample(&logits).unwrap()
            );
        }
    }

    #[test]
    fn test_reached_end() {
        let mut config = Config::config_7b_v1(false);
        config.eos_token_id = Some(LlamaEosToks::Single(2));
        assert!(reached_end(&config, None, 2));
        assert!(!reached_end(&config, None, 3));
        assert!(reached_end(&config, Some(5), 5));
        assert!(!reached_end(&config, Some(5), 4));

        config.eos_token_id = Some(LlamaEosToks::Multiple(vec![2, 32000]));
        assert!(reached_end(&config, None, 32000));
        assert!(!reached_end(&config, None, 7));

        config.eos_token_id = None;
        assert!(!reached_end(&config, None, 2));
    }
}
