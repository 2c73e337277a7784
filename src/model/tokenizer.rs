// Location: src/model/tokenizer.rs

use std::path::Path;

use tokenizers::{PaddingParams, Tokenizer};

use crate::error::{EngineError, Result};

// End-of-sequence spellings probed when the tokenizer file does not make
// the choice obvious.
const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<|end_of_text|>"];

/// HuggingFace tokenizer wrapper with the special-token bookkeeping
/// generation needs.
///
/// A pad token is guaranteed before the first decode call: when the loaded
/// tokenizer defines none, the end-of-sequence token is reused for padding.
/// Tokenizers that spell their end-of-sequence token some other way can
/// adopt the model config's id through [`set_fallback_eos`].
///
/// [`set_fallback_eos`]: ChatTokenizer::set_fallback_eos
#[derive(Debug)]
pub struct ChatTokenizer {
    tokenizer: Tokenizer,
    eos_token_id: Option<u32>,
}

impl ChatTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| EngineError::ModelError {
            message: format!("Failed to load tokenizer: {}", e),
        })?;
        Ok(Self::from_tokenizer(tokenizer))
    }

    pub(crate) fn from_tokenizer(mut tokenizer: Tokenizer) -> Self {
        let eos = find_eos(&tokenizer);
        if tokenizer.get_padding().is_none() {
            if let Some((id, token)) = &eos {
                tokenizer.with_padding(Some(PaddingParams {
                    pad_id: *id,
                    pad_token: token.clone(),
                    ..Default::default()
                }));
            }
        }
        Self {
            tokenizer,
            eos_token_id: eos.map(|(id, _)| id),
        }
    }

    /// Encode text to token IDs
    pub fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, add_special_tokens)
            .map_err(|e| EngineError::DecodeError {
                message: format!("Tokenization failed: {}", e),
            })?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Decode token IDs back to text
    pub fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String> {
        self.tokenizer
            .decode(tokens, skip_special_tokens)
            .map_err(|e| EngineError::DecodeError {
                message: format!("Decoding failed: {}", e),
            })
    }

    /// End-of-sequence token ID, when the vocabulary defines one
    pub fn eos_token_id(&self) -> Option<u32> {
        self.eos_token_id
    }

    /// Adopt an end-of-sequence id from the model config when the
    /// vocabulary probe found none. Keeps whatever the probe found.
    pub(crate) fn set_fallback_eos(&mut self, id: u32) {
        if self.eos_token_id.is_some() {
            return;
        }
        self.eos_token_id = Some(id);
        if self.tokenizer.get_padding().is_none() {
            let token = self
                .tokenizer
                .id_to_token(id)
                .unwrap_or_else(|| EOS_CANDIDATES[0].to_string());
            self.tokenizer.with_padding(Some(PaddingParams {
                pad_id: id,
                pad_token: token,
                ..Default::default()
            }));
        }
    }
}

fn find_eos(tokenizer: &Tokenizer) -> Option<(u32, String)> {
    EOS_CANDIDATES.iter().find_map(|token| {
        tokenizer
            .token_to_id(token)
            .map(|id| (id, token.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokenizers::models::wordlevel::WordLevel;

    use super::*;

    fn create_test_tokenizer(with_eos: bool) -> Tokenizer {
        let mut vocab: HashMap<String, u32> = HashMap::new();
        vocab.insert("<unk>".to_string(), 0);
        vocab.insert("hello".to_string(), 1);
        vocab.insert("world".to_string(), 2);
        if with_eos {
            vocab.insert("</s>".to_string(), 3);
        }
        let model = WordLevel::builder()
            .vocab(vocab)
            .unk_token("<unk>".to_string())
            .build()
            .unwrap();
        Tokenizer::new(model)
    }

    #[test]
    fn test_missing_file_is_model_error() {
        let result = ChatTokenizer::from_file("does/not/exist/tokenizer.json");
        assert!(matches!(result, Err(EngineError::ModelError { .. })));
    }

    #[test]
    fn test_pad_synthesized_from_eos() {
        let tokenizer = create_test_tokenizer(true);
        assert!(tokenizer.get_padding().is_none());

        let wrapped = ChatTokenizer::from_tokenizer(tokenizer);
        assert_eq!(wrapped.eos_token_id(), Some(3));

        let padding = wrapped.tokenizer.get_padding().unwrap();
        assert_eq!(padding.pad_id, 3);
        assert_eq!(padding.pad_token, "</s>");
    }

    #[test]
    fn test_no_eos_leaves_padding_unset() {
        let wrapped = ChatTokenizer::from_tokenizer(create_test_tokenizer(false));
        assert_eq!(wrapped.eos_token_id(), None);
        assert!(wrapped.tokenizer.get_padding().is_none());
    }

    #[test]
    fn test_fallback_eos_fills_missing_probe() {
        let mut wrapped = ChatTokenizer::from_tokenizer(create_test_tokenizer(false));
        wrapped.set_fallback_eos(2);
        assert_eq!(wrapped.eos_token_id(), Some(2));

        let padding = wrapped.tokenizer.get_padding().unwrap();
        assert_eq!(padding.pad_id, 2);
        assert_eq!(padding.pad_token, "world");
    }

    #[test]
    fn test_fallback_eos_does_not_override_probe() {
        let mut wrapped = ChatTokenizer::from_tokenizer(create_test_tokenizer(true));
        wrapped.set_fallback_eos(1);
        assert_eq!(wrapped.eos_token_id(), Some(3));
        assert_eq!(wrapped.tokenizer.get_padding().unwrap().pad_id, 3);
    }

    #[test]
    fn test_fallback_eos_outside_vocabulary_still_pads() {
        let mut wrapped = ChatTokenizer::from_tokenizer(create_test_tokenizer(false));
        wrapped.set_fallback_eos(99);
        assert_eq!(wrapped.eos_token_id(), Some(99));

        let padding = wrapped.tokenizer.get_padding().unwrap();
        assert_eq!(padding.pad_id, 99);
        assert_eq!(padding.pad_token, "</s>");
    }
}
