// Location: src/model/resolver.rs

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::llama::{Config, Llama, LlamaConfig, LlamaEosToks};
use hf_hub::api::sync::Api;
use tracing::{info, warn};

use crate::config::ModelConfig;
use crate::error::{EngineError, ErrorExt, Result};
use crate::model::tokenizer::ChatTokenizer;

/// Loaded tokenizer, weights, and device binding, ready for inference.
/// Immutable after construction.
#[derive(Debug)]
pub struct ModelHandle {
    model: Llama,
    config: Config,
    tokenizer: ChatTokenizer,
    device: Device,
}

impl ModelHandle {
    pub(crate) fn new(
        model: Llama,
        config: Config,
        tokenizer: ChatTokenizer,
        device: Device,
    ) -> Self {
        Self {
            model,
            config,
            tokenizer,
            device,
        }
    }

    pub(crate) fn model(&self) -> &Llama {
        &self.model
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Tokenizer bound to this model
    pub fn tokenizer(&self) -> &ChatTokenizer {
        &self.tokenizer
    }

    /// Compute device the weights live on
    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Loads a ready-to-use model, substituting a baseline model when the
/// primary artifacts are missing or corrupt. Any other load failure
/// propagates to the caller.
pub struct ModelResolver {
    config: ModelConfig,
}

impl ModelResolver {
    /// Create a resolver for the configured model locations
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Resolve a model handle bound to the best available device
    pub fn resolve(&self) -> Result<ModelHandle> {
        let device = best_device();
        info!(cuda = device.is_cuda(), "selected compute device");

        match self.load_primary(&device) {
            Ok(handle) => {
                info!(
                    path = %self.config.primary_dir.display(),
                    "loaded fine-tuned model"
                );
                Ok(handle)
            }
            Err(err) if err.allows_fallback() => {
                warn!(
                    error = %err,
                    fallback = %self.config.fallback_model_id,
                    "primary model unavailable, using baseline"
                );
                let handle = self.load_fallback(&device)?;
                info!(model = %self.config.fallback_model_id, "baseline model ready");
                Ok(handle)
            }
            Err(err) => Err(err),
        }
    }

    fn load_primary(&self, device: &Device) -> Result<ModelHandle> {
        let dir = self.config.primary_dir.as_path();
        let paths = ArtifactPaths::locate(dir)?;
        // Anything wrong inside the directory counts as corrupt artifacts.
        load_artifacts(&paths, device).map_err(|err| match err {
            err @ EngineError::ArtifactError { .. } => err,
            other => artifact_error(dir, other.to_string()),
        })
    }

    fn load_fallback(&self, device: &Device) -> Result<ModelHandle> {
        let paths = self.fetch_fallback()?;
        load_artifacts(&paths, device)
    }

    fn fetch_fallback(&self) -> Result<ArtifactPaths> {
        let model_id = &self.config.fallback_model_id;
        let api = Api::new().map_err(|e| EngineError::ModelError {
            message: format!("Failed to reach the model hub: {}", e),
        })?;
        let repo = api.model(model_id.clone());
        let fetch = |file: &str| -> Result<PathBuf> {
            repo.get(file).map_err(|e| EngineError::ModelError {
                message: format!("Failed to fetch {} for {}: {}", file, model_id, e),
            })
        };
        Ok(ArtifactPaths {
            config: fetch("config.json")?,
            tokenizer: fetch("tokenizer.json")?,
            weights: vec![fetch("model.safetensors")?],
        })
    }
}

/// Locations of the three artifact kinds a model directory must provide
#[derive(Debug)]
struct ArtifactPaths {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: Vec<PathBuf>,
}

impl ArtifactPaths {
    /// Probe a directory for `config.json`, `tokenizer.json`, and at least
    /// one safetensors shard. Shards load in sorted filename order.
    fn locate(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(artifact_error(dir, "directory does not exist"));
        }
        let config = dir.join("config.json");
        let tokenizer = dir.join("tokenizer.json");
        for required in [&config, &tokenizer] {
            if !required.is_file() {
                return Err(artifact_error(
                    dir,
                    format!("missing {}", required.display()),
                ));
            }
        }

        let entries = fs::read_dir(dir)
            .map_err(|e| artifact_error(dir, format!("unreadable directory: {}", e)))?;
        let mut weights = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| artifact_error(dir, format!("unreadable entry: {}", e)))?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "safetensors") {
                weights.push(path);
            }
        }
        weights.sort();
        if weights.is_empty() {
            return Err(artifact_error(dir, "no safetensors weight files"));
        }

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

fn load_artifacts(paths: &ArtifactPaths, device: &Device) -> Result<ModelHandle> {
    let dtype = if device.is_cuda() {
        DType::BF16
    } else {
        DType::F32
    };

    let raw = fs::read_to_string(&paths.config).map_err(|e| EngineError::ModelError {
        message: format!("Failed to read model config: {}", e),
    })?;
    let llama_config: LlamaConfig =
        serde_json::from_str(&raw).map_err(|e| EngineError::ModelError {
            message: format!("Failed to parse model config: {}", e),
        })?;
    let config = llama_config.into_config(false);

    let mut tokenizer = ChatTokenizer::from_file(&paths.tokenizer)?;
    if let Some(id) = config_eos_id(&config) {
        tokenizer.set_fallback_eos(id);
    }

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&paths.weights, dtype, device).map_err(|e| {
            EngineError::ModelError {
                message: format!("Failed to map weights: {}", e),
            }
        })?
    };
    let model = Llama::load(vb, &config).map_err(|e| EngineError::ModelError {
        message: format!("Failed to load model: {}", e),
    })?;

    Ok(ModelHandle::new(model, config, tokenizer, device.clone()))
}

// The config's eos spelling covers tokenizers whose vocabulary does not
// name the token itself.
fn config_eos_id(config: &Config) -> Option<u32> {
    match &config.eos_token_id {
        Some(LlamaEosToks::Single(id)) => Some(*id),
        Some(LlamaEosToks::Multiple(ids)) => ids.first().copied(),
        None => None,
    }
}

fn best_device() -> Device {
    match Device::cuda_if_available(0) {
        Ok(device) => device,
        Err(_) => Device::Cpu,
    }
}

fn artifact_error(dir: &Path, reason: impl Into<String>) -> EngineError {
    EngineError::ArtifactError {
        path: dir.to_path_buf(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), "placeholder").unwrap();
        }
        dir
    }

    #[test]
    fn test_missing_directory_allows_fallback() {
        let err = ArtifactPaths::locate(Path::new("does/not/exist")).unwrap_err();
        assert!(err.allows_fallback());
    }

    #[test]
    fn test_missing_files_allow_fallback() {
        let dir = create_test_dir(&["config.json"]);
        let err = ArtifactPaths::locate(dir.path()).unwrap_err();
        assert!(err.allows_fallback());
        assert!(err.to_string().contains("tokenizer.json"));
    }

    #[test]
    fn test_missing_weights_allow_fallback() {
        let dir = create_test_dir(&["config.json", "tokenizer.json"]);
        let err = ArtifactPaths::locate(dir.path()).unwrap_err();
        assert!(err.to_string().contains("no safetensors"));
    }

    #[test]
    fn test_weight_shards_sorted() {
        let dir = create_test_dir(&[
            "config.json",
            "tokenizer.json",
            "model-00002-of-00002.safetensors",
            "model-00001-of-00002.safetensors",
        ]);
        let paths = ArtifactPaths::locate(dir.path()).unwrap();
        let names: Vec<_> = paths
            .weights
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "model-00001-of-00002.safetensors",
                "model-00002-of-00002.safetensors",
            ]
        );
    }

    #[test]
    fn test_corrupt_primary_classified_for_fallback() {
        // present but unparsable artifacts read as corrupt, not fatal
        let dir = create_test_dir(&["config.json", "tokenizer.json", "model.safetensors"]);
        let resolver = ModelResolver::new(ModelConfig {
            primary_dir: dir.path().to_path_buf(),
            fallback_model_id: "unused/unused".to_string(),
        });
        let err = resolver.load_primary(&Device::Cpu).unwrap_err();
        assert!(err.allows_fallback());
    }

    #[test]
    fn test_config_eos_id() {
        let mut config = Config::config_7b_v1(false);
        config.eos_token_id = None;
        assert_eq!(config_eos_id(&config), None);

        config.eos_token_id = Some(LlamaEosToks::Single(2));
        assert_eq!(config_eos_id(&config), Some(2));

        config.eos_token_id = Some(LlamaEosToks::Multiple(vec![7, 2]));
        assert_eq!(config_eos_id(&config), Some(7));
    }

    #[test]
    fn test_best_device_selection() {
        let device = best_device();
        if !cfg!(feature = "cuda") {
            assert!(!device.is_cuda());
        }
    }
}
