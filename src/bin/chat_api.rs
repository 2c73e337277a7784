//! Single-shot chat API: one JSON request on stdin, one JSON result on
//! stdout, exit code matching the outcome.

use std::io::{self, Read};
use std::process;

use chat_engine::{
    emit_result, run_request, setup_logging, EngineConfig, GenerationResult, InferenceEngine,
    LogConfig,
};

fn main() -> anyhow::Result<()> {
    setup_logging(LogConfig::silent());

    let mut payload = String::new();
    let result = match io::stdin().read_to_string(&mut payload) {
        Ok(_) => run_request(&payload, || InferenceEngine::new(EngineConfig::default())),
        Err(err) => GenerationResult::failure(format!("Failed to read input: {}", err)),
    };

    emit_result(&mut io::stdout().lock(), &result)?;
    process::exit(result.exit_code());
}
