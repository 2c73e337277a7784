//! Interactive terminal chatbot against the local model

use chat_engine::{setup_logging, ChatSession, EngineConfig, InferenceEngine, LogConfig};

fn main() -> anyhow::Result<()> {
    setup_logging(LogConfig::default());

    let engine = InferenceEngine::new(EngineConfig::default())?;
    let mut session = ChatSession::new(engine);
    session.run()?;
    Ok(())
}
