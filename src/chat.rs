// Location: src/chat.rs

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::engine::InferenceEngine;
use crate::error::Result;
use crate::model::GenerationParams;

/// How many turns `/history` prints
const HISTORY_DISPLAY_LIMIT: usize = 10;

const HELP_TEXT: &str = "Commands:
  /help              show this message
  /history           show the last 10 turns
  /save              write the transcript to a file
  /clear             forget the conversation so far
  /creative <text>   continue <text> without the chat template
  /quit              leave the session";

/// One completed exchange in an interactive session
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// When the exchange happened
    pub timestamp: DateTime<Local>,
    /// What the user typed
    pub user_text: String,
    /// What the model answered
    pub ai_text: String,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    History,
    Save,
    Clear,
    Creative(String),
    Quit,
    Message(String),
}

impl Command {
    // Commands match in any case; message and creative text keep their
    // spelling.
    fn parse(line: &str) -> Self {
        if line.eq_ignore_ascii_case("/quit") {
            return Self::Quit;
        }
        if line.eq_ignore_ascii_case("/help") {
            return Self::Help;
        }
        if line.eq_ignore_ascii_case("/history") {
            return Self::History;
        }
        if line.eq_ignore_ascii_case("/save") {
            return Self::Save;
        }
        if line.eq_ignore_ascii_case("/clear") {
            return Self::Clear;
        }
        if let Some(rest) = strip_command_prefix(line, "/creative") {
            if rest.is_empty() || rest.starts_with(' ') {
                return Self::Creative(rest.trim().to_string());
            }
        }
        Self::Message(line.to_string())
    }
}

fn strip_command_prefix<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &line[prefix.len()..])
}

/// Interactive chat loop bound to one resolved model.
///
/// Each turn derives its decode seed from the configured base seed plus
/// the number of generations so far, so replaying the same inputs in a
/// fresh session reproduces the same replies.
pub struct ChatSession {
    engine: InferenceEngine,
    history: Vec<ConversationTurn>,
    generation_calls: u64,
}

impl ChatSession {
    /// Start an empty session around a resolved engine
    pub fn new(engine: InferenceEngine) -> Self {
        Self {
            engine,
            history: Vec::new(),
            generation_calls: 0,
        }
    }

    /// Read lines from stdin and answer them until `/quit` or end of
    /// input
    pub fn run(&mut self) -> io::Result<()> {
        let mut input = io::stdin().lock();
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Chat session ready on {} (/help for commands)",
            device_label(&self.engine)
        )?;

        let mut line = String::new();
        loop {
            write!(out, "You: ")?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out, "Goodbye!")?;
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Command::parse(trimmed) {
                Command::Quit => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                Command::Help => writeln!(out, "{}", HELP_TEXT)?,
                Command::History => write_history(&self.history, &mut out)?,
                Command::Clear => {
                    self.history.clear();
                    writeln!(out, "Conversation history cleared.")?;
                }
                Command::Save => match self.save_transcript() {
                    Ok(path) => writeln!(out, "Conversation saved to {}", path.display())?,
                    Err(err) => writeln!(out, "Error: {}", err)?,
                },
                Command::Creative(text) => {
                    if text.is_empty() {
                        writeln!(out, "Usage: /creative <text>")?;
                    } else {
                        match self.creative_turn(&text) {
                            Ok(reply) => writeln!(out, "AI: {}", reply)?,
                            Err(err) => writeln!(out, "Error: {}", err)?,
                        }
                    }
                }
                Command::Message(text) => match self.chat_turn(&text) {
                    Ok(reply) => writeln!(out, "AI: {}", reply)?,
                    Err(err) => writeln!(out, "Error: {}", err)?,
                },
            }
        }
        Ok(())
    }

    fn chat_turn(&mut self, message: &str) -> Result<String> {
        let params = self.next_params();
        let reply = self.engine.generate_response(message, &params)?;
        self.record_turn(message, &reply);
        Ok(reply)
    }

    fn creative_turn(&mut self, text: &str) -> Result<String> {
        let params = self.next_params();
        let reply = self.engine.generate_creative(text, &params)?;
        self.record_turn(text, &reply);
        Ok(reply)
    }

    fn next_params(&mut self) -> GenerationParams {
        let mut params = GenerationParams::from_config(&self.engine.config().generation);
        params.seed = params.seed.wrapping_add(self.generation_calls);
        self.generation_calls += 1;
        params
    }

    fn record_turn(&mut self, user_text: &str, ai_text: &str) {
        self.history.push(ConversationTurn {
            timestamp: Local::now(),
            user_text: user_text.to_string(),
            ai_text: ai_text.to_string(),
        });
    }

    fn save_transcript(&self) -> io::Result<PathBuf> {
        let name = Local::now()
            .format("conversation_%Y%m%d_%H%M%S.txt")
            .to_string();
        let path = PathBuf::from(name);
        fs::write(&path, format_transcript(&self.history))?;
        Ok(path)
    }
}

fn device_label(engine: &InferenceEngine) -> &'static str {
    if engine.handle().device().is_cuda() {
        "cuda"
    } else {
        "cpu"
    }
}

fn write_history(history: &[ConversationTurn], out: &mut impl Write) -> io::Result<()> {
    if history.is_empty() {
        return writeln!(out, "No conversation history yet.");
    }
    let start = history.len().saturating_sub(HISTORY_DISPLAY_LIMIT);
    for turn in &history[start..] {
        let stamp = turn.timestamp.format("%H:%M:%S");
        writeln!(out, "[{}] You: {}", stamp, turn.user_text)?;
        writeln!(out, "[{}] AI: {}", stamp, turn.ai_text)?;
    }
    Ok(())
}

fn format_transcript(history: &[ConversationTurn]) -> String {
    let mut text = String::new();
    for turn in history {
        let stamp = turn.timestamp.format("%H:%M:%S");
        text.push_str(&format!("[{}] You: {}\n", stamp, turn.user_text));
        text.push_str(&format!("[{}] AI: {}\n", stamp, turn.ai_text));
    }
    text
}
