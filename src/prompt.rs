//! Conversation prompt templating and response extraction
//!
//! The `"AI:"` delimiter written by [`format_prompt`] is the same one
//! [`extract_response`] searches for; the two sides must change together.

const START_MARKER: &str = "<|startoftext|>";
const HUMAN_MARKER: &str = "Human:";
const AI_MARKER: &str = "AI:";

/// Render a raw user message into the conversation template.
///
/// The message is inserted verbatim, without escaping.
pub fn format_prompt(message: &str) -> String {
    format!("{}Human: {} AI:", START_MARKER, message)
}

/// Isolate the assistant's turn from raw decoded text.
///
/// Everything after the last `"AI:"` is the candidate; if the model kept
/// the dialogue going with another `"Human:"` the candidate is cut right
/// before it. Decodes with no `"AI:"` at all fall back to stripping the
/// formatted prompt from the front. The result is always trimmed and this
/// function never fails; unusable input yields an empty string.
pub fn extract_response(raw: &str, prompt: &str) -> String {
    let candidate = match raw.rfind(AI_MARKER) {
        Some(index) => {
            let after = &raw[index + AI_MARKER.len()..];
            match after.find(HUMAN_MARKER) {
                Some(human) => &after[..human],
                None => after,
            }
        }
        None => after_prompt(raw, prompt),
    };
    candidate.trim().to_string()
}

/// Strip the originating prompt from a template-free decode and trim.
pub fn strip_prompt(raw: &str, prompt: &str) -> String {
    after_prompt(raw, prompt).trim().to_string()
}

// Prefix removal tolerant of decodes that mangled the prompt text: when the
// prompt is not a literal prefix, the same number of characters is skipped
// instead.
fn after_prompt<'a>(raw: &'a str, prompt: &str) -> &'a str {
    if let Some(rest) = raw.strip_prefix(prompt) {
        return rest;
    }
    let skip = prompt.chars().count();
    match raw.char_indices().nth(skip) {
        Some((index, _)) => &raw[index..],
        None => "",
    }
}
