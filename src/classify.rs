//! Heuristic intent classification for chat messages

use serde::{Deserialize, Serialize};

/// Intent category assigned to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Programming and technical questions
    Coding,
    /// Storytelling, writing, and ideation
    Creative,
    /// Explanation and comparison questions
    Analytical,
    /// No category scored above zero
    Default,
}

// Ordered table; earlier entries win score ties.
const MODE_KEYWORDS: &[(Mode, &[&str])] = &[
    (
        Mode::Coding,
        &[
            "code",
            "program",
            "function",
            "debug",
            "python",
            "javascript",
            "html",
            "css",
            "react",
            "node",
            "api",
            "database",
            "sql",
            "algorithm",
            "class",
            "method",
            "variable",
            "loop",
            "if",
        ],
    ),
    (
        Mode::Creative,
        &[
            "story",
            "creative",
            "imagine",
            "design",
            "art",
            "write",
            "poem",
            "song",
            "character",
            "plot",
            "idea",
            "brainstorm",
        ],
    ),
    (
        Mode::Analytical,
        &[
            "analyze",
            "explain",
            "why",
            "how",
            "compare",
            "evaluate",
            "pros",
            "cons",
            "advantage",
            "disadvantage",
            "because",
            "reason",
            "cause",
            "effect",
            "impact",
            "result",
        ],
    ),
];

/// Map a message to its intent category.
///
/// The message is case-folded and each category's keywords are counted as
/// substring occurrences. The strictly highest count wins; a tie keeps the
/// earlier category in the fixed order coding, creative, analytical. When
/// nothing matches the category is [`Mode::Default`].
pub fn classify(message: &str) -> Mode {
    let lowered = message.to_lowercase();
    let mut best = Mode::Default;
    let mut best_score = 0;
    for (mode, keywords) in MODE_KEYWORDS {
        let score = keyword_score(&lowered, keywords);
        if score > best_score {
            best = *mode;
            best_score = score;
        }
    }
    best
}

fn keyword_score(lowered: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .map(|keyword| lowered.matches(keyword).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coding_message() {
        assert_eq!(classify("can you debug this function"), Mode::Coding);
    }

    #[test]
    fn test_creative_message() {
        assert_eq!(classify("write a poem about the moon"), Mode::Creative);
    }

    #[test]
    fn test_analytical_message() {
        assert_eq!(classify("why does this happen"), Mode::Analytical);
    }

    #[test]
    fn test_no_keywords_is_default() {
        assert_eq!(classify("hello"), Mode::Default);
        assert_eq!(classify(""), Mode::Default);
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(classify("DEBUG THIS FUNCTION"), Mode::Coding);
        assert_eq!(classify("Write A Poem"), Mode::Creative);
    }

    #[test]
    fn test_deterministic() {
        let message = "explain how this algorithm works";
        let first = classify(message);
        for _ in 0..10 {
            assert_eq!(classify(message), first);
        }
    }

    #[test]
    fn test_tie_prefers_coding_over_creative() {
        // one coding keyword, one creative keyword
        assert_eq!(classify("debug my story"), Mode::Coding);
    }

    #[test]
    fn test_tie_prefers_creative_over_analytical() {
        // one creative keyword, one analytical keyword
        assert_eq!(classify("write down why"), Mode::Creative);
    }

    #[test]
    fn test_occurrences_counted_not_presence() {
        // two creative hits beat one coding hit
        assert_eq!(classify("a story about a story with a loop"), Mode::Creative);
    }

    #[test]
    fn test_substring_matches_inside_words() {
        // "classify" contains both "class" and "if"
        assert_eq!(classify("classify this"), Mode::Coding);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Coding).unwrap(), "\"coding\"");
        assert_eq!(serde_json::to_string(&Mode::Default).unwrap(), "\"default\"");
    }
}
