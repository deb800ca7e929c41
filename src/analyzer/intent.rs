//! Intent classification of user turns
//!
//! A flat, ordered table of (pattern, kind) pairs. A user turn is a question
//! when question markers strictly outnumber confidence markers, an assertion
//! when it has any confidence marker otherwise, and neutral when neither.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Uncertainty about a concept
    Question,
    /// Demonstrated work with a concept
    Confidence,
}

/// Marker table, matched against the lower-cased turn text
static MARKERS: Lazy<Vec<(Regex, MarkerKind)>> = Lazy::new(|| {
    use MarkerKind::{Confidence, Question};
    [
        (r"\bwhat is\b", Question),
        (r"\bhow does\b", Question),
        (r"\bcan you explain\b", Question),
        (r"\bwhy does\b", Question),
        (r"\bi don'?t understand\b", Question),
        (r"\bhelp me understand\b", Question),
        (r"\bwhat'?s the difference\b", Question),
        (r"\bi'?m confused about\b", Question),
        (r"\bwhat does .+ mean\b", Question),
        (r"\bcan you help me\b", Question),
        (r"\bi'?m not sure\b", Question),
        (r"\bwhat'?s .+ for\b", Question),
        (r"\bhow do (i|you|we)\b", Question),
        (r"\bwhy is\b", Question),
        (r"\bwhy do\b", Question),
        (r"\?\n?$", Question),
        (r"(?m)^```", Confidence),
        (r"\bi implemented\b", Confidence),
        (r"\bi wrote\b", Confidence),
        (r"\bi built\b", Confidence),
        (r"\bi created\b", Confidence),
        (r"\bi fixed\b", Confidence),
        (r"\bhere'?s my\b", Confidence),
        (r"\blet me show you\b", Confidence),
        (r"\bthis is how\b", Confidence),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("marker pattern is valid"), kind))
    .collect()
});

/// What a user turn says about the user's grasp of what it mentions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Assertion,
    Neutral,
}

/// How many distinct markers of each kind a text matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerCounts {
    pub questions: usize,
    pub confidence: usize,
}

impl MarkerCounts {
    pub fn intent(&self) -> Intent {
        if self.questions > self.confidence {
            Intent::Question
        } else if self.confidence > 0 {
            Intent::Assertion
        } else {
            Intent::Neutral
        }
    }
}

/// Count marker patterns matching `text`
pub fn count_markers(text: &str) -> MarkerCounts {
    let lower = text.to_lowercase();
    let mut counts = MarkerCounts::default();
    for (pattern, kind) in MARKERS.iter() {
        if pattern.is_match(&lower) {
            match kind {
                MarkerKind::Question => counts.questions += 1,
                MarkerKind::Confidence => counts.confidence += 1,
            }
        }
    }
    counts
}

pub fn classify(text: &str) -> Intent {
    count_markers(text).intent()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions() {
        assert_eq!(classify("What is gradient descent?"), Intent::Question);
        assert_eq!(classify("How does backpropagation work?"), Intent::Question);
        assert_eq!(classify("Can you help me with this?"), Intent::Question);
        assert_eq!(classify("I don't understand regularization"), Intent::Question);
        assert_eq!(classify("i dont understand regularization"), Intent::Question);
        assert_eq!(classify("What does dropout mean in practice"), Intent::Question);
    }

    #[test]
    fn test_assertions() {
        let text = "Here's my implementation:\n```python\ndef train(): pass\n```";
        assert_eq!(classify(text), Intent::Assertion);
        assert_eq!(classify("I implemented the loss function"), Intent::Assertion);
        assert_eq!(classify("I FIXED the tokenizer"), Intent::Assertion);
    }

    #[test]
    fn test_neutral() {
        assert_eq!(classify("Let's work on this next"), Intent::Neutral);
        assert_eq!(classify(""), Intent::Neutral);
    }

    #[test]
    fn test_equal_counts_favor_assertion() {
        // one question marker (trailing ?) against one confidence marker
        let counts = count_markers("I wrote the cache, does it look right?");
        assert_eq!(counts, MarkerCounts { questions: 1, confidence: 1 });
        assert_eq!(counts.intent(), Intent::Assertion);
    }

    #[test]
    fn test_more_questions_win() {
        let counts = count_markers("I wrote this but why does it fail?");
        assert_eq!(counts.questions, 2);
        assert_eq!(counts.confidence, 1);
        assert_eq!(counts.intent(), Intent::Question);
    }

    #[test]
    fn test_code_fence_must_start_a_line() {
        assert_eq!(count_markers("inline ``` fence").confidence, 0);
        assert_eq!(count_markers("look:\n```\nx = 1\n```").confidence, 1);
    }
}
