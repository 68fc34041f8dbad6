//! Intent classification
//!
//! Decision order, first match wins:
//! 1. question-shaped pattern → [`Intent::Question`]
//! 2. transform-shaped pattern → [`Intent::Transform`]
//! 3. names a known table and contains a generic action word → [`Intent::Transform`]
//! 4. starts with a command keyword → [`Intent::Command`]
//! 5. otherwise → [`Intent::Unclear`]
//!
//! Questions are checked first so that ambiguous phrasing ("describe how to
//! clean this") leans toward answering rather than mutating data. The
//! vocabulary lives in a [`PatternSet`] and can be extended from config; the
//! order above cannot.

use once_cell::sync::Lazy;
use regex::Regex;

const QUESTION_PATTERNS: &[&str] = &[
    r"^what\s",
    r"^which\s",
    r"^how\s",
    r"^can you (tell|show|list|explain)",
    r"^tell me",
    r"^show me",
    r"^list\s",
    r"^do(es)?\s.*\?",
    r"^is\s.*\?",
    r"^are\s.*\?",
    r"\?$",
    r"what (are|is) (the|in)",
    r"how many",
    r"tell me about",
    r"explain",
    r"describe",
];

const TRANSFORM_PATTERNS: &[&str] = &[
    r"clean\s",
    r"transform\s",
    r"convert\s",
    r"create\s",
    r"remove\s.*(null|duplicate|dupe)",
    r"dedupe",
    r"deduplicate",
    r"standardize",
    r"normalize",
    r"aggregate",
    r"save (to|into)",
    r"move (to|into)",
    r"filter\s",
    r"(remove|drop|delete)\s.*rows",
    r"(add|create)\s.*column",
    r"rename\s",
    r"cast\s",
    r"join\s",
    r"merge\s",
];

const ACTION_WORDS: &[&str] = &["clean", "fix", "update", "change", "modify", "process"];

/// First words that look like a command even when the literal table missed
const COMMAND_KEYWORDS: &[&str] = &[
    "help", "show", "tables", "describe", "desc", "status", "state", "confirm", "cancel", "sql",
];

const COLUMN_PHRASES: &[&str] = &[
    "column",
    "columns",
    "field",
    "fields",
    "schema",
    "what are the",
    "what is in",
    "structure",
];

const PREVIEW_PHRASES: &[&str] = &[
    "how many rows",
    "row count",
    "how much data",
    "sample",
    "show me data",
    "what does",
    "look like",
    "preview",
];

const LISTING_PHRASES: &[&str] = &[
    "what tables",
    "which tables",
    "available tables",
    "list tables",
    "show tables",
    "tables do",
];

const CAPABILITY_PHRASES: &[&str] = &["what can you", "how do i", "how to", "help me"];

static BUILTIN: Lazy<PatternSet> = Lazy::new(|| PatternSet {
    question: compile_all(QUESTION_PATTERNS),
    transform: compile_all(TRANSFORM_PATTERNS),
    action_words: ACTION_WORDS.iter().map(|w| w.to_string()).collect(),
});

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in intent pattern"))
        .collect()
}

/// What a message is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Question,
    Transform,
    Command,
    Unclear,
}

/// What a question is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionTopic {
    Columns,
    Preview,
    TableListing,
    Capabilities,
    Other,
}

/// Classifier vocabulary
///
/// Patterns are matched against the lower-cased, trimmed message.
#[derive(Debug, Clone)]
pub struct PatternSet {
    question: Vec<Regex>,
    transform: Vec<Regex>,
    action_words: Vec<String>,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PatternSet {
    /// Built-in vocabulary
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// No patterns at all
    pub fn empty() -> Self {
        Self {
            question: Vec::new(),
            transform: Vec::new(),
            action_words: Vec::new(),
        }
    }

    pub fn add_question_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.question.push(Regex::new(pattern)?);
        Ok(())
    }

    pub fn add_transform_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.transform.push(Regex::new(pattern)?);
        Ok(())
    }

    pub fn add_action_word(&mut self, word: &str) {
        let word = word.trim().to_lowercase();
        if !word.is_empty() && !self.action_words.contains(&word) {
            self.action_words.push(word);
        }
    }

    pub fn is_question(&self, normalized: &str) -> bool {
        self.question.iter().any(|re| re.is_match(normalized))
    }

    pub fn is_transform(&self, normalized: &str) -> bool {
        self.transform.iter().any(|re| re.is_match(normalized))
    }

    pub fn has_action_word(&self, normalized: &str) -> bool {
        self.action_words.iter().any(|w| normalized.contains(w.as_str()))
    }
}

/// Pattern-based intent classifier
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    patterns: PatternSet,
}

impl IntentClassifier {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Classify one message
    ///
    /// `names_known_table` is only consulted when rule 3 is reached, so the
    /// warehouse lookup behind it is skipped for clear-cut messages.
    pub fn classify<F>(&self, message: &str, names_known_table: F) -> Intent
    where
        F: FnOnce() -> bool,
    {
        let normalized = normalize(message);

        if self.patterns.is_question(&normalized) {
            return Intent::Question;
        }
        if self.patterns.is_transform(&normalized) {
            return Intent::Transform;
        }
        if self.patterns.has_action_word(&normalized) && names_known_table() {
            return Intent::Transform;
        }

        let first_word = normalized.split_whitespace().next().unwrap_or("");
        if COMMAND_KEYWORDS.contains(&first_word) {
            return Intent::Command;
        }

        // Short or long, an unmatched message is never guessed at
        Intent::Unclear
    }
}

/// Sub-route a question
pub fn question_topic(message: &str) -> QuestionTopic {
    let normalized = normalize(message);
    let mentions = |phrases: &[&str]| phrases.iter().any(|p| normalized.contains(p));

    if mentions(COLUMN_PHRASES) {
        QuestionTopic::Columns
    } else if mentions(PREVIEW_PHRASES) {
        QuestionTopic::Preview
    } else if mentions(LISTING_PHRASES) {
        QuestionTopic::TableListing
    } else if mentions(CAPABILITY_PHRASES) {
        QuestionTopic::Capabilities
    } else {
        QuestionTopic::Other
    }
}

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}
