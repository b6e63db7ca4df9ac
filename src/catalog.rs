use serde::{Deserialize, Serialize};

/// Kind of learnable content in the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    #[default]
    Word,
    Sentence,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Word => "word",
            ItemKind::Sentence => "sentence",
        }
    }

    pub fn from(s: &str) -> Option<Self> {
        match s {
            "word" => Some(ItemKind::Word),
            "sentence" => Some(ItemKind::Sentence),
            _ => None,
        }
    }
}

/// A learnable catalog entry: a word or a sentence with its translation.
///
/// `prompt` is the native-language side, `answer` the target-language side.
/// `definition`/`example` are optional enrichment metadata (hangman prefers
/// words that carry them); `tense` applies to sentences only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewableItem {
    pub id: i64,
    pub kind: ItemKind,
    pub prompt: String,
    pub answer: String,
    pub level: Option<String>,
    pub category: Option<String>,
    pub definition: Option<String>,
    pub example: Option<String>,
    pub tense: Option<String>,
}

impl ReviewableItem {
    /// True when the answer is a single ASCII-alphabetic token
    pub fn has_single_alphabetic_answer(&self) -> bool {
        let mut tokens = self.answer.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(token), None) => {
                !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
            }
            _ => false,
        }
    }
}

/// Optional narrowing criteria for catalog queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub level: Option<String>,
    pub category: Option<String>,
    pub tense: Option<String>,
}

impl ItemFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn level(level: &str) -> Self {
        Self {
            level: Some(level.to_string()),
            ..Self::default()
        }
    }
}
