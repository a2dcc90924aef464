//! Language segmentation of mixed Vietnamese/English text.
//!
//! Tokens are whitespace-delimited. A token made only of ASCII letters,
//! digits, hyphens and apostrophes is treated as English; anything else
//! (diacritics, punctuation, other scripts) stays with the Vietnamese voice.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which backend a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Primary, voice-cloned backend.
    #[serde(rename = "vi")]
    Vietnamese,
    /// Secondary, best-effort backend.
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Vietnamese => "vi",
            Language::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A maximal run of tokens sharing one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub language: Language,
    pub text: String,
}

impl Segment {
    pub fn new(language: Language, text: impl Into<String>) -> Self {
        Self {
            language,
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

static LATIN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9'\-]+$").expect("latin word pattern is valid"));

/// Classify a single whitespace-free token.
pub fn classify_token(token: &str) -> Language {
    if LATIN_WORD.is_match(token) {
        Language::English
    } else {
        Language::Vietnamese
    }
}

/// Split `text` into ordered segments, grouping consecutive tokens of the
/// same language. Every token appears exactly once, in source order.
pub fn split_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<(Language, Vec<&str>)> = None;

    for token in text.split_whitespace() {
        let lang = classify_token(token);
        match current.as_mut() {
            Some((cur_lang, words)) if *cur_lang == lang => words.push(token),
            _ => {
                if let Some((cur_lang, words)) = current.take() {
                    segments.push(Segment::new(cur_lang, words.join(" ")));
                }
                current = Some((lang, vec![token]));
            }
        }
    }

    if let Some((cur_lang, words)) = current {
        segments.push(Segment::new(cur_lang, words.join(" ")));
    }

    segments
}
