//! Sentence templates.
//!
//! A sentence template is a sequence of semantic keys:
//! `"... ?cmd_please (cmd_move|cmd_go) subject_all"`. Keys name vocabulary
//! entries, `(a|b)` picks one of several keys, `?` makes a key or a group
//! optional and `...` stands for free speech.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::scan::{Cursor, Rejects, Scan, WILDCARD};
use crate::{GrammarError, Result};

/// One token of a sentence template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentenceToken {
    Literal(String),
    Alternatives(Vec<String>),
    OptionalLiteral(String),
    OptionalAlternatives(Vec<String>),
    Wildcard,
}

impl SentenceToken {
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            SentenceToken::OptionalLiteral(_) | SentenceToken::OptionalAlternatives(_)
        )
    }

    /// The terms this token may contribute at its position.
    pub fn choices(&self) -> Vec<SentenceTerm> {
        match self {
            SentenceToken::Literal(key) | SentenceToken::OptionalLiteral(key) => {
                vec![SentenceTerm::Key(key.clone())]
            }
            SentenceToken::Alternatives(keys) | SentenceToken::OptionalAlternatives(keys) => {
                keys.iter().cloned().map(SentenceTerm::Key).collect()
            }
            SentenceToken::Wildcard => vec![SentenceTerm::Wildcard],
        }
    }
}

/// One position of an expanded sentence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SentenceTerm {
    Wildcard,
    Key(String),
}

impl SentenceTerm {
    pub fn as_str(&self) -> &str {
        match self {
            SentenceTerm::Wildcard => WILDCARD,
            SentenceTerm::Key(key) => key,
        }
    }
}

/// A sentence with every alternative and optional resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedSentence {
    terms: Vec<SentenceTerm>,
}

impl ExpandedSentence {
    pub fn new(terms: Vec<SentenceTerm>) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &[SentenceTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for ExpandedSentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(term.as_str())?;
        }
        Ok(())
    }
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Normalizer {
    controls: Regex,
    bar_spaces: Regex,
    space_runs: Regex,
}

impl Normalizer {
    fn new() -> core::result::Result<Self, regex::Error> {
        Ok(Self {
            controls: Regex::new(r"[\n\r\t]")?,
            bar_spaces: Regex::new(r"\|[ ]+")?,
            space_runs: Regex::new(r"[ ]{2,}")?,
        })
    }
}

fn normalizer() -> Result<&'static Normalizer> {
    static NORMALIZER: OnceLock<core::result::Result<Normalizer, regex::Error>> = OnceLock::new();
    NORMALIZER
        .get_or_init(Normalizer::new)
        .as_ref()
        .map_err(|e| GrammarError::Pattern(e.to_string()))
}

/// Strips line breaks and tabs, drops spaces after `|` and collapses runs
/// of spaces.
pub fn normalize_sentence(template: &str) -> Result<String> {
    let normalizer = normalizer()?;
    let stripped = normalizer.controls.replace_all(template, "");
    let bars = normalizer.bar_spaces.replace_all(&stripped, "|");
    Ok(normalizer.space_runs.replace_all(&bars, " ").into_owned())
}

/// Scans a normalized sentence template into tokens.
///
/// Shapes are tried in order: `?(a|b)`, `?key`, `key`, `(a|b)`, `...`.
pub fn scan_sentence(template: &str) -> Scan<SentenceToken> {
    let mut cursor = Cursor::new(template);
    let mut scan = Scan::default();
    let mut rejects = Rejects::default();

    while let Some(c) = cursor.peek() {
        let token = optional_group(&mut cursor)
            .map(SentenceToken::OptionalAlternatives)
            .or_else(|| optional_key(&mut cursor).map(SentenceToken::OptionalLiteral))
            .or_else(|| key(&mut cursor).map(SentenceToken::Literal))
            .or_else(|| group(&mut cursor).map(SentenceToken::Alternatives))
            .or_else(|| cursor.eat_wildcard().then_some(SentenceToken::Wildcard));

        match token {
            Some(token) => {
                rejects.flush(&mut scan);
                scan.push(token);
            }
            None => {
                cursor.bump();
                if c.is_whitespace() {
                    rejects.flush(&mut scan);
                } else {
                    rejects.push(c);
                }
            }
        }
    }
    rejects.flush(&mut scan);
    scan
}

fn key(cursor: &mut Cursor<'_>) -> Option<String> {
    let word = cursor.eat_while(is_key_char);
    (!word.is_empty()).then(|| word.to_string())
}

fn optional_key(cursor: &mut Cursor<'_>) -> Option<String> {
    if cursor.peek() != Some('?') || !cursor.peek_second().is_some_and(is_key_char) {
        return None;
    }
    cursor.bump();
    key(cursor)
}

fn optional_group(cursor: &mut Cursor<'_>) -> Option<Vec<String>> {
    if cursor.peek() != Some('?') || cursor.peek_second() != Some('(') {
        return None;
    }
    let start = cursor.pos();
    cursor.bump();
    let keys = group(cursor);
    if keys.is_none() {
        cursor.reset(start);
    }
    keys
}

/// `(key(|key)*|?)`; restores the cursor on failure.
fn group(cursor: &mut Cursor<'_>) -> Option<Vec<String>> {
    let start = cursor.pos();
    if !cursor.eat('(') {
        return None;
    }
    let mut keys = Vec::new();
    let Some(first) = key(cursor) else {
        cursor.reset(start);
        return None;
    };
    keys.push(first);
    loop {
        cursor.eat('|');
        if cursor.eat(')') {
            return Some(keys);
        }
        match key(cursor) {
            Some(next) => keys.push(next),
            None => {
                cursor.reset(start);
                return None;
            }
        }
    }
}

/// Normalizes and scans a sentence template, reporting and skipping
/// unrecognized text.
pub fn tokenize_sentence(template: &str) -> Result<Vec<SentenceToken>> {
    let normalized = normalize_sentence(template)?;
    let scan = scan_sentence(&normalized);
    for fragment in &scan.rejected {
        tracing::warn!(template, fragment = %fragment, "unrecognized text in sentence template, skipped");
    }
    Ok(scan.tokens)
}

/// Enumerates every key sequence the tokens can stand for.
///
/// A mandatory token multiplies the variant count by its number of
/// alternatives; an optional one by one plus that number.
pub fn expand_sentence(tokens: &[SentenceToken]) -> Vec<ExpandedSentence> {
    let mut variants: Vec<Vec<SentenceTerm>> = Vec::new();
    let mut seeded = false;

    for token in tokens {
        let choices = token.choices();

        if !seeded {
            variants = choices.into_iter().map(|term| vec![term]).collect();
            if token.is_optional() {
                variants.push(Vec::new());
            }
            seeded = true;
            continue;
        }

        let mut next = if token.is_optional() {
            variants.clone()
        } else {
            Vec::with_capacity(variants.len() * choices.len())
        };
        for choice in &choices {
            for existing in &variants {
                let mut variant = existing.clone();
                variant.push(choice.clone());
                next.push(variant);
            }
        }
        variants = next;
    }

    variants.into_iter().map(ExpandedSentence::new).collect()
}

/// Tokenizes and expands one sentence template. Variants with no terms at
/// all cannot be recognized and are dropped with a warning.
pub fn compile_sentence(template: &str) -> Result<Vec<ExpandedSentence>> {
    let mut variants = expand_sentence(&tokenize_sentence(template)?);
    let before = variants.len();
    variants.retain(|variant| !variant.is_empty());
    if variants.len() != before {
        tracing::warn!(template, "sentence template allows an empty utterance, variant dropped");
    }
    Ok(variants)
}
