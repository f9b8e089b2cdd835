//! Vocabulary phrase templates.
//!
//! A phrase template describes the spoken forms of one concept:
//! `"deploy ?light stick"` is "deploy stick" with an optional "light".

use crate::scan::{Cursor, Rejects, Scan, WILDCARD};

/// One token of a phrase template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhraseToken {
    /// One or more mandatory words, kept together as a single unit
    Word(String),
    /// `...` passed through as literal text
    Wildcard,
    /// A word that may be left out
    OptionalWord(String),
}

impl PhraseToken {
    pub fn text(&self) -> &str {
        match self {
            PhraseToken::Word(text) | PhraseToken::OptionalWord(text) => text,
            PhraseToken::Wildcard => WILDCARD,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, PhraseToken::OptionalWord(_))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '-'
}

/// Scans a phrase template into tokens.
///
/// Token shapes are tried in order: a run of plain words, a wildcard run,
/// then a `?`-prefixed optional word. Whitespace between tokens is skipped;
/// anything else is collected into [`Scan::rejected`].
pub fn scan_phrase(template: &str) -> Scan<PhraseToken> {
    let mut cursor = Cursor::new(template);
    let mut scan = Scan::default();
    let mut rejects = Rejects::default();

    while let Some(c) = cursor.peek() {
        if let Some(run) = word_run(&mut cursor) {
            rejects.flush(&mut scan);
            scan.push(PhraseToken::Word(run));
        } else if cursor.eat_wildcard() {
            rejects.flush(&mut scan);
            scan.push(PhraseToken::Wildcard);
        } else if let Some(word) = optional_word(&mut cursor) {
            rejects.flush(&mut scan);
            scan.push(PhraseToken::OptionalWord(word));
        } else {
            cursor.bump();
            if c.is_whitespace() {
                rejects.flush(&mut scan);
            } else {
                rejects.push(c);
            }
        }
    }
    rejects.flush(&mut scan);
    scan
}

/// `( *word)+`, normalized to single spaces.
fn word_run(cursor: &mut Cursor<'_>) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    loop {
        let save = cursor.pos();
        while cursor.eat(' ') {}
        let word = cursor.eat_while(is_word_char);
        if word.is_empty() {
            cursor.reset(save);
            break;
        }
        words.push(word);
    }
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn optional_word(cursor: &mut Cursor<'_>) -> Option<String> {
    if cursor.peek() != Some('?') || !cursor.peek_second().is_some_and(is_word_char) {
        return None;
    }
    cursor.bump();
    Some(cursor.eat_while(is_word_char).to_string())
}

/// Scans a phrase template, reporting and skipping unrecognized text.
pub fn tokenize_phrase(template: &str) -> Vec<PhraseToken> {
    let scan = scan_phrase(template);
    for fragment in &scan.rejected {
        tracing::warn!(template, fragment = %fragment, "unrecognized text in phrase template, skipped");
    }
    scan.tokens
}

/// Enumerates every literal word sequence the tokens can stand for.
///
/// Each optional token doubles the variant count; the variant where every
/// token was left out is dropped.
pub fn expand_phrase(tokens: &[PhraseToken]) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();

    for token in tokens {
        let text = token.text();

        if variants.is_empty() {
            variants.push(text.to_string());
            if token.is_optional() {
                variants.push(String::new());
            }
            continue;
        }

        let without = token.is_optional().then(|| variants.clone());
        for variant in variants.iter_mut() {
            if !variant.is_empty() && !variant.ends_with(' ') {
                variant.push(' ');
            }
            variant.push_str(text);
        }
        if let Some(without) = without {
            variants.extend(without);
        }
    }

    variants.retain(|variant| !variant.is_empty());
    variants
}

/// Tokenizes and expands one phrase template.
pub fn compile_phrase(template: &str) -> Vec<String> {
    expand_phrase(&tokenize_phrase(template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_word_runs_merge() {
        assert_eq!(
            tokenize_phrase("deploy   light stick"),
            vec![PhraseToken::Word("deploy light stick".to_string())]
        );
    }

    #[test]
    fn test_optional_splits_runs() {
        assert_eq!(
            tokenize_phrase("deploy ?light stick ?and"),
            vec![
                PhraseToken::Word("deploy".to_string()),
                PhraseToken::OptionalWord("light".to_string()),
                PhraseToken::Word("stick".to_string()),
                PhraseToken::OptionalWord("and".to_string()),
            ]
        );
    }

    #[test]
    fn test_chained_optionals() {
        assert_eq!(
            tokenize_phrase("?hey?there"),
            vec![
                PhraseToken::OptionalWord("hey".to_string()),
                PhraseToken::OptionalWord("there".to_string()),
            ]
        );
    }

    #[test]
    fn test_wildcard_and_rejects() {
        let scan = scan_phrase("say ...... now! #");
        assert_eq!(
            scan.tokens,
            vec![
                PhraseToken::Word("say".to_string()),
                PhraseToken::Wildcard,
                PhraseToken::Word("now".to_string()),
            ]
        );
        assert_eq!(scan.rejected, vec!["!".to_string(), "#".to_string()]);
    }

    #[test]
    fn test_apostrophes_stay_in_words() {
        assert_eq!(compile_phrase("let's go"), vec!["let's go".to_string()]);
    }

    #[test]
    fn test_deploy_light() {
        assert_eq!(
            compile_phrase("deploy ?light"),
            vec!["deploy light".to_string(), "deploy".to_string()]
        );
    }

    #[test]
    fn test_two_optionals_give_four() {
        let variants = compile_phrase("deploy ?light stick ?and");
        assert_eq!(
            variants,
            vec![
                "deploy light stick and".to_string(),
                "deploy stick and".to_string(),
                "deploy light stick".to_string(),
                "deploy stick".to_string(),
            ]
        );
    }

    #[test]
    fn test_leading_optional_has_no_leading_space() {
        assert_eq!(
            compile_phrase("?please stop"),
            vec!["please stop".to_string(), "stop".to_string()]
        );
    }

    #[test]
    fn test_all_optional_drops_empty() {
        let variants = compile_phrase("?go ?now");
        assert_eq!(variants.len(), 3);
        assert!(variants.iter().all(|v| !v.is_empty()));
    }

    #[test]
    fn test_empty_template() {
        assert!(compile_phrase("").is_empty());
        assert!(compile_phrase("  !! ").is_empty());
    }

    #[test]
    fn test_duplicate_words_kept() {
        assert_eq!(
            compile_phrase("go ?go"),
            vec!["go go".to_string(), "go".to_string()]
        );
    }

    proptest! {
        #[test]
        fn optional_tokens_double_variants(
            lead in "[a-z]{1,6}",
            rest in prop::collection::vec((any::<bool>(), "[a-z]{1,6}"), 0..8),
        ) {
            let mut template = lead.clone();
            let mut k = 0u32;
            for (optional, word) in &rest {
                template.push(' ');
                if *optional {
                    template.push('?');
                    k += 1;
                }
                template.push_str(word);
            }
            prop_assert_eq!(compile_phrase(&template).len(), 2usize.pow(k));
        }

        #[test]
        fn mandatory_words_give_one_variant(
            words in prop::collection::vec("[a-z]{1,6}", 1..6),
            gap in " {1,3}",
        ) {
            let template = words.join(&gap);
            prop_assert_eq!(compile_phrase(&template), vec![words.join(" ")]);
        }
    }
}
