//! Matches typed utterances against a compiled grammar.

use crate::grammar::{CompiledGrammar, GrammarStep};

/// What one step of the matched sentence consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMatch {
    /// `None` for wildcards
    pub id: Option<String>,
    pub tag: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceMatch {
    /// Index of the matched sentence in the grammar's alternation
    pub sentence: usize,
    /// Matched steps in sentence order
    pub steps: Vec<StepMatch>,
}

/// Finds the first sentence that covers the whole utterance.
///
/// Words compare case-insensitively. A wildcard takes at least one word.
pub fn match_utterance(grammar: &CompiledGrammar, utterance: &str) -> Option<UtteranceMatch> {
    let words: Vec<String> = utterance.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return None;
    }

    grammar
        .sentences()
        .iter()
        .enumerate()
        .find_map(|(index, sentence)| {
            let mut spans = Vec::with_capacity(sentence.steps().len());
            if !match_steps(sentence.steps(), &words, &mut spans) {
                return None;
            }
            let mut start = 0;
            let steps = sentence
                .steps()
                .iter()
                .zip(spans)
                .map(|(step, span)| {
                    let text = words[start..start + span].join(" ");
                    start += span;
                    StepMatch {
                        id: step.id().map(str::to_string),
                        tag: step.tag().map(str::to_string),
                        text,
                    }
                })
                .collect();
            Some(UtteranceMatch {
                sentence: index,
                steps,
            })
        })
}

fn match_steps(steps: &[GrammarStep], words: &[String], spans: &mut Vec<usize>) -> bool {
    let Some((step, rest)) = steps.split_first() else {
        return words.is_empty();
    };

    match step {
        GrammarStep::Wildcard => {
            for take in 1..=words.len() {
                spans.push(take);
                if match_steps(rest, &words[take..], spans) {
                    return true;
                }
                spans.pop();
            }
            false
        }
        GrammarStep::Choice { texts, .. } => {
            for text in texts.iter() {
                let Some(take) = prefix_len(text, words) else {
                    continue;
                };
                spans.push(take);
                if match_steps(rest, &words[take..], spans) {
                    return true;
                }
                spans.pop();
            }
            false
        }
    }
}

/// Number of words `text` covers at the start of `words`, if it matches.
fn prefix_len(text: &str, words: &[String]) -> Option<usize> {
    let mut take = 0;
    for part in text.split_whitespace() {
        let word = words.get(take)?;
        if part.to_lowercase() != *word {
            return None;
        }
        take += 1;
    }
    (take > 0).then_some(take)
}
