//! Grammar compiler: vocabulary plus expanded sentences into one alternation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::sentence::{compile_sentence, ExpandedSentence, SentenceTerm};
use crate::vocabulary::{VocabularyEntry, VocabularyIndex};
use crate::{GrammarError, Result};

pub const DEFAULT_GRAMMAR_NAME: &str = "Command";
pub const DEFAULT_LOCALE: &str = "en-US";

/// One position of a compiled sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarStep {
    /// Free speech up to the next fixed step
    Wildcard,
    /// One of `texts`, reported under `tag`. `id` is unique within the
    /// sentence (`tag#position`) so repeated tags stay distinguishable.
    Choice {
        id: String,
        tag: String,
        texts: Arc<[String]>,
    },
}

impl GrammarStep {
    pub fn id(&self) -> Option<&str> {
        match self {
            GrammarStep::Wildcard => None,
            GrammarStep::Choice { id, .. } => Some(id),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            GrammarStep::Wildcard => None,
            GrammarStep::Choice { tag, .. } => Some(tag),
        }
    }
}

/// Builds the position-unique id of a choice step.
pub fn step_id(tag: &str, position: usize) -> String {
    format!("{tag}#{position}")
}

/// Splits a step id back into its tag and position.
pub fn parse_step_id(id: &str) -> Option<(&str, usize)> {
    let (tag, position) = id.rsplit_once('#')?;
    Some((tag, position.parse().ok()?))
}

/// The steps of one sentence variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSequence {
    steps: Vec<GrammarStep>,
}

impl StepSequence {
    pub fn steps(&self) -> &[GrammarStep] {
        &self.steps
    }
}

impl fmt::Display for StepSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match step {
                GrammarStep::Wildcard => f.write_str("...")?,
                GrammarStep::Choice { id, texts, .. } => {
                    write!(f, "{id}{{{}}}", texts.join("|"))?;
                }
            }
        }
        Ok(())
    }
}

/// An alternation of step sequences under one name.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    name: String,
    locale: String,
    sentences: Vec<StepSequence>,
    choice_count: usize,
}

impl CompiledGrammar {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn sentences(&self) -> &[StepSequence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Literal alternatives over all steps, each wildcard counting as one.
    pub fn choice_count(&self) -> usize {
        self.choice_count
    }
}

#[derive(Debug, Clone)]
pub struct GrammarCompiler {
    name: String,
    locale: String,
}

impl Default for GrammarCompiler {
    fn default() -> Self {
        Self {
            name: DEFAULT_GRAMMAR_NAME.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl GrammarCompiler {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GrammarError::InvalidName(name));
        }
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiles expanded sentences against a vocabulary index.
    ///
    /// Keys missing from the index match their own text. The texts of each
    /// key are allocated once and shared by every step that uses the key.
    pub fn compile(
        &self,
        vocabulary: &VocabularyIndex,
        sentences: &[ExpandedSentence],
    ) -> Result<CompiledGrammar> {
        if sentences.is_empty() {
            return Err(GrammarError::Empty(self.name.clone()));
        }

        let mut cache: HashMap<&str, Arc<[String]>> = HashMap::new();
        let mut choice_count = 0usize;
        let mut compiled = Vec::with_capacity(sentences.len());

        for sentence in sentences {
            let mut steps = Vec::with_capacity(sentence.len());
            for (position, term) in sentence.terms().iter().enumerate() {
                match term {
                    SentenceTerm::Wildcard => {
                        choice_count += 1;
                        steps.push(GrammarStep::Wildcard);
                    }
                    SentenceTerm::Key(key) => {
                        let texts = cache
                            .entry(key.as_str())
                            .or_insert_with(|| match vocabulary.get(key) {
                                Some(texts) => texts.into(),
                                None => {
                                    tracing::debug!(key = %key, "key not in vocabulary, matching it literally");
                                    Arc::from(vec![key.clone()])
                                }
                            })
                            .clone();
                        choice_count += texts.len();
                        steps.push(GrammarStep::Choice {
                            id: step_id(key, position),
                            tag: key.clone(),
                            texts,
                        });
                    }
                }
            }
            compiled.push(StepSequence { steps });
        }

        tracing::info!(
            grammar = %self.name,
            "loaded {} sentences ({} choices)",
            compiled.len(),
            choice_count
        );

        Ok(CompiledGrammar {
            name: self.name.clone(),
            locale: self.locale.clone(),
            sentences: compiled,
            choice_count,
        })
    }

    /// Expands phrase and sentence templates and compiles the result.
    pub fn compile_templates<S: AsRef<str>>(
        &self,
        phrases: &[VocabularyEntry],
        sentences: &[S],
    ) -> Result<CompiledGrammar> {
        let vocabulary = VocabularyIndex::from_entries(phrases);
        let mut expanded: Vec<ExpandedSentence> = Vec::new();
        for template in sentences {
            expanded.extend(compile_sentence(template.as_ref())?);
        }
        self.compile(&vocabulary, &expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(step: &GrammarStep) -> Vec<String> {
        match step {
            GrammarStep::Choice { texts, .. } => texts.to_vec(),
            GrammarStep::Wildcard => Vec::new(),
        }
    }

    #[test]
    fn test_subject_all_grammar() {
        let grammar = GrammarCompiler::default()
            .compile_templates(
                &[
                    VocabularyEntry::new("subject_all", "all"),
                    VocabularyEntry::new("subject_all", "guys"),
                ],
                &["... subject_all"],
            )
            .unwrap();

        assert_eq!(grammar.name(), "Command");
        assert_eq!(grammar.locale(), "en-US");
        assert_eq!(grammar.len(), 1);
        let steps = grammar.sentences()[0].steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0], GrammarStep::Wildcard);
        assert_eq!(steps[1].tag(), Some("subject_all"));
        assert_eq!(steps[1].id(), Some("subject_all#1"));
        assert_eq!(texts(&steps[1]), vec!["all", "guys"]);
        assert_eq!(grammar.choice_count(), 3);
    }

    #[test]
    fn test_unknown_key_matches_itself() {
        let grammar = GrammarCompiler::default()
            .compile_templates(&[], &["please stop"])
            .unwrap();
        let steps = grammar.sentences()[0].steps();
        assert_eq!(steps[0].tag(), Some("please"));
        assert_eq!(texts(&steps[0]), vec!["please"]);
        assert_eq!(texts(&steps[1]), vec!["stop"]);
    }

    #[test]
    fn test_repeated_key_shares_texts_with_distinct_ids() {
        let grammar = GrammarCompiler::default()
            .compile_templates(
                &[VocabularyEntry::new("go", "go ?now")],
                &["go go", "... go"],
            )
            .unwrap();

        let mut shared: Vec<&Arc<[String]>> = Vec::new();
        let mut ids = Vec::new();
        for sentence in grammar.sentences() {
            for step in sentence.steps() {
                if let GrammarStep::Choice { id, texts, .. } = step {
                    shared.push(texts);
                    ids.push(id.clone());
                }
            }
        }
        assert_eq!(ids, vec!["go#0", "go#1", "go#1"]);
        assert!(shared.windows(2).all(|w| Arc::ptr_eq(w[0], w[1])));
    }

    #[test]
    fn test_every_variant_compiled() {
        let sentences = ["?please (go|move) ?(left|right) ...", "stop"];
        let expanded: usize = sentences.iter().map(|s| compile_sentence(s).unwrap().len()).sum();
        let grammar = GrammarCompiler::default()
            .compile_templates(&[VocabularyEntry::new("go", "go")], &sentences)
            .unwrap();
        assert_eq!(expanded, 2 * 2 * 3 + 1);
        assert_eq!(grammar.len(), expanded);
    }

    #[test]
    fn test_empty_grammar_rejected() {
        let err = GrammarCompiler::default()
            .compile_templates::<&str>(&[], &[])
            .unwrap_err();
        assert!(matches!(err, GrammarError::Empty(name) if name == "Command"));
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            GrammarCompiler::new("  "),
            Err(GrammarError::InvalidName(_))
        ));
    }

    #[test]
    fn test_step_id_round_trip() {
        assert_eq!(parse_step_id(&step_id("cmd_go", 3)), Some(("cmd_go", 3)));
        assert_eq!(parse_step_id("no_position"), None);
    }

    #[test]
    fn test_display() {
        let grammar = GrammarCompiler::default()
            .compile_templates(&[VocabularyEntry::new("k", "a ?b")], &["... k"])
            .unwrap();
        assert_eq!(grammar.sentences()[0].to_string(), "... k#1{a b|a}");
    }
}
