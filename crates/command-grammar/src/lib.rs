//! command-grammar: compiles voice-command templates into a recognition grammar
//!
//! Two small template languages feed the compiler:
//! - phrase templates (`"deploy ?light stick"`) give the spoken forms of a
//!   semantic key;
//! - sentence templates (`"... ?cmd_please (cmd_go|cmd_move) subject_all"`)
//!   arrange keys into command shapes.
//!
//! Both are expanded combinatorially and assembled into one
//! [`CompiledGrammar`]: an alternation of step sequences where every step is
//! either a wildcard or a tagged choice of literal texts.

mod error;
pub use error::{GrammarError, Result};

mod scan;
pub use scan::{Scan, WILDCARD};

pub mod phrase;
pub use phrase::{compile_phrase, expand_phrase, tokenize_phrase, PhraseToken};

pub mod sentence;
pub use sentence::{
    compile_sentence, expand_sentence, tokenize_sentence, ExpandedSentence, SentenceTerm,
    SentenceToken,
};

mod vocabulary;
pub use vocabulary::{VocabularyEntry, VocabularyIndex};

mod grammar;
pub use grammar::{
    parse_step_id, step_id, CompiledGrammar, GrammarCompiler, GrammarStep, StepSequence,
    DEFAULT_GRAMMAR_NAME, DEFAULT_LOCALE,
};

mod matcher;
pub use matcher::{match_utterance, StepMatch, UtteranceMatch};
