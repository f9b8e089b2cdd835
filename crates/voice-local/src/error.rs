use thiserror::Error;

pub type Result<T, E = VoiceError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("no grammar loaded")]
    NoGrammar,
    #[error("grammar locale {grammar} does not match recognizer locale {recognizer}")]
    LocaleMismatch { grammar: String, recognizer: String },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("session state poisoned")]
    Poisoned,
    #[error(transparent)]
    Grammar(#[from] command_grammar::GrammarError),
}
