use thiserror::Error;

pub type Result<T, E = GrammarError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("no sentence variants to compile into grammar '{0}'")]
    Empty(String),
    #[error("invalid grammar name: {0:?}")]
    InvalidName(String),
    #[error("template pattern failed to build: {0}")]
    Pattern(String),
}
