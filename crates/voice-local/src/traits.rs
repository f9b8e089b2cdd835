use std::sync::mpsc::Sender;
use std::sync::Arc;

use command_grammar::CompiledGrammar;

use crate::{RecognitionEvent, Result};

/// A speech engine that recognizes utterances against loaded grammars.
pub trait SpeechBackend: Send {
    /// Load a grammar next to any already loaded ones.
    fn load_grammar(&mut self, grammar: Arc<CompiledGrammar>) -> Result<()>;

    fn unload_all_grammars(&mut self);

    /// Start recognizing. Every recognized utterance is sent on `events`
    /// from the backend's own thread.
    fn start_listening(&mut self, events: Sender<RecognitionEvent>) -> Result<()>;

    /// Stop recognizing and drop the sender given to `start_listening`.
    fn stop_listening(&mut self);

    fn is_listening(&self) -> bool;
}
