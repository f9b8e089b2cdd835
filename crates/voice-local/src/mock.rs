use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use command_grammar::{match_utterance, step_id, CompiledGrammar, WILDCARD};
use time::OffsetDateTime;

use crate::{MatchedStep, RecognitionEvent, Result, SpeechBackend, VoiceError};

/// Confidence reported for utterances fed through [`MockHandle::say`].
pub const MOCK_CONFIDENCE: f32 = 0.9;

#[derive(Default)]
struct MockShared {
    grammars: Vec<Arc<CompiledGrammar>>,
    events: Option<Sender<RecognitionEvent>>,
}

/// Backend that "hears" typed text: utterances are matched against the
/// loaded grammars and reported like an acoustic engine would.
pub struct MockRecognizer {
    locale: String,
    shared: Arc<Mutex<MockShared>>,
}

impl MockRecognizer {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            shared: Arc::new(Mutex::new(MockShared::default())),
        }
    }

    /// A handle for feeding utterances from another thread.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl SpeechBackend for MockRecognizer {
    fn load_grammar(&mut self, grammar: Arc<CompiledGrammar>) -> Result<()> {
        if !grammar.locale().eq_ignore_ascii_case(&self.locale) {
            return Err(VoiceError::LocaleMismatch {
                grammar: grammar.locale().to_string(),
                recognizer: self.locale.clone(),
            });
        }
        let mut shared = self.shared.lock().map_err(|_| VoiceError::Poisoned)?;
        shared.grammars.push(grammar);
        Ok(())
    }

    fn unload_all_grammars(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.grammars.clear();
        }
    }

    fn start_listening(&mut self, events: Sender<RecognitionEvent>) -> Result<()> {
        let mut shared = self.shared.lock().map_err(|_| VoiceError::Poisoned)?;
        if shared.grammars.is_empty() {
            return Err(VoiceError::NoGrammar);
        }
        shared.events = Some(events);
        Ok(())
    }

    fn stop_listening(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.events = None;
        }
    }

    fn is_listening(&self) -> bool {
        self.shared
            .lock()
            .map(|shared| shared.events.is_some())
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<MockShared>>,
}

impl MockHandle {
    /// Recognizes `utterance` with [`MOCK_CONFIDENCE`]. Returns whether an
    /// event was emitted.
    pub fn say(&self, utterance: &str) -> bool {
        self.say_with_confidence(utterance, MOCK_CONFIDENCE)
    }

    pub fn say_with_confidence(&self, utterance: &str, confidence: f32) -> bool {
        let Ok(shared) = self.shared.lock() else {
            return false;
        };
        let Some(events) = shared.events.as_ref() else {
            return false;
        };

        let recognized = shared.grammars.iter().find_map(|grammar| {
            match_utterance(grammar, utterance).map(|matched| (grammar.name(), matched))
        });
        let Some((grammar_name, matched)) = recognized else {
            tracing::debug!(utterance, "mock recognizer rejected utterance");
            return false;
        };

        let matched_steps = matched
            .steps
            .into_iter()
            .enumerate()
            .map(|(position, step)| match (step.id, step.tag) {
                (Some(id), Some(tag)) => MatchedStep::tagged(id, tag),
                (id, _) => MatchedStep::untagged(id.unwrap_or_else(|| step_id(WILDCARD, position))),
            })
            .collect();

        let event = RecognitionEvent {
            confidence,
            grammar_name: grammar_name.to_string(),
            matched_steps,
            ts: Some(OffsetDateTime::now_utc()),
        };
        events.send(event).is_ok()
    }

    /// Emits a raw event as if the engine had produced it.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.shared
            .lock()
            .ok()
            .and_then(|shared| shared.events.as_ref().map(|tx| tx.send(event).is_ok()))
            .unwrap_or(false)
    }

    pub fn loaded_grammars(&self) -> usize {
        self.shared
            .lock()
            .map(|shared| shared.grammars.len())
            .unwrap_or(0)
    }
}
