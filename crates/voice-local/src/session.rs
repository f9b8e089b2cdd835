//! Recognition session: one backend, one grammar, one subscriber.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use command_grammar::{CompiledGrammar, GrammarCompiler};
use uuid::Uuid;

use crate::{
    RecognitionAdapter, RecognitionEvent, RecognizerConfig, Result, SpeechBackend, VoiceError,
};

type Subscriber = Arc<dyn Fn(String) + Send + Sync>;
type SubscriberSlot = Arc<Mutex<Option<Subscriber>>>;

struct SessionState {
    backend: Box<dyn SpeechBackend>,
    grammar: Option<Arc<CompiledGrammar>>,
    listening: bool,
}

/// Owns the backend, the loaded grammar and the subscription.
///
/// `load`, `start` and `stop` run under one lock. Events are reduced by a
/// [`RecognitionAdapter`] on a dispatcher thread and handed to the
/// subscriber; an event in flight while `stop` runs may still be delivered.
pub struct RecognitionSession {
    id: Uuid,
    config: RecognizerConfig,
    state: Mutex<SessionState>,
    subscriber: SubscriberSlot,
}

impl RecognitionSession {
    pub fn new(backend: Box<dyn SpeechBackend>, config: RecognizerConfig) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "recognition session created");
        Self {
            id,
            config,
            state: Mutex::new(SessionState {
                backend,
                grammar: None,
                listening: false,
            }),
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// A compiler configured with this session's grammar name and locale.
    pub fn compiler(&self) -> Result<GrammarCompiler> {
        Ok(self.config.compiler()?)
    }

    pub fn grammar(&self) -> Option<Arc<CompiledGrammar>> {
        self.lock().ok().and_then(|state| state.grammar.clone())
    }

    pub fn is_listening(&self) -> bool {
        self.lock().map(|state| state.listening).unwrap_or(false)
    }

    /// Replaces the loaded grammar.
    ///
    /// A listening session is stopped, every grammar is unloaded, the new one
    /// is loaded and listening resumes with the same subscriber. When the
    /// backend rejects the new grammar the previous one is reloaded and
    /// listening resumes before the error is returned.
    pub fn load(&self, grammar: CompiledGrammar) -> Result<Arc<CompiledGrammar>> {
        let grammar = Arc::new(grammar);
        let mut state = self.lock()?;

        let resume = if state.listening {
            self.stop_locked(&mut state)?
        } else {
            None
        };

        state.backend.unload_all_grammars();
        let previous = state.grammar.take();
        if let Err(e) = state.backend.load_grammar(Arc::clone(&grammar)) {
            tracing::warn!(session = %self.id, grammar = %grammar.name(), "grammar rejected: {}", e);
            if let Err(restore) = self.restore_locked(&mut state, previous, resume) {
                tracing::error!(session = %self.id, "restoring previous grammar failed: {}", restore);
            }
            return Err(e);
        }
        state.grammar = Some(Arc::clone(&grammar));
        tracing::info!(
            session = %self.id,
            grammar = %grammar.name(),
            sentences = grammar.len(),
            "grammar loaded"
        );

        if let Some(subscriber) = resume {
            self.start_locked(&mut state, subscriber)?;
        }
        Ok(grammar)
    }

    /// Starts listening and forwards every accepted recognition to
    /// `subscriber`. Does nothing when already listening.
    pub fn start<F>(&self, subscriber: F) -> Result<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let mut state = self.lock()?;
        if state.listening {
            return Ok(());
        }
        self.start_locked(&mut state, Arc::new(subscriber))
    }

    pub fn stop(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.listening {
            self.stop_locked(&mut state)?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state.lock().map_err(|_| VoiceError::Poisoned)
    }

    fn restore_locked(
        &self,
        state: &mut SessionState,
        previous: Option<Arc<CompiledGrammar>>,
        resume: Option<Subscriber>,
    ) -> Result<()> {
        if let Some(previous) = previous {
            state.backend.load_grammar(Arc::clone(&previous))?;
            state.grammar = Some(previous);
        }
        if let Some(subscriber) = resume {
            self.start_locked(state, subscriber)?;
        }
        Ok(())
    }

    fn start_locked(&self, state: &mut SessionState, subscriber: Subscriber) -> Result<()> {
        let grammar = state.grammar.clone().ok_or(VoiceError::NoGrammar)?;
        let adapter = RecognitionAdapter::new(&self.config, grammar.name());

        let (tx, rx) = mpsc::channel();
        let slot = Arc::clone(&self.subscriber);
        let session = self.id;
        thread::Builder::new()
            .name(format!("recognition-{session}"))
            .spawn(move || dispatch(session, rx, adapter, slot))
            .map_err(|e| VoiceError::Backend(format!("spawning dispatcher: {e}")))?;

        // The dispatcher only reads the slot once the backend emits.
        *self.subscriber.lock().map_err(|_| VoiceError::Poisoned)? = Some(subscriber);

        if let Err(e) = state.backend.start_listening(tx) {
            if let Ok(mut slot) = self.subscriber.lock() {
                *slot = None;
            }
            return Err(e);
        }
        state.listening = true;
        tracing::info!(session = %self.id, grammar = %grammar.name(), "listening");
        Ok(())
    }

    fn stop_locked(&self, state: &mut SessionState) -> Result<Option<Subscriber>> {
        let subscriber = self
            .subscriber
            .lock()
            .map_err(|_| VoiceError::Poisoned)?
            .take();
        state.backend.stop_listening();
        state.listening = false;
        tracing::info!(session = %self.id, "stopped listening");
        Ok(subscriber)
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(session = %self.id, "stopping session on drop: {}", e);
        }
    }
}

fn dispatch(
    session: Uuid,
    events: Receiver<RecognitionEvent>,
    adapter: RecognitionAdapter,
    slot: SubscriberSlot,
) {
    for event in events {
        let Some(text) = adapter.reduce(&event) else {
            continue;
        };
        let subscriber = match slot.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => break,
        };
        match subscriber {
            Some(subscriber) => {
                tracing::debug!(session = %session, result = %text, "recognized");
                subscriber(text);
            }
            None => tracing::debug!(session = %session, "recognition after stop dropped"),
        }
    }
    tracing::debug!(session = %session, grammar = %adapter.grammar_name(), "dispatcher finished");
}
