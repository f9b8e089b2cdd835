//! voice-local: speech backend trait, recognition session and a mock backend
//!
//! A [`RecognitionSession`] loads a compiled command grammar into a
//! [`SpeechBackend`], listens, and turns every accepted recognition into a
//! canonical string of semantic keys for its subscriber.

mod error;
pub use error::{Result, VoiceError};

mod types;
pub use types::{
    MatchedStep, RecognitionEvent, RecognizerConfig, StepOrder, DEFAULT_CONFIDENCE_THRESHOLD,
};

mod traits;
pub use traits::SpeechBackend;

mod adapter;
pub use adapter::RecognitionAdapter;

mod session;
pub use session::RecognitionSession;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockRecognizer, MOCK_CONFIDENCE};
