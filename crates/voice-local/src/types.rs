use command_grammar::{GrammarCompiler, DEFAULT_GRAMMAR_NAME, DEFAULT_LOCALE};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// How matched steps are ordered before their values are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOrder {
    /// As the backend reported them
    #[default]
    Reported,
    /// By the position encoded in each step id
    SentencePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    /// Events at or below this confidence are discarded
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f32,
    /// Name the compiled grammar is loaded under
    #[serde(default = "default_grammar_name")]
    pub grammar_name: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub step_order: StepOrder,
}

fn default_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_grammar_name() -> String {
    DEFAULT_GRAMMAR_NAME.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            grammar_name: default_grammar_name(),
            locale: default_locale(),
            step_order: StepOrder::default(),
        }
    }
}

impl RecognizerConfig {
    /// A compiler producing grammars under this config's name and locale.
    pub fn compiler(&self) -> command_grammar::Result<GrammarCompiler> {
        Ok(GrammarCompiler::new(self.grammar_name.clone())?.with_locale(self.locale.clone()))
    }
}

/// One step of a recognized sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedStep {
    /// Position-unique step id, e.g. `subject_all#1`
    pub step: String,
    /// Semantic value; `None` for free speech
    pub value: Option<String>,
}

impl MatchedStep {
    pub fn tagged(step: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            value: Some(value.into()),
        }
    }

    pub fn untagged(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            value: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub confidence: f32,
    pub grammar_name: String,
    pub matched_steps: Vec<MatchedStep>,
    pub ts: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = RecognizerConfig::default();
        assert_eq!(cfg.confidence_threshold, 0.6);
        assert_eq!(cfg.grammar_name, "Command");
        assert_eq!(cfg.locale, "en-US");
        assert_eq!(cfg.step_order, StepOrder::Reported);
    }

    #[test]
    fn test_config_partial_json() {
        let cfg: RecognizerConfig =
            serde_json::from_str(r#"{"step_order":"sentence_position"}"#).unwrap();
        assert_eq!(cfg.step_order, StepOrder::SentencePosition);
        assert_eq!(cfg.grammar_name, "Command");
        assert_eq!(cfg.confidence_threshold, 0.6);
    }

    #[test]
    fn test_compiler_uses_config() {
        let cfg = RecognizerConfig {
            grammar_name: "Orders".to_string(),
            locale: "en-GB".to_string(),
            ..RecognizerConfig::default()
        };
        let compiler = cfg.compiler().unwrap();
        assert_eq!(compiler.name(), "Orders");
        let grammar = compiler.compile_templates(&[], &["halt"]).unwrap();
        assert_eq!(grammar.locale(), "en-GB");
    }
}
