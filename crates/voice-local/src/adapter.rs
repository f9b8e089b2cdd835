//! Reduces backend events to canonical semantic strings.

use command_grammar::parse_step_id;

use crate::{RecognitionEvent, RecognizerConfig, StepOrder};

/// Filters events by confidence and grammar name and joins the semantic
/// values of the matched steps.
#[derive(Debug, Clone)]
pub struct RecognitionAdapter {
    threshold: f32,
    grammar_name: String,
    order: StepOrder,
}

impl RecognitionAdapter {
    pub fn new(config: &RecognizerConfig, grammar_name: impl Into<String>) -> Self {
        Self {
            threshold: config.confidence_threshold,
            grammar_name: grammar_name.into(),
            order: config.step_order,
        }
    }

    pub fn grammar_name(&self) -> &str {
        &self.grammar_name
    }

    /// Strictly above the threshold and from the expected grammar.
    pub fn accepts(&self, event: &RecognitionEvent) -> bool {
        event.confidence > self.threshold && event.grammar_name == self.grammar_name
    }

    /// The canonical string for an accepted event, or `None` when the event
    /// is filtered out or carries no semantic value.
    pub fn reduce(&self, event: &RecognitionEvent) -> Option<String> {
        if !self.accepts(event) {
            tracing::trace!(
                confidence = event.confidence,
                grammar = %event.grammar_name,
                "recognition discarded"
            );
            return None;
        }

        let mut steps: Vec<_> = event
            .matched_steps
            .iter()
            .filter_map(|step| step.value.as_deref().map(|value| (step.step.as_str(), value)))
            .collect();

        if self.order == StepOrder::SentencePosition {
            steps.sort_by_key(|(id, _)| parse_step_id(id).map_or(usize::MAX, |(_, pos)| pos));
        }

        let text = steps
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            tracing::debug!("recognition matched free speech only");
            return None;
        }
        Some(text)
    }
}
