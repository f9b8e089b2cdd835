//! Vocabulary index: every spoken form of every semantic key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::phrase::compile_phrase;

/// A semantic key and one phrase template that says it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub key: String,
    pub template: String,
}

impl VocabularyEntry {
    pub fn new(key: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            template: template.into(),
        }
    }
}

/// Expanded phrase texts grouped by key.
///
/// Buckets keep insertion order and are not deduplicated. Keys iterate in
/// the order they were first inserted.
#[derive(Debug, Default, Clone)]
pub struct VocabularyIndex {
    order: Vec<String>,
    buckets: HashMap<String, Vec<String>>,
}

impl VocabularyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a VocabularyEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Expands the entry's template and appends the texts to its key.
    pub fn insert(&mut self, entry: &VocabularyEntry) {
        let texts = compile_phrase(&entry.template);
        if texts.is_empty() {
            tracing::warn!(key = %entry.key, template = %entry.template, "phrase template expands to nothing");
        }
        self.extend(&entry.key, texts);
    }

    /// Appends already expanded texts to a key.
    pub fn extend(&mut self, key: &str, texts: impl IntoIterator<Item = String>) {
        if !self.buckets.contains_key(key) {
            self.order.push(key.to_string());
        }
        self.buckets.entry(key.to_string()).or_default().extend(texts);
    }

    /// The texts for `key`, or `None` when the key has no texts at all.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.buckets
            .get(key)
            .map(Vec::as_slice)
            .filter(|texts| !texts.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order.iter().filter_map(|key| {
            self.buckets
                .get(key)
                .map(|texts| (key.as_str(), texts.as_slice()))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of texts across all keys.
    pub fn text_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}
