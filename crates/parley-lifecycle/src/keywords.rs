// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Closing-phrase detection.

/// A normalized set of phrases that close a conversation when an agent
/// sends them.
///
/// Matching is a case-insensitive substring test against the trimmed body,
/// so `"Ok, /END"` matches the phrase `/end`.
#[derive(Debug, Clone, Default)]
pub struct CloseKeywords {
    phrases: Vec<String>,
}

impl CloseKeywords {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// The first phrase contained in `body`, if any.
    pub fn find(&self, body: &str) -> Option<&str> {
        let normalized = body.trim().to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| normalized.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, body: &str) -> bool {
        self.find(body).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}
