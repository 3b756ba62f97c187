//! Keyword matching against extracted page text

use crate::config::KeywordSets;

/// Tests page text for scanner-app watermark phrases
///
/// Matching is plain substring containment. English phrases are compared
/// case-insensitively; Chinese fragments have no case and match as-is.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    zh: Vec<String>,
    /// Stored lowercased
    en: Vec<String>,
}

impl KeywordMatcher {
    pub fn new(keywords: &KeywordSets) -> Self {
        Self {
            zh: keywords.zh.iter().filter(|k| !k.is_empty()).cloned().collect(),
            en: keywords
                .en
                .iter()
                .filter(|k| !k.is_empty())
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Returns the first keyword found in `text`, if any
    pub fn find(&self, text: &str) -> Option<&str> {
        if let Some(kw) = self.zh.iter().find(|kw| text.contains(kw.as_str())) {
            return Some(kw);
        }
        let lowered = text.to_lowercase();
        self.en
            .iter()
            .find(|kw| lowered.contains(kw.as_str()))
            .map(String::as_str)
    }

    pub fn matches(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(&KeywordSets::default())
    }
}
