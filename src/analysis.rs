//! Word-frequency analytics over translated titles.

use crate::models::ArticleRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-Z]+\b").unwrap());

/// Only words occurring more often than this are kept.
pub const REPEAT_THRESHOLD: usize = 2;

/// Lowercase word to occurrence count, restricted to repeated words.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WordFrequencyTable(BTreeMap<String, usize>);

impl WordFrequencyTable {
    /// Count words across every `title_translated` in `articles`.
    pub fn from_titles<'a, I>(articles: I) -> Self
    where
        I: IntoIterator<Item = &'a ArticleRecord>,
    {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for article in articles {
            let lowered = article.title_translated.to_lowercase();
            for word in WORD.find_iter(&lowered) {
                *counts.entry(word.as_str().to_string()).or_default() += 1;
            }
        }
        counts.retain(|_, count| *count > REPEAT_THRESHOLD);
        Self(counts)
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.0.get(word).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries by descending count, ties broken alphabetically.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<_> = self.0.iter().map(|(w, c)| (w.as_str(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }
}
