//! Data models shared by the agents, the coordinator and the output writers.
//!
//! - [`EnvironmentDescriptor`]: one remote execution target (platform + locale)
//! - [`ArticleRecord`]: a single extracted article
//! - [`AgentResult`]: the terminal outcome of one agent run
//! - [`Corpus`]: the merged, URL-deduplicated article set
//! - [`EnvironmentReport`] / [`RunOutcome`]: what a whole run produces
//!
//! Records are never edited after creation. The merge step only filters.

use crate::analysis::WordFrequencyTable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Rendered in place of a field the extractor could not find.
pub const MISSING: &str = "N/A";

/// Browser, OS and device capabilities requested from the remote grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformCapabilities {
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub browser: String,
    pub browser_version: Option<String>,
    /// Device name for real-device targets, e.g. "iPhone 14".
    pub device: Option<String>,
    pub real_mobile: bool,
    pub resolution: Option<String>,
}

/// Static description of one target execution context.
///
/// Built once from configuration and shared read-only with the agent that
/// runs against it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentDescriptor {
    /// Unique, human readable name, e.g. `Chrome_Windows`.
    pub label: String,
    #[serde(flatten)]
    pub platform: PlatformCapabilities,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "es-ES".to_string()
}

impl EnvironmentDescriptor {
    /// Phones and tablets get longer settle delays and a looser link-text
    /// threshold during discovery.
    pub fn is_constrained(&self) -> bool {
        self.platform.device.is_some() || self.platform.real_mobile
    }
}

/// One article extracted by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub source_url: String,
    /// Title in the site's own language, or [`MISSING`].
    pub title: String,
    pub title_translated: String,
    pub author: Option<String>,
    pub body_text: Option<String>,
    pub image_urls: Vec<String>,
    /// Label of the environment that produced this record.
    pub origin_environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Success,
    Failed,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Success => f.pad("success"),
            AgentStatus::Failed => f.pad("failed"),
        }
    }
}

/// Terminal outcome of a single agent run. Exactly one per environment.
#[derive(Debug, Clone)]
pub struct AgentResult {
    pub environment: EnvironmentDescriptor,
    pub status: AgentStatus,
    pub articles: Vec<ArticleRecord>,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn success(environment: EnvironmentDescriptor, articles: Vec<ArticleRecord>) -> Self {
        Self {
            environment,
            status: AgentStatus::Success,
            articles,
            error: None,
        }
    }

    pub fn failed(environment: EnvironmentDescriptor, error: impl fmt::Display) -> Self {
        Self {
            environment,
            status: AgentStatus::Failed,
            articles: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Deduplicated article set keyed by source URL.
///
/// Insertion order is preserved. When two agents produce the same URL the
/// record merged first is kept untouched; later ones only add their
/// environment label to [`Corpus::seen_by`].
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    articles: Vec<ArticleRecord>,
    keys: HashSet<String>,
    seen_by: HashMap<String, Vec<String>>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless its URL is already present.
    ///
    /// Returns `true` when the record was stored.
    pub fn insert(&mut self, record: ArticleRecord) -> bool {
        self.seen_by
            .entry(record.source_url.clone())
            .or_default()
            .push(record.origin_environment.clone());

        if self.keys.contains(&record.source_url) {
            return false;
        }
        self.keys.insert(record.source_url.clone());
        self.articles.push(record);
        true
    }

    pub fn get(&self, url: &str) -> Option<&ArticleRecord> {
        self.articles.iter().find(|a| a.source_url == url)
    }

    /// Labels of every environment that produced `url`, in merge order.
    pub fn seen_by(&self, url: &str) -> &[String] {
        self.seen_by.get(url).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn articles(&self) -> &[ArticleRecord] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

/// Status line for one environment in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentReport {
    pub environment: String,
    pub status: AgentStatus,
    pub articles_scraped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AgentResult> for EnvironmentReport {
    fn from(result: &AgentResult) -> Self {
        Self {
            environment: result.environment.label.clone(),
            status: result.status,
            articles_scraped: result.articles.len(),
            error: result.error.clone(),
        }
    }
}

/// Everything a coordinator run produces.
#[derive(Debug)]
pub struct RunOutcome {
    pub corpus: Corpus,
    pub word_frequencies: WordFrequencyTable,
    /// One entry per configured environment, in completion order.
    pub environments: Vec<EnvironmentReport>,
    /// Every article from successful agents before deduplication.
    pub all_articles: Vec<ArticleRecord>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn successful(&self) -> usize {
        self.environments
            .iter()
            .filter(|e| e.status == AgentStatus::Success)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &EnvironmentReport> {
        self.environments
            .iter()
            .filter(|e| e.status == AgentStatus::Failed)
    }
}
