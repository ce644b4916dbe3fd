//! Run configuration loaded once at startup.
//!
//! The YAML file is optional; every field has a default so a bare run
//! targets the El País opinion section on five desktop and mobile
//! environments.
//!
//! ```yaml
//! max_articles: 5
//! global_timeout_secs: 900
//! environments:
//!   - label: Chrome_Windows
//!     os: Windows
//!     os_version: "11"
//!     browser: Chrome
//!     browser_version: latest
//!     resolution: 1920x1080
//!   - label: iPhone_14_Safari
//!     device: iPhone 14
//!     os_version: "16"
//!     browser: safari
//!     real_mobile: true
//! site:
//!   section_url: https://elpais.com/opinion/
//! ```

use crate::discover::{ContainerLocators, DiscoveryRules};
use crate::models::{EnvironmentDescriptor, PlatformCapabilities};
use crate::session::Locator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The news site and section being scraped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Home page visited first to settle cookie consent.
    pub home_url: String,
    pub section_url: String,
    pub section_segment: String,
    pub page_suffix: String,
    /// CSS selector for listing item containers.
    pub item_selector: String,
    /// Containers used for discovery when `item_selector` matches nothing.
    pub alternate_item_selector: String,
    /// Broader selector waited on when the listing is slow to render.
    pub alternate_wait_selector: String,
    pub min_link_text: usize,
    pub min_link_text_constrained: usize,
    pub source_language: String,
    pub target_language: String,
    /// Words expected somewhere on a listing in the source language. Seeing
    /// none of them is logged, never fatal.
    pub language_markers: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            home_url: "https://elpais.com".to_string(),
            section_url: "https://elpais.com/opinion/".to_string(),
            section_segment: "/opinion/".to_string(),
            page_suffix: ".html".to_string(),
            item_selector: "article".to_string(),
            alternate_item_selector: "[data-dtm-region*='articulo']".to_string(),
            alternate_wait_selector: "article, [data-dtm-region], .article".to_string(),
            min_link_text: 10,
            min_link_text_constrained: 5,
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            language_markers: ["opinión", "noticias", "portada", "últimas"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl SiteProfile {
    pub fn discovery_rules(&self, environment: &EnvironmentDescriptor) -> DiscoveryRules {
        DiscoveryRules {
            section_segment: self.section_segment.clone(),
            page_suffix: self.page_suffix.clone(),
            min_link_text: if environment.is_constrained() {
                self.min_link_text_constrained
            } else {
                self.min_link_text
            },
        }
    }

    pub fn containers(&self) -> ContainerLocators {
        ContainerLocators {
            primary: Locator::css(&self.item_selector),
            alternate: Locator::css(&self.alternate_item_selector),
        }
    }
}

/// Fixed delays and wait bounds, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    pub home_settle_ms: u64,
    pub cookie_wait_ms: u64,
    pub listing_settle_ms: u64,
    pub listing_settle_constrained_ms: u64,
    pub listing_wait_ms: u64,
    pub alternate_wait_ms: u64,
    pub scroll_settle_ms: u64,
    pub scroll_settle_constrained_ms: u64,
    pub scroll_step_ms: u64,
    pub top_settle_ms: u64,
    pub article_settle_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            home_settle_ms: 2_000,
            cookie_wait_ms: 3_000,
            listing_settle_ms: 5_000,
            listing_settle_constrained_ms: 8_000,
            listing_wait_ms: 15_000,
            alternate_wait_ms: 10_000,
            scroll_settle_ms: 2_000,
            scroll_settle_constrained_ms: 4_000,
            scroll_step_ms: 500,
            top_settle_ms: 1_000,
            article_settle_ms: 3_000,
            poll_interval_ms: 250,
        }
    }
}

/// Everything a run needs besides credentials.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub environments: Vec<EnvironmentDescriptor>,
    pub site: SiteProfile,
    pub pacing: PacingConfig,
    pub max_articles: usize,
    pub global_timeout_secs: u64,
    /// Defaults to the number of environments.
    pub max_parallel: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environments: default_environments(),
            site: SiteProfile::default(),
            pacing: PacingConfig::default(),
            max_articles: 5,
            global_timeout_secs: 900,
            max_parallel: None,
        }
    }
}

impl RunConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to the built-in defaults.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using built-in environments");
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_yaml(&text)?;
        info!(environments = config.environments.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn global_timeout(&self) -> Duration {
        Duration::from_secs(self.global_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environments.is_empty() {
            return Err(ConfigError::Invalid("no environments configured".to_string()));
        }
        let mut labels: Vec<&str> =
            self.environments.iter().map(|e| e.label.as_str()).collect();
        labels.sort_unstable();
        if let Some(pair) = labels.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::Invalid(format!(
                "duplicate environment label {}",
                pair[0]
            )));
        }
        if self.max_parallel == Some(0) {
            return Err(ConfigError::Invalid("max_parallel must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn desktop(label: &str, os_version: &str, browser: &str) -> EnvironmentDescriptor {
    EnvironmentDescriptor {
        label: label.to_string(),
        platform: PlatformCapabilities {
            os: Some("Windows".to_string()),
            os_version: Some(os_version.to_string()),
            browser: browser.to_string(),
            browser_version: Some("latest".to_string()),
            resolution: Some("1920x1080".to_string()),
            ..Default::default()
        },
        locale: "es-ES".to_string(),
    }
}

fn device(label: &str, device: &str, os_version: &str, browser: &str) -> EnvironmentDescriptor {
    EnvironmentDescriptor {
        label: label.to_string(),
        platform: PlatformCapabilities {
            os_version: Some(os_version.to_string()),
            browser: browser.to_string(),
            device: Some(device.to_string()),
            real_mobile: true,
            ..Default::default()
        },
        locale: "es-ES".to_string(),
    }
}

/// Three desktop browsers and two real phones.
pub fn default_environments() -> Vec<EnvironmentDescriptor> {
    vec![
        desktop("Chrome_Windows", "11", "Chrome"),
        desktop("Firefox_Windows", "10", "Firefox"),
        desktop("Edge_Windows", "11", "Edge"),
        device("iPhone_14_Safari", "iPhone 14", "16", "safari"),
        device("Samsung_Galaxy_S23", "Samsung Galaxy S23", "13.0", "chrome"),
    ]
}
