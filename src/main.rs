//! # Section Scout
//!
//! Scrapes the latest articles of one news section across several browser
//! and device environments at once, translates their headlines, and merges
//! everything into one deduplicated corpus with a repeated-word analysis.
//!
//! ## Features
//!
//! - One concurrent agent per environment on a remote WebDriver grid, or a
//!   static HTML backend for local runs
//! - Ordered fallback selectors for title, author, body and images
//! - Best-effort headline translation that never fails the run
//! - JSON and plain-text artifacts plus a per-environment status summary
//!
//! ## Usage
//!
//! ```sh
//! section_scout --config run.yaml --output-dir ./output
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: environments, site profile and pacing from YAML
//! 2. **Agents**: listing load, URL discovery, per-article extraction and
//!    translation, one session per environment
//! 3. **Coordination**: bounded concurrency, global timeout, merge by URL
//! 4. **Output**: JSON corpus files, word frequencies, text report

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod agent;
mod analysis;
mod cli;
mod config;
mod coordinator;
mod discover;
mod extract;
mod models;
mod outputs;
mod session;
mod translate;
mod utils;

use agent::{AgentSettings, Pacing};
use cli::{Backend, Cli};
use config::RunConfig;
use coordinator::Coordinator;
use extract::ArticleSpecs;
use session::SessionConnector;
use session::static_html::StaticConnector;
use session::webdriver::{Credentials, WebDriverConnector};
use translate::{Passthrough, RapidApiTranslator, RetryTranslate, Translator};
use utils::{build_name, ensure_writable_dir};

/// Bound on one HTTP round trip to the grid or a static page.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

fn connector(args: &Cli) -> Result<Arc<dyn SessionConnector>, Box<dyn Error>> {
    match args.backend {
        Backend::Webdriver => {
            let credentials = match (&args.username, &args.access_key) {
                (Some(username), Some(access_key)) => Some(Credentials {
                    username: username.clone(),
                    access_key: access_key.clone(),
                }),
                _ => {
                    warn!("No grid credentials set; connecting to the hub anonymously");
                    None
                }
            };
            let connector = WebDriverConnector::new(
                &args.hub_url,
                credentials,
                build_name(Utc::now()),
                REQUEST_TIMEOUT,
                PAGE_LOAD_TIMEOUT,
            )?;
            Ok(Arc::new(connector))
        }
        Backend::Static => Ok(Arc::new(StaticConnector::http(PAGE_LOAD_TIMEOUT)?)),
    }
}

fn translator(args: &Cli) -> Result<Arc<dyn Translator>, Box<dyn Error>> {
    match &args.rapidapi_key {
        Some(key) => {
            let client = RapidApiTranslator::new(&args.rapidapi_host, key)?;
            info!(host = %args.rapidapi_host, "Headline translation enabled");
            Ok(Arc::new(RetryTranslate::new(client, 2, Duration::from_millis(500))))
        }
        None => {
            warn!("RAPIDAPI_KEY not set; headlines will stay untranslated");
            Ok(Arc::new(Passthrough))
        }
    }
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("section_scout starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, ?args.backend, "Parsed CLI arguments");

    let mut config = RunConfig::load(args.config.as_deref()).await?;
    if let Some(max_articles) = args.max_articles {
        config.max_articles = max_articles;
    }
    if let Some(secs) = args.global_timeout_secs {
        config.global_timeout_secs = secs;
    }
    if args.max_parallel.is_some() {
        config.max_parallel = args.max_parallel;
    }
    if args.backend == Backend::Static {
        // No scripts or consent dialogs without a browser.
        config.pacing.cookie_wait_ms = 0;
    }
    config.validate()?;

    // Early check: ensure the output dir is writable before spending grid time
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let settings = AgentSettings {
        site: config.site.clone(),
        pacing: Pacing::from(&config.pacing),
        specs: ArticleSpecs::default(),
    };
    let coordinator = Coordinator::new(
        connector(&args)?,
        translator(&args)?,
        settings,
        config.global_timeout(),
    )
    .with_max_parallel(config.max_parallel);

    info!(
        environments = config.environments.len(),
        max_articles = config.max_articles,
        section = %config.site.section_url,
        "Starting run"
    );
    let outcome = coordinator.run(&config.environments, config.max_articles).await;

    let written = outputs::write_all(&outcome, &args.output_dir).await?;
    for path in &written {
        info!(path = %path.display(), "Wrote artifact");
    }

    for (word, count) in outcome.word_frequencies.ranked() {
        info!(word, count, "Repeated word");
    }
    for failure in outcome.failures() {
        warn!(
            env = %failure.environment,
            error = failure.error.as_deref().unwrap_or("unknown"),
            "Environment failed"
        );
    }

    info!(
        unique = outcome.corpus.len(),
        successful = outcome.successful(),
        environments = outcome.environments.len(),
        elapsed_secs = outcome.elapsed.as_secs(),
        "section_scout finished"
    );
    Ok(())
}
