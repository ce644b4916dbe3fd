//! JSON artifacts for downstream tooling.
//!
//! Article files are arrays of [`ArticleRecord`](crate::models::ArticleRecord).
//! The summary carries one [`EnvironmentReport`] per configured environment
//! in completion order, and the word frequency file is a flat
//! `{ "word": count }` object.

use crate::models::{EnvironmentReport, RunOutcome};
use chrono::Utc;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

pub const ARTICLES_FILE: &str = "articles.json";
pub const UNIQUE_ARTICLES_FILE: &str = "unique_articles.json";
pub const SUMMARY_FILE: &str = "environment_summary.json";
pub const WORD_FREQUENCY_FILE: &str = "word_frequency.json";

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    generated_at: String,
    elapsed_secs: f64,
    successful: usize,
    failed: usize,
    total_articles: usize,
    unique_articles: usize,
    environments: &'a [EnvironmentReport],
}

impl<'a> From<&'a RunOutcome> for RunSummary<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            successful: outcome.successful(),
            failed: outcome.failures().count(),
            total_articles: outcome.all_articles.len(),
            unique_articles: outcome.corpus.len(),
            environments: &outcome.environments,
        }
    }
}

/// Serialize `value` as pretty JSON to `dir/name`.
pub async fn write_json<T: Serialize + ?Sized>(
    value: &T,
    dir: &Path,
    name: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    let path = dir.join(name);
    info!(path = %path.display(), "Writing JSON");
    if let Err(e) = fs::write(&path, json).await {
        error!(path = %path.display(), error = %e, "Failed to write JSON");
        return Err(e.into());
    }
    Ok(path)
}

/// Write the four JSON artifacts of a run.
///
/// # Returns
///
/// Paths of `articles.json`, `unique_articles.json`,
/// `environment_summary.json` and `word_frequency.json`, in that order.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_run(
    outcome: &RunOutcome,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    fs::create_dir_all(output_dir).await?;
    Ok(vec![
        write_json(&outcome.all_articles, output_dir, ARTICLES_FILE).await?,
        write_json(outcome.corpus.articles(), output_dir, UNIQUE_ARTICLES_FILE).await?,
        write_json(&RunSummary::from(outcome), output_dir, SUMMARY_FILE).await?,
        write_json(&outcome.word_frequencies, output_dir, WORD_FREQUENCY_FILE).await?,
    ])
}
