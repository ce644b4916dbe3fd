//! Output artifacts written once at the end of a run.
//!
//! # Submodules
//!
//! - [`json`]: machine-readable corpus, summary and word frequency files
//! - [`text`]: human-readable rendering of the corpus and its analysis
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── articles.json             # every article from successful agents
//! ├── unique_articles.json      # deduplicated corpus
//! ├── environment_summary.json  # per-environment status
//! ├── word_frequency.json       # words repeated more than twice
//! └── articles.txt              # text rendering + analysis
//! ```

use crate::models::RunOutcome;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub mod json;
pub mod text;

/// Write every artifact for `outcome` into `output_dir`.
///
/// Returns the written paths in the order listed above.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_all(
    outcome: &RunOutcome,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut written = json::write_run(outcome, output_dir).await?;
    written.push(text::write_report(outcome, output_dir).await?);
    info!(files = written.len(), "Wrote run artifacts");
    Ok(written)
}
