//! Plain-text rendering of a run for people to read.

use crate::models::{MISSING, RunOutcome};
use std::error::Error;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const REPORT_FILE: &str = "articles.txt";

const WIDTH: usize = 80;

fn rule(out: &mut String, c: char) {
    out.extend(std::iter::repeat_n(c, WIDTH));
    out.push('\n');
}

/// Render the deduplicated corpus, the repeated-word analysis and the
/// per-environment status.
pub fn render(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    rule(&mut out, '=');
    out.push_str("SECTION ARTICLES\n");
    rule(&mut out, '=');
    out.push('\n');

    for (idx, article) in outcome.corpus.articles().iter().enumerate() {
        let _ = writeln!(out, "ARTICLE #{}", idx + 1);
        rule(&mut out, '-');
        let _ = writeln!(out, "Title (original):   {}", article.title);
        let _ = writeln!(out, "Title (translated): {}", article.title_translated);
        let _ = writeln!(out, "Author: {}", article.author.as_deref().unwrap_or(MISSING));
        let _ = writeln!(out, "URL: {}", article.source_url);
        let _ = writeln!(
            out,
            "Seen by: {}",
            outcome.corpus.seen_by(&article.source_url).join(", ")
        );
        let _ = writeln!(out, "Images: {}", article.image_urls.len());
        for url in &article.image_urls {
            let _ = writeln!(out, "  - {url}");
        }
        if let Some(body) = &article.body_text {
            out.push('\n');
            out.push_str(body);
            out.push('\n');
        }
        out.push('\n');
    }

    rule(&mut out, '=');
    out.push_str("REPEATED WORDS IN TRANSLATED TITLES (more than twice)\n");
    rule(&mut out, '-');
    if outcome.word_frequencies.is_empty() {
        out.push_str("No words repeated more than twice.\n");
    } else {
        for (word, count) in outcome.word_frequencies.ranked() {
            let _ = writeln!(out, "{word}: {count}");
        }
    }
    out.push('\n');

    rule(&mut out, '=');
    out.push_str("ENVIRONMENTS\n");
    rule(&mut out, '-');
    for report in &outcome.environments {
        let _ = write!(
            out,
            "{:<24} {:<8} {} article(s)",
            report.environment, report.status, report.articles_scraped
        );
        if let Some(error) = &report.error {
            let _ = write!(out, "  [{error}]");
        }
        out.push('\n');
    }
    out.push('\n');
    let _ = writeln!(
        out,
        "TOTAL: {} unique of {} scraped, {}/{} environments succeeded in {:.1}s",
        outcome.corpus.len(),
        outcome.all_articles.len(),
        outcome.successful(),
        outcome.environments.len(),
        outcome.elapsed.as_secs_f64()
    );
    out
}

#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn write_report(
    outcome: &RunOutcome,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(REPORT_FILE);
    info!(path = %path.display(), "Writing text report");
    fs::write(&path, render(outcome)).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::merge;
    use crate::models::AgentResult;
    use crate::models::tests::{env, record};
    use std::time::Duration;

    #[test]
    fn test_render() {
        let url = "https://elpais.com/opinion/2024-05-01/a.html";
        let mut first = record(url, "La crisis", "Chrome_Windows");
        first.title_translated = "The crisis crisis crisis".to_string();
        first.author = Some("Ana Pérez".to_string());
        first.image_urls = vec!["https://img.test/a.jpg".to_string()];

        let outcome = merge(
            vec![
                AgentResult::success(env("Chrome_Windows"), vec![first]),
                AgentResult::success(env("Edge_Windows"), vec![record(url, "dup", "Edge_Windows")]),
                AgentResult::failed(env("iPhone_14_Safari"), "boom"),
            ],
            Duration::from_secs(2),
        );
        let text = render(&outcome);

        assert!(text.contains("ARTICLE #1\n"));
        assert!(!text.contains("ARTICLE #2"));
        assert!(text.contains("Title (translated): The crisis crisis crisis\n"));
        assert!(text.contains("Author: Ana Pérez\n"));
        assert!(text.contains("Seen by: Chrome_Windows, Edge_Windows\n"));
        assert!(text.contains("  - https://img.test/a.jpg\n"));
        assert!(text.contains("crisis: 3\n"));
        assert!(text.contains("[boom]"));
        assert!(text.contains("TOTAL: 1 unique of 2 scraped, 2/3 environments succeeded in 2.0s"));
    }

    #[test]
    fn test_render_empty_run() {
        let outcome = merge(vec![AgentResult::failed(env("A"), "down")], Duration::ZERO);
        let text = render(&outcome);
        assert!(text.contains("No words repeated more than twice."));
        assert!(text.contains("TOTAL: 0 unique of 0 scraped, 0/1 environments succeeded"));
    }
}
