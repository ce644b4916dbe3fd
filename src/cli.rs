//! Command-line interface definitions for Section Scout.
//!
//! Flags override values from the optional YAML run configuration. Secrets
//! are read from the environment so they never need to appear on a command
//! line.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which session implementation drives the agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Remote browsers over the W3C WebDriver protocol.
    Webdriver,
    /// Plain HTTP fetches parsed as static HTML. No scripts, no XPath.
    Static,
}

/// Command-line arguments for Section Scout.
///
/// # Examples
///
/// ```sh
/// # Five default environments on the remote grid
/// BROWSERSTACK_USERNAME=me BROWSERSTACK_ACCESS_KEY=secret section_scout -o ./output
///
/// # Local smoke run without a grid
/// section_scout --backend static --max-articles 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the JSON and text artifacts
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Maximum articles each agent scrapes
    #[arg(short, long)]
    pub max_articles: Option<usize>,

    /// Upper bound for the whole run, in seconds
    #[arg(long)]
    pub global_timeout_secs: Option<u64>,

    /// Maximum agents running at once
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Session backend
    #[arg(long, value_enum, default_value_t = Backend::Webdriver)]
    pub backend: Backend,

    /// WebDriver hub endpoint
    #[arg(
        long,
        env = "WEBDRIVER_HUB_URL",
        default_value = "https://hub-cloud.browserstack.com/wd/hub"
    )]
    pub hub_url: String,

    /// Remote grid user name
    #[arg(long, env = "BROWSERSTACK_USERNAME", hide_env_values = true)]
    pub username: Option<String>,

    /// Remote grid access key
    #[arg(long, env = "BROWSERSTACK_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Translation API key; headlines stay untranslated without it
    #[arg(long, env = "RAPIDAPI_KEY", hide_env_values = true)]
    pub rapidapi_key: Option<String>,

    /// Translation API host
    #[arg(long, env = "RAPIDAPI_HOST", default_value = "google-translate113.p.rapidapi.com")]
    pub rapidapi_host: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["section_scout"]);
        assert_eq!(cli.output_dir, PathBuf::from("output"));
        assert_eq!(cli.backend, Backend::Webdriver);
        assert_eq!(cli.config, None);
        assert_eq!(cli.max_articles, None);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "section_scout",
            "-c",
            "run.yaml",
            "-o",
            "/tmp/out",
            "--max-articles",
            "3",
            "--global-timeout-secs",
            "60",
            "--max-parallel",
            "2",
            "--backend",
            "static",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("run.yaml")));
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.max_articles, Some(3));
        assert_eq!(cli.global_timeout_secs, Some(60));
        assert_eq!(cli.max_parallel, Some(2));
        assert_eq!(cli.backend, Backend::Static);
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["section_scout", "--backend", "selenium"]).is_err());
    }
}
