//! Runs one agent per environment concurrently and merges their results.
//!
//! # Merge rules
//!
//! | Situation                          | Outcome                                   |
//! |------------------------------------|-------------------------------------------|
//! | Agent finishes with `Success`      | Articles merged in completion order       |
//! | Same URL from two agents           | First merged record kept, later one noted |
//! | Agent fails or panics              | Reported `Failed` with zero articles      |
//! | Global timeout elapses             | Unfinished agents reported `Failed`       |
//!
//! Agents share nothing mutable. The coordinator owns the corpus and only
//! touches it after an agent has returned.

use crate::agent::{Agent, AgentError, AgentSettings};
use crate::analysis::WordFrequencyTable;
use crate::models::{
    AgentResult, AgentStatus, Corpus, EnvironmentDescriptor, EnvironmentReport, RunOutcome,
};
use crate::session::SessionConnector;
use crate::translate::Translator;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tracing::{debug, error, info, instrument, warn};

pub struct Coordinator {
    connector: Arc<dyn SessionConnector>,
    translator: Arc<dyn Translator>,
    settings: Arc<AgentSettings>,
    max_parallel: Option<usize>,
    global_timeout: Duration,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "agent panicked".to_string())
}

impl Coordinator {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        translator: Arc<dyn Translator>,
        settings: AgentSettings,
        global_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            translator,
            settings: Arc::new(settings),
            max_parallel: None,
            global_timeout,
        }
    }

    /// Cap on concurrently running agents. Defaults to one per environment.
    pub fn with_max_parallel(mut self, max_parallel: Option<usize>) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Run every environment and merge the results.
    ///
    /// Always returns an outcome with exactly one report per environment,
    /// even when every agent fails.
    ///
    /// # Arguments
    ///
    /// * `environments` - Targets to run, one agent each
    /// * `max_articles` - Per-agent article cap
    #[instrument(
        level = "info",
        skip_all,
        fields(environments = environments.len(), max_articles)
    )]
    pub async fn run(
        &self,
        environments: &[EnvironmentDescriptor],
        max_articles: usize,
    ) -> RunOutcome {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.global_timeout;
        let limit = self.max_parallel.unwrap_or(environments.len()).max(1);
        let permits = Arc::new(Semaphore::new(limit));
        info!(parallel = limit, timeout = ?self.global_timeout, "Launching agents");

        let mut tasks = JoinSet::new();
        for (idx, environment) in environments.iter().enumerate() {
            let agent = Agent::new(
                environment.clone(),
                Arc::clone(&self.connector),
                Arc::clone(&self.translator),
                Arc::clone(&self.settings),
            );
            let environment = environment.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = permits.acquire_owned().await.ok();
                let result = match AssertUnwindSafe(agent.run(max_articles)).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        AgentResult::failed(environment, AgentError::Aborted(message))
                    }
                };
                (idx, result)
            });
        }

        let mut pending: Vec<Option<&EnvironmentDescriptor>> =
            environments.iter().map(Some).collect();
        let mut results = Vec::with_capacity(environments.len());
        let mut timed_out = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, result)))) => {
                    pending[idx] = None;
                    info!(
                        env = %result.environment.label,
                        status = %result.status,
                        articles = result.articles.len(),
                        "Agent finished"
                    );
                    results.push(result);
                }
                Ok(Some(Err(e))) => error!(error = %e, "Agent task did not complete"),
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    warn!(
                        unfinished = tasks.len(),
                        "Global timeout reached; detaching unfinished agents"
                    );
                    tasks.detach_all();
                    break;
                }
            }
        }

        for environment in pending.into_iter().flatten() {
            let error = if timed_out {
                AgentError::GlobalTimeout(self.global_timeout)
            } else {
                AgentError::Aborted("task ended without a result".to_string())
            };
            results.push(AgentResult::failed(environment.clone(), error));
        }

        let outcome = merge(results, started.elapsed());
        info!(
            unique = outcome.corpus.len(),
            total = outcome.all_articles.len(),
            successful = outcome.successful(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Run complete"
        );
        outcome
    }
}

/// Fold agent results, in the order given, into a [`RunOutcome`].
pub fn merge(results: Vec<AgentResult>, elapsed: Duration) -> RunOutcome {
    let mut corpus = Corpus::new();
    let mut all_articles = Vec::new();
    let mut environments = Vec::with_capacity(results.len());

    for result in results {
        environments.push(EnvironmentReport::from(&result));
        if result.status != AgentStatus::Success {
            continue;
        }
        for article in result.articles {
            all_articles.push(article.clone());
            if !corpus.insert(article) {
                debug!(env = %result.environment.label, "Duplicate URL dropped");
            }
        }
    }

    let word_frequencies = WordFrequencyTable::from_titles(corpus.articles());
    RunOutcome {
        corpus,
        word_frequencies,
        environments,
        all_articles,
        elapsed,
    }
}
