//! One extraction agent: a single remote session driven from the section
//! listing through every discovered article.
//!
//! # Lifecycle
//!
//! ```text
//! Init -> Connected -> ListingLoaded -> Discovering
//!      -> (Loading -> Extracting -> Translating)* -> Done
//! ```
//!
//! Any state can move to `Failed` on an unrecoverable error: the session
//! cannot be opened, or the listing never shows an item container even with
//! the alternate selector. A failing article only skips that article.
//!
//! Nothing escapes [`Agent::run`]: it always ends in an [`AgentResult`] and
//! always closes its session.

use crate::config::{PacingConfig, SiteProfile};
use crate::discover::discover;
use crate::extract::{ArticleSpecs, try_in_order};
use crate::models::{AgentResult, ArticleRecord, EnvironmentDescriptor, MISSING};
use crate::session::{ElementHandle, Locator, RemoteSession, SessionConnector, SessionError};
use crate::translate::{Translator, translate_or_original};
use crate::utils::truncate_for_log;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Cookie consent buttons, most specific first.
const COOKIE_BUTTONS: [(&str, bool); 4] = [
    ("//button[contains(., 'Aceptar')]", true),
    ("//button[contains(., 'ACEPTAR')]", true),
    ("#didomi-notice-agree-button", false),
    ("button[id*='accept']", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Init,
    Connected,
    ListingLoaded,
    Discovering,
    Loading,
    Extracting,
    Translating,
    Done,
    Failed,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("session setup failed: {0}")]
    SessionSetup(SessionError),
    #[error("listing page did not load: {0}")]
    PageLoadTimeout(SessionError),
    #[error("url discovery failed: {0}")]
    Discovery(SessionError),
    #[error("no result within the global timeout of {0:?}")]
    GlobalTimeout(Duration),
    #[error("agent task aborted: {0}")]
    Aborted(String),
}

/// Delays and wait bounds used by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    pub home_settle: Duration,
    pub cookie_wait: Duration,
    pub listing_settle: Duration,
    pub listing_settle_constrained: Duration,
    pub listing_wait: Duration,
    pub alternate_wait: Duration,
    pub scroll_settle: Duration,
    pub scroll_settle_constrained: Duration,
    pub scroll_step: Duration,
    pub top_settle: Duration,
    pub article_settle: Duration,
    pub poll_interval: Duration,
}

impl Pacing {
    /// No sleeping at all; waits check exactly once.
    pub fn immediate() -> Self {
        Self::from(&PacingConfig {
            home_settle_ms: 0,
            cookie_wait_ms: 0,
            listing_settle_ms: 0,
            listing_settle_constrained_ms: 0,
            listing_wait_ms: 0,
            alternate_wait_ms: 0,
            scroll_settle_ms: 0,
            scroll_settle_constrained_ms: 0,
            scroll_step_ms: 0,
            top_settle_ms: 0,
            article_settle_ms: 0,
            poll_interval_ms: 0,
        })
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(c: &PacingConfig) -> Self {
        let ms = Duration::from_millis;
        Self {
            home_settle: ms(c.home_settle_ms),
            cookie_wait: ms(c.cookie_wait_ms),
            listing_settle: ms(c.listing_settle_ms),
            listing_settle_constrained: ms(c.listing_settle_constrained_ms),
            listing_wait: ms(c.listing_wait_ms),
            alternate_wait: ms(c.alternate_wait_ms),
            scroll_settle: ms(c.scroll_settle_ms),
            scroll_settle_constrained: ms(c.scroll_settle_constrained_ms),
            scroll_step: ms(c.scroll_step_ms),
            top_settle: ms(c.top_settle_ms),
            article_settle: ms(c.article_settle_ms),
            poll_interval: ms(c.poll_interval_ms),
        }
    }
}

/// Read-only settings shared by every agent of a run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub site: SiteProfile,
    pub pacing: Pacing,
    pub specs: ArticleSpecs,
}

/// Markers that occur in `text`, ignoring case.
pub fn markers_found<'a>(text: &str, markers: &'a [String]) -> Vec<&'a str> {
    let text = text.to_lowercase();
    markers
        .iter()
        .map(String::as_str)
        .filter(|marker| text.contains(&marker.to_lowercase()))
        .collect()
}

/// Scroll offsets walked upward after jumping to the bottom: 5/6 .. 1/6.
pub fn upward_scroll_offsets(page_height: u64) -> Vec<u64> {
    let step = page_height / 6;
    (1..=5u64).rev().map(|i| i * step).collect()
}

pub struct Agent {
    environment: EnvironmentDescriptor,
    connector: Arc<dyn SessionConnector>,
    translator: Arc<dyn Translator>,
    settings: Arc<AgentSettings>,
    state: AgentState,
}

impl Agent {
    pub fn new(
        environment: EnvironmentDescriptor,
        connector: Arc<dyn SessionConnector>,
        translator: Arc<dyn Translator>,
        settings: Arc<AgentSettings>,
    ) -> Self {
        Self {
            environment,
            connector,
            translator,
            settings,
            state: AgentState::Init,
        }
    }

    fn advance(&mut self, next: AgentState) {
        debug!(
            env = %self.environment.label,
            from = ?self.state,
            to = ?next,
            "Agent state change"
        );
        self.state = next;
    }

    fn fail(mut self, error: AgentError) -> AgentResult {
        error!(
            env = %self.environment.label,
            state = ?self.state,
            error = %error,
            "Agent failed"
        );
        self.advance(AgentState::Failed);
        AgentResult::failed(self.environment, error)
    }

    /// Scrape up to `max_articles` articles. Never panics on remote errors
    /// and never returns early without closing the session.
    #[instrument(level = "info", skip_all, fields(env = %self.environment.label))]
    pub async fn run(mut self, max_articles: usize) -> AgentResult {
        let mut session = match self.connector.open(&self.environment).await {
            Ok(session) => session,
            Err(e) => return self.fail(AgentError::SessionSetup(e)),
        };
        self.advance(AgentState::Connected);

        let outcome = self.drive(session.as_mut(), max_articles).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Closing session failed");
        }

        match outcome {
            Ok(articles) => {
                self.advance(AgentState::Done);
                info!(count = articles.len(), "Agent completed");
                AgentResult::success(self.environment, articles)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn drive(
        &mut self,
        session: &mut dyn RemoteSession,
        max_articles: usize,
    ) -> Result<Vec<ArticleRecord>, AgentError> {
        let settings = Arc::clone(&self.settings);
        let site = &settings.site;

        self.visit_home(session).await;
        self.load_listing(session).await?;
        self.advance(AgentState::ListingLoaded);
        self.check_language(session).await;
        self.reveal_lazy_content(session).await;

        self.advance(AgentState::Discovering);
        let rules = site.discovery_rules(&self.environment);
        let urls = discover(&*session, &site.containers(), &rules, max_articles)
            .await
            .map_err(AgentError::Discovery)?;

        let mut articles = Vec::with_capacity(urls.len());
        for (idx, url) in urls.iter().enumerate() {
            info!(article = idx + 1, total = urls.len(), %url, "Scraping article");
            match self.scrape_article(session, url).await {
                Ok(article) => articles.push(article),
                Err(e) => warn!(%url, error = %e, "Skipping article"),
            }
        }
        Ok(articles)
    }

    /// Open the home page and dismiss the cookie banner if one shows up.
    async fn visit_home(&self, session: &mut dyn RemoteSession) {
        let pacing = &self.settings.pacing;
        if let Err(e) = session.navigate(&self.settings.site.home_url).await {
            debug!(error = %e, "Home page did not load; continuing to section");
            return;
        }
        sleep(pacing.home_settle).await;

        let session = &*session;
        let candidates: Vec<Locator> = COOKIE_BUTTONS
            .into_iter()
            .map(|(expr, xpath)| {
                if xpath {
                    Locator::xpath(expr)
                } else {
                    Locator::css(expr)
                }
            })
            .collect();
        let accepted = try_in_order(candidates, |locator| async move {
            session
                .wait_for(&locator, pacing.cookie_wait, pacing.poll_interval)
                .await
                .ok()?;
            let button = session.find_all(&locator).await.ok()?.into_iter().next()?;
            session.click(&button).await.ok()?;
            Some(locator)
        })
        .await;

        match accepted {
            Some(locator) => {
                debug!(%locator, "Cookie consent accepted");
                sleep(pacing.top_settle).await;
            }
            None => debug!("No cookie banner found"),
        }
    }

    /// Navigate to the section and wait for at least one item container.
    async fn load_listing(&self, session: &mut dyn RemoteSession) -> Result<(), AgentError> {
        let site = &self.settings.site;
        let pacing = &self.settings.pacing;

        session
            .navigate(&site.section_url)
            .await
            .map_err(AgentError::PageLoadTimeout)?;
        let settle = if self.environment.is_constrained() {
            pacing.listing_settle_constrained
        } else {
            pacing.listing_settle
        };
        sleep(settle).await;

        let primary = Locator::css(&site.item_selector);
        if let Err(e) = session
            .wait_for(&primary, pacing.listing_wait, pacing.poll_interval)
            .await
        {
            warn!(error = %e, "Primary listing wait failed; trying alternate selector");
            let alternate = Locator::css(&site.alternate_wait_selector);
            session
                .wait_for(&alternate, pacing.alternate_wait, pacing.poll_interval)
                .await
                .map_err(AgentError::PageLoadTimeout)?;
        }
        Ok(())
    }

    /// Log the page language and which source-language markers the listing
    /// shows. A mismatch is only a warning.
    async fn check_language(&self, session: &dyn RemoteSession) {
        let lang = match first_match(session, "html").await {
            Some(root) => session.attribute(&root, "lang").await.ok().flatten(),
            None => None,
        };
        let text = match first_match(session, "body").await {
            Some(body) => session.text(&body).await.unwrap_or_default(),
            None => String::new(),
        };
        let found = markers_found(&text, &self.settings.site.language_markers);
        let lang = lang.as_deref().unwrap_or("unset");
        if found.is_empty() {
            warn!(lang, "No source-language markers on the listing");
        } else {
            info!(lang, markers = ?found, "Listing language confirmed");
        }
    }

    /// Scroll bottom, then upward in steps, then top, so lazy items render.
    async fn reveal_lazy_content(&self, session: &mut dyn RemoteSession) {
        let pacing = &self.settings.pacing;
        let settle = if self.environment.is_constrained() {
            pacing.scroll_settle_constrained
        } else {
            pacing.scroll_settle
        };

        run_script(session, "window.scrollTo(0, document.body.scrollHeight);").await;
        sleep(settle).await;

        let height = run_script(session, "return document.body.scrollHeight;")
            .await
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        for offset in upward_scroll_offsets(height) {
            run_script(session, &format!("window.scrollTo(0, {offset});")).await;
            sleep(pacing.scroll_step).await;
        }

        run_script(session, "window.scrollTo(0, 0);").await;
        sleep(pacing.top_settle).await;
        debug!(height, "Lazy content revealed");
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn scrape_article(
        &mut self,
        session: &mut dyn RemoteSession,
        url: &str,
    ) -> Result<ArticleRecord, SessionError> {
        let settings = Arc::clone(&self.settings);

        self.advance(AgentState::Loading);
        session.navigate(url).await?;
        sleep(settings.pacing.article_settle).await;

        self.advance(AgentState::Extracting);
        let fields = settings.specs.extract_all(&*session).await;
        let title = fields.title.unwrap_or_else(|| MISSING.to_string());

        self.advance(AgentState::Translating);
        let title_translated = translate_or_original(
            self.translator.as_ref(),
            &title,
            &settings.site.source_language,
            &settings.site.target_language,
        )
        .await;

        info!(
            title = %truncate_for_log(&title, 80),
            translated = %truncate_for_log(&title_translated, 80),
            has_author = fields.author.is_some(),
            body_chars = fields.body_text.as_ref().map_or(0, |b| b.chars().count()),
            images = fields.image_urls.len(),
            "Extracted article"
        );

        Ok(ArticleRecord {
            source_url: url.to_string(),
            title,
            title_translated,
            author: fields.author,
            body_text: fields.body_text,
            image_urls: fields.image_urls,
            origin_environment: self.environment.label.clone(),
        })
    }
}

async fn first_match(session: &dyn RemoteSession, css: &str) -> Option<ElementHandle> {
    session.find_all(&Locator::css(css)).await.ok()?.into_iter().next()
}

async fn run_script(session: &dyn RemoteSession, script: &str) -> Option<serde_json::Value> {
    match session.execute(script).await {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Script failed");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::AgentStatus;
    use crate::models::tests::env;
    use crate::session::static_html::StaticConnector;
    use crate::translate::{Passthrough, TranslateError};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    pub(crate) const HOME: &str = "https://elpais.com";
    pub(crate) const SECTION: &str = "https://elpais.com/opinion/";

    pub(crate) fn settings() -> Arc<AgentSettings> {
        Arc::new(AgentSettings {
            site: SiteProfile::default(),
            pacing: Pacing::immediate(),
            specs: ArticleSpecs::default(),
        })
    }

    /// Listing page linking to `slugs` plus the article pages themselves.
    pub(crate) fn site_pages(slugs: &[&str]) -> Vec<(String, String)> {
        let items: String = slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<article>
                         <a href="{SECTION}2024-05-01/{slug}.html">Tribuna sobre {slug}</a>
                       </article>"#
                )
            })
            .collect();
        let mut pages = vec![
            (HOME.to_string(), "<html><body>Portada</body></html>".to_string()),
            (SECTION.to_string(), format!("<html><body>{items}</body></html>")),
        ];
        for slug in slugs {
            pages.push((
                format!("{SECTION}2024-05-01/{slug}.html"),
                format!(
                    r#"<html><body><h1>Crisis en {slug}</h1><p class="author">Autora {slug}</p>
                       <img src="https://img.test/{slug}.jpg"></body></html>"#
                ),
            ));
        }
        pages
    }

    pub(crate) struct Echo;

    #[async_trait]
    impl Translator for Echo {
        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            Ok(text.replace("Crisis en", "Crisis in"))
        }
    }

    struct Unavailable;

    #[async_trait]
    impl Translator for Unavailable {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            Err(TranslateError::Status(503))
        }
    }

    /// Static session that logs every script and the final close, and
    /// reports a fixed page height to the scroll pass.
    struct Recording {
        inner: Box<dyn RemoteSession>,
        log: Arc<Mutex<Vec<String>>>,
        page_height: u64,
    }

    #[async_trait]
    impl RemoteSession for Recording {
        async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
            self.inner.navigate(url).await
        }

        async fn current_url(&self) -> Result<String, SessionError> {
            self.inner.current_url().await
        }

        async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
            self.inner.find_all(locator).await
        }

        async fn find_all_within(
            &self,
            parent: &ElementHandle,
            locator: &Locator,
        ) -> Result<Vec<ElementHandle>, SessionError> {
            self.inner.find_all_within(parent, locator).await
        }

        async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
            self.inner.text(element).await
        }

        async fn attribute(
            &self,
            element: &ElementHandle,
            name: &str,
        ) -> Result<Option<String>, SessionError> {
            self.inner.attribute(element, name).await
        }

        async fn execute(&self, script: &str) -> Result<Value, SessionError> {
            self.log.lock().unwrap().push(script.to_string());
            if script.starts_with("return") {
                Ok(json!(self.page_height))
            } else {
                Ok(Value::Null)
            }
        }

        async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
            self.inner.click(element).await
        }

        async fn close(self: Box<Self>) -> Result<(), SessionError> {
            let this = *self;
            this.log.lock().unwrap().push("close".to_string());
            this.inner.close().await
        }
    }

    struct RecordingConnector {
        inner: StaticConnector,
        log: Arc<Mutex<Vec<String>>>,
        page_height: u64,
    }

    impl RecordingConnector {
        fn new(inner: StaticConnector, page_height: u64) -> Self {
            Self {
                inner,
                log: Arc::new(Mutex::new(Vec::new())),
                page_height,
            }
        }

        fn log(&self) -> Arc<Mutex<Vec<String>>> {
            Arc::clone(&self.log)
        }
    }

    #[async_trait]
    impl SessionConnector for RecordingConnector {
        async fn open(
            &self,
            environment: &EnvironmentDescriptor,
        ) -> Result<Box<dyn RemoteSession>, SessionError> {
            let inner = self.inner.open(environment).await?;
            Ok(Box::new(Recording {
                inner,
                log: self.log(),
                page_height: self.page_height,
            }))
        }
    }

    fn agent(connector: StaticConnector, label: &str) -> Agent {
        Agent::new(env(label), Arc::new(connector), Arc::new(Echo), settings())
    }

    #[tokio::test]
    async fn test_agent_scrapes_discovered_articles_in_order() {
        let connector = StaticConnector::with_pages(site_pages(&["agua", "pan", "luz"]));
        let result = agent(connector, "Chrome_Windows").run(5).await;

        assert_eq!(result.status, AgentStatus::Success);
        let titles: Vec<_> = result
            .articles
            .iter()
            .map(|a| a.title_translated.as_str())
            .collect();
        assert_eq!(titles, ["Crisis in agua", "Crisis in pan", "Crisis in luz"]);

        let first = &result.articles[0];
        assert_eq!(first.title, "Crisis en agua");
        assert_eq!(first.author.as_deref(), Some("Autora agua"));
        assert_eq!(first.body_text, None);
        assert_eq!(first.image_urls, ["https://img.test/agua.jpg"]);
        assert_eq!(first.origin_environment, "Chrome_Windows");
    }

    #[tokio::test]
    async fn test_agent_respects_max_articles() {
        let connector = StaticConnector::with_pages(site_pages(&["agua", "pan", "luz"]));
        let result = agent(connector, "Chrome_Windows").run(2).await;
        assert_eq!(result.articles.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_article_is_skipped() {
        let mut pages = site_pages(&["agua", "pan", "luz"]);
        pages.retain(|(url, _)| !url.ends_with("pan.html"));
        let result = agent(StaticConnector::with_pages(pages), "Chrome_Windows")
            .run(5)
            .await;

        assert_eq!(result.status, AgentStatus::Success);
        let urls: Vec<_> = result
            .articles
            .iter()
            .map(|a| a.source_url.as_str())
            .collect();
        assert_eq!(
            urls,
            [
                "https://elpais.com/opinion/2024-05-01/agua.html",
                "https://elpais.com/opinion/2024-05-01/luz.html",
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_without_items_fails_agent() {
        let pages = [
            (HOME, "<html></html>"),
            (SECTION, "<html><body><p>Sin artículos</p></body></html>"),
        ];
        let result = agent(StaticConnector::with_pages(pages), "Chrome_Windows")
            .run(5)
            .await;
        assert_eq!(result.status, AgentStatus::Failed);
        assert!(result.error.unwrap().contains("listing page did not load"));
    }

    #[tokio::test]
    async fn test_alternate_wait_selector_rescues_listing() {
        let listing = format!(
            r#"<div data-dtm-region="portada_articulo">
                 <a href="{SECTION}2024-05-01/alt.html">Tribuna alternativa</a>
               </div>"#
        );
        let pages = [
            (SECTION.to_string(), listing),
            (
                format!("{SECTION}2024-05-01/alt.html"),
                "<h1>Titular alternativo</h1>".to_string(),
            ),
        ];
        let result = Agent::new(
            env("Chrome_Windows"),
            Arc::new(StaticConnector::with_pages(pages)),
            Arc::new(Passthrough),
            settings(),
        )
        .run(5)
        .await;

        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].title_translated, "Titular alternativo");
    }

    #[tokio::test]
    async fn test_missing_title_uses_sentinel() {
        let mut pages = site_pages(&["agua"]);
        pages[2].1 = "<html><body><p>sin titular</p></body></html>".to_string();
        let result = agent(StaticConnector::with_pages(pages), "Chrome_Windows")
            .run(5)
            .await;
        assert_eq!(result.articles[0].title, MISSING);
        assert_eq!(result.articles[0].title_translated, MISSING);
        assert_eq!(result.articles[0].author, None);
    }

    #[tokio::test]
    async fn test_relative_listing_links_are_scraped() {
        let pages = [
            (
                SECTION,
                r#"<html><body><article>
                     <a href="/opinion/2024-05-01/agua.html">Tribuna sobre agua</a>
                   </article></body></html>"#,
            ),
            (
                "https://elpais.com/opinion/2024-05-01/agua.html",
                r#"<h1>Crisis en agua</h1><img src="/fotos/agua.jpg">"#,
            ),
        ];
        let result = agent(StaticConnector::with_pages(pages), "Chrome_Windows")
            .run(5)
            .await;

        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(result.articles.len(), 1);
        let article = &result.articles[0];
        assert_eq!(article.source_url, "https://elpais.com/opinion/2024-05-01/agua.html");
        assert_eq!(article.title_translated, "Crisis in agua");
        assert_eq!(article.image_urls, ["https://elpais.com/fotos/agua.jpg"]);
    }

    #[tokio::test]
    async fn test_scroll_sequence_then_close() {
        let pages = StaticConnector::with_pages(site_pages(&["agua"]));
        let connector = RecordingConnector::new(pages, 600);
        let log = connector.log();
        let result = Agent::new(
            env("Chrome_Windows"),
            Arc::new(connector),
            Arc::new(Echo),
            settings(),
        )
        .run(5)
        .await;

        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(
            *log.lock().unwrap(),
            [
                "window.scrollTo(0, document.body.scrollHeight);",
                "return document.body.scrollHeight;",
                "window.scrollTo(0, 500);",
                "window.scrollTo(0, 400);",
                "window.scrollTo(0, 300);",
                "window.scrollTo(0, 200);",
                "window.scrollTo(0, 100);",
                "window.scrollTo(0, 0);",
                "close",
            ]
        );
    }

    #[tokio::test]
    async fn test_session_closed_when_listing_fails() {
        let pages = [
            (HOME, "<html></html>"),
            (SECTION, "<html><body><p>Sin artículos</p></body></html>"),
        ];
        let connector = RecordingConnector::new(StaticConnector::with_pages(pages), 600);
        let log = connector.log();
        let result = Agent::new(
            env("Chrome_Windows"),
            Arc::new(connector),
            Arc::new(Echo),
            settings(),
        )
        .run(5)
        .await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(*log.lock().unwrap(), ["close"]);
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_original_title() {
        let connector = StaticConnector::with_pages(site_pages(&["agua", "pan"]));
        let result = Agent::new(
            env("Chrome_Windows"),
            Arc::new(connector),
            Arc::new(Unavailable),
            settings(),
        )
        .run(5)
        .await;

        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(result.articles.len(), 2);
        for article in &result.articles {
            assert!(article.title.starts_with("Crisis en"));
            assert_eq!(article.title_translated, article.title);
        }
    }

    #[test]
    fn test_markers_found_ignores_case() {
        let markers = SiteProfile::default().language_markers;
        assert_eq!(
            markers_found("Últimas noticias de OPINIÓN", &markers),
            ["opinión", "noticias", "últimas"]
        );
        assert!(markers_found("Latest news", &markers).is_empty());
    }

    #[test]
    fn test_upward_scroll_offsets() {
        assert_eq!(upward_scroll_offsets(600), vec![500, 400, 300, 200, 100]);
        assert_eq!(upward_scroll_offsets(0), vec![0, 0, 0, 0, 0]);
    }
}
