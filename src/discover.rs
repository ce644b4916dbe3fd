//! Candidate article URL discovery on a section listing page.
//!
//! Listing pages mix promotional and category links with real article
//! links. An article link is recognised without fetching it: it lives in the
//! section, carries a `/YYYY-MM-DD/` date segment or a page suffix, does not
//! end in `/`, and has enough visible link text.

use crate::extract::{is_absolute_http, page_base, resolve_http};
use crate::session::{ElementHandle, Locator, RemoteSession, SessionError};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument};
use url::Url;

static DATE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d{4}-\d{2}-\d{2}/").unwrap());

/// Filtering rules for one discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRules {
    /// Path fragment every article URL contains, e.g. `/opinion/`.
    pub section_segment: String,
    /// Suffix of article pages, e.g. `.html`.
    pub page_suffix: String,
    /// Minimum visible link text length in characters.
    pub min_link_text: usize,
}

impl DiscoveryRules {
    /// `true` when the absolute `url` with visible `link_text` looks like a
    /// real article.
    pub fn accepts(&self, url: &str, link_text: &str) -> bool {
        let looks_like_article =
            DATE_SEGMENT.is_match(url) || url.ends_with(self.page_suffix.as_str());
        is_absolute_http(url)
            && url.contains(self.section_segment.as_str())
            && looks_like_article
            && !url.ends_with('/')
            && link_text.trim().chars().count() >= self.min_link_text
    }
}

/// Where item containers live on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLocators {
    pub primary: Locator,
    /// Tried only when the primary locator matches nothing.
    pub alternate: Locator,
}

/// First anchor in `container` whose resolved link passes `rules`.
async fn first_article_link(
    session: &dyn RemoteSession,
    container: &ElementHandle,
    rules: &DiscoveryRules,
    base: Option<&Url>,
) -> Result<Option<String>, SessionError> {
    let anchors = session.find_all_within(container, &Locator::css("a")).await?;
    for anchor in &anchors {
        let Some(href) = session.attribute(anchor, "href").await? else {
            continue;
        };
        let Some(url) = resolve_http(base, &href) else {
            continue;
        };
        let text = session.text(anchor).await?;
        if rules.accepts(&url, &text) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

/// Collect up to `max_count` unique candidate URLs in page order.
///
/// Containers whose anchors cannot be read are skipped. The result depends
/// only on the page content, so repeated calls on an unchanged page agree.
#[instrument(level = "info", skip_all, fields(max_count))]
pub async fn discover(
    session: &dyn RemoteSession,
    containers: &ContainerLocators,
    rules: &DiscoveryRules,
    max_count: usize,
) -> Result<Vec<String>, SessionError> {
    let mut items = session.find_all(&containers.primary).await?;
    if items.is_empty() {
        debug!(
            locator = %containers.alternate,
            "No item containers, trying alternate locator"
        );
        items = session.find_all(&containers.alternate).await?;
    }

    let base = page_base(session).await;
    let mut candidates = Vec::new();
    for item in &items {
        match first_article_link(session, item, rules, base.as_ref()).await {
            Ok(Some(url)) => candidates.push(url),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "Skipping unreadable container"),
        }
    }

    let found = candidates.len();
    let urls: Vec<String> = candidates.into_iter().unique().take(max_count).collect();
    info!(
        containers = items.len(),
        candidates = found,
        selected = urls.len(),
        "Discovered article URLs"
    );
    debug!(urls = ?urls, "Candidate URLs");
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::env;
    use crate::session::SessionConnector;
    use crate::session::static_html::StaticConnector;

    fn rules(min_link_text: usize) -> DiscoveryRules {
        DiscoveryRules {
            section_segment: "/opinion/".to_string(),
            page_suffix: ".html".to_string(),
            min_link_text,
        }
    }

    fn containers() -> ContainerLocators {
        ContainerLocators {
            primary: Locator::css("article"),
            alternate: Locator::css("[data-dtm-region*='articulo']"),
        }
    }

    const LISTING: &str = r#"
      <html><body>
        <article>
          <a href="https://elpais.com/opinion/">Opinión</a>
          <a href="https://elpais.com/opinion/2024-05-01/la-sequia.html">La sequía que viene</a>
          <a href="https://elpais.com/opinion/2024-05-01/otro.html">Segundo enlace largo</a>
        </article>
        <article>
          <a href="https://elpais.com/opinion/2024-05-02/editorial">Editorial del jueves</a>
        </article>
        <article>
          <a href="https://elpais.com/opinion/2024-05-01/la-sequia.html">La sequía que viene</a>
        </article>
        <article>
          <a href="https://elpais.com/deportes/2024-05-01/futbol.html">Fútbol esta tarde</a>
          <a href="/opinion/2024-05-03/relativa.html">Enlace relativo largo</a>
        </article>
        <article>
          <a href="https://elpais.com/opinion/2024-05-04/corta.html">Breve</a>
        </article>
      </body></html>"#;

    async fn listing(html: &str) -> Box<dyn RemoteSession> {
        let connector = StaticConnector::with_pages([("https://elpais.com/opinion/", html)]);
        let mut session = connector.open(&env("test")).await.unwrap();
        session.navigate("https://elpais.com/opinion/").await.unwrap();
        session
    }

    #[test]
    fn test_rules_filtering() {
        let rules = rules(10);
        assert!(rules.accepts("https://elpais.com/opinion/2024-05-01/x", "Long enough text"));
        assert!(rules.accepts("https://elpais.com/opinion/tribuna.html", "Long enough text"));
        assert!(!rules.accepts("https://elpais.com/opinion/2024-05-01/", "Long enough text"));
        assert!(!rules.accepts("https://elpais.com/opinion/tribunas/", "Long enough text"));
        assert!(!rules.accepts("https://elpais.com/opinion/tribuna", "Long enough text"));
        assert!(!rules.accepts("https://elpais.com/opinion/2024-05-01/x", "Short"));
        assert!(!rules.accepts("https://elpais.com/cultura/2024-05-01/x", "Long enough text"));
        assert!(!rules.accepts("/opinion/2024-05-01/x.html", "Long enough text"));
    }

    #[tokio::test]
    async fn test_discover_first_link_per_container_dedup_and_order() {
        let session = listing(LISTING).await;
        let urls = discover(session.as_ref(), &containers(), &rules(10), 10)
            .await
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://elpais.com/opinion/2024-05-01/la-sequia.html",
                "https://elpais.com/opinion/2024-05-02/editorial",
                "https://elpais.com/opinion/2024-05-03/relativa.html",
            ]
        );
    }

    #[tokio::test]
    async fn test_constrained_threshold_admits_short_text() {
        let session = listing(LISTING).await;
        let urls = discover(session.as_ref(), &containers(), &rules(5), 10)
            .await
            .unwrap();
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[3], "https://elpais.com/opinion/2024-05-04/corta.html");
    }

    #[tokio::test]
    async fn test_discover_truncates_and_is_repeatable() {
        let session = listing(LISTING).await;
        let first = discover(session.as_ref(), &containers(), &rules(10), 1)
            .await
            .unwrap();
        let second = discover(session.as_ref(), &containers(), &rules(10), 1)
            .await
            .unwrap();
        assert_eq!(first, vec!["https://elpais.com/opinion/2024-05-01/la-sequia.html"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_alternate_containers() {
        let html = r#"<div data-dtm-region="portada_articulo">
            <a href="https://elpais.com/opinion/2024-06-01/alt.html">Artículo alternativo</a>
          </div>"#;
        let session = listing(html).await;
        let urls = discover(session.as_ref(), &containers(), &rules(10), 5)
            .await
            .unwrap();
        assert_eq!(urls, vec!["https://elpais.com/opinion/2024-06-01/alt.html"]);
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_listing() {
        let html = r#"<article>
            <a href="/opinion/2024-06-02/tribuna.html">Tribuna del domingo</a>
          </article>
          <article>
            <a href="2024-06-03/carta.html">Carta de la directora</a>
          </article>
          <article>
            <a href="javascript:void(0)">Compartir este artículo</a>
          </article>"#;
        let session = listing(html).await;
        let urls = discover(session.as_ref(), &containers(), &rules(10), 5)
            .await
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://elpais.com/opinion/2024-06-02/tribuna.html",
                "https://elpais.com/opinion/2024-06-03/carta.html",
            ]
        );
    }
}
