//! Field extraction with ordered fallback strategies.
//!
//! Every article attribute is described by a [`FieldSpec`]: an ordered list
//! of [`Strategy`] values, each a locator, a read rule and a validity
//! predicate. [`try_in_order`] consumes them lazily and stops at the first
//! accepted value, so later locators are never queried once one succeeds.
//!
//! A field with no accepted value is simply missing. That is the normal
//! outcome on pages that lack a byline or a lead image, not an error.

use crate::session::{ElementHandle, Locator, RemoteSession, SessionError};
use futures::stream::{self, StreamExt};
use std::future::{Future, ready};
use std::pin::pin;
use tracing::{debug, instrument};
use url::Url;

/// Image attributes in priority order. The last one is a responsive set.
pub const IMAGE_ATTRIBUTES: &[&str] =
    &["src", "data-src", "data-lazy-src", "currentSrc", "srcset"];

/// How to turn a located element into a candidate value.
#[derive(Debug, Clone, Copy)]
pub enum ReadRule {
    /// Visible text, trimmed.
    Text,
    /// First attribute in the list that resolves to an absolute HTTP(S) URL
    /// against the current page.
    UrlAttribute(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub locator: Locator,
    pub read: ReadRule,
    pub accept: fn(&str) -> bool,
}

/// Ordered strategies for one article attribute.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub strategies: Vec<Strategy>,
}

impl FieldSpec {
    fn text(name: &'static str, selectors: &[&str], accept: fn(&str) -> bool) -> Self {
        Self {
            name,
            strategies: selectors
                .iter()
                .map(|s| Strategy {
                    locator: Locator::css(s),
                    read: ReadRule::Text,
                    accept,
                })
                .collect(),
        }
    }

    pub fn title() -> Self {
        Self::text(
            "title",
            &["h1", "h2.headline", ".article-title", "header h1", "[itemprop=\"headline\"]"],
            |t| t.chars().count() >= 3,
        )
    }

    pub fn author() -> Self {
        Self::text(
            "author",
            &[".author", ".byline", "address", "[itemprop=\"author\"]", ".firma", ".signature"],
            |a| !a.is_empty(),
        )
    }

    pub fn body() -> Self {
        Self::text(
            "body",
            &[
                "article",
                ".article-body",
                ".article-content",
                "[data-dtm-region*=\"articulo\"]",
                ".c-d",
                "main",
            ],
            |b| b.chars().count() > 100,
        )
    }

    /// Every `<img>` with a usable source. Collected with [`extract_every`].
    pub fn images() -> Self {
        Self {
            name: "images",
            strategies: vec![Strategy {
                locator: Locator::css("img"),
                read: ReadRule::UrlAttribute(IMAGE_ATTRIBUTES),
                accept: is_absolute_http,
            }],
        }
    }

    fn reads_urls(&self) -> bool {
        self.strategies
            .iter()
            .any(|s| matches!(s.read, ReadRule::UrlAttribute(_)))
    }
}

/// Result of running a single strategy.
#[derive(Debug)]
pub enum Outcome {
    Accepted(String),
    Rejected,
    NotFound,
    Failed(SessionError),
}

impl Outcome {
    fn into_accepted(self) -> Option<String> {
        match self {
            Outcome::Accepted(value) => Some(value),
            _ => None,
        }
    }
}

/// Run `attempt` over `candidates` in order and return the first `Some`.
///
/// Candidates after the first hit are never attempted.
pub async fn try_in_order<C, T, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    attempt: F,
) -> Option<T>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let mut hits = pin!(stream::iter(candidates).then(attempt).filter_map(ready));
    hits.next().await
}

/// `true` for absolute `http://` or `https://` URLs.
pub fn is_absolute_http(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

/// Resolve a link or source value against the page it was read from.
///
/// Absolute HTTP(S) values pass through unchanged. Relative and
/// protocol-relative values are joined onto `base`. Anything that does not
/// end up as an HTTP(S) URL with a host (`data:`, `javascript:`, empty) is
/// dropped.
pub fn resolve_http(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_absolute_http(raw) {
        return Some(raw.to_string());
    }
    let joined = base?.join(raw).ok()?;
    (matches!(joined.scheme(), "http" | "https") && joined.has_host()).then(|| joined.into())
}

/// URL of the loaded page, used as the base for relative links.
pub async fn page_base(session: &dyn RemoteSession) -> Option<Url> {
    match session.current_url().await {
        Ok(url) => Url::parse(&url).ok(),
        Err(e) => {
            debug!(error = %e, "Current URL unavailable, relative links are dropped");
            None
        }
    }
}

/// URL token of the last entry in a `srcset` descriptor list.
///
/// Sites list the largest rendition last.
pub fn last_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .last()
}

/// Pick the first attribute value of `element` that resolves to an
/// absolute URL.
async fn read_url_attribute(
    session: &dyn RemoteSession,
    element: &ElementHandle,
    attributes: &'static [&'static str],
    base: Option<&Url>,
) -> Result<Option<String>, SessionError> {
    for attribute in attributes {
        let Some(raw) = session.attribute(element, attribute).await? else {
            continue;
        };
        let candidate = if attribute.contains("srcset") {
            last_srcset_url(&raw)
        } else {
            Some(raw.as_str())
        };
        if let Some(url) = candidate.and_then(|c| resolve_http(base, c)) {
            return Ok(Some(url));
        }
    }
    Ok(None)
}

async fn read(
    session: &dyn RemoteSession,
    element: &ElementHandle,
    rule: ReadRule,
    base: Option<&Url>,
) -> Result<Option<String>, SessionError> {
    match rule {
        ReadRule::Text => Ok(Some(session.text(element).await?.trim().to_string())),
        ReadRule::UrlAttribute(attributes) => {
            read_url_attribute(session, element, attributes, base).await
        }
    }
}

/// Run one strategy against the first element its locator matches.
pub async fn run_strategy(
    session: &dyn RemoteSession,
    strategy: &Strategy,
    base: Option<&Url>,
) -> Outcome {
    let first = match session.find_all(&strategy.locator).await {
        Ok(found) => found.into_iter().next(),
        Err(e) => return Outcome::Failed(e),
    };
    let Some(element) = first else {
        return Outcome::NotFound;
    };
    match read(session, &element, strategy.read, base).await {
        Ok(Some(value)) if (strategy.accept)(&value) => Outcome::Accepted(value),
        Ok(_) => Outcome::Rejected,
        Err(e) => Outcome::Failed(e),
    }
}

async fn base_for(session: &dyn RemoteSession, spec: &FieldSpec) -> Option<Url> {
    if spec.reads_urls() {
        page_base(session).await
    } else {
        None
    }
}

/// Extract one field, or `None` when no strategy yields an accepted value.
#[instrument(level = "debug", skip_all, fields(field = spec.name))]
pub async fn extract(session: &dyn RemoteSession, spec: &FieldSpec) -> Option<String> {
    let base = base_for(session, spec).await;
    let base = base.as_ref();
    try_in_order(&spec.strategies, |strategy| async move {
        let outcome = run_strategy(session, strategy, base).await;
        match &outcome {
            Outcome::Accepted(_) => debug!(locator = %strategy.locator, "Accepted"),
            Outcome::Failed(e) => {
                debug!(locator = %strategy.locator, error = %e, "Strategy failed")
            }
            _ => debug!(locator = %strategy.locator, ?outcome, "Strategy skipped"),
        }
        outcome.into_accepted()
    })
    .await
}

/// Every accepted value of `spec` across all matched elements, in strategy
/// order and then page order. Unreadable elements are skipped.
#[instrument(level = "debug", skip_all, fields(field = spec.name))]
pub async fn extract_every(session: &dyn RemoteSession, spec: &FieldSpec) -> Vec<String> {
    let base = base_for(session, spec).await;
    let mut values = Vec::new();
    for strategy in &spec.strategies {
        let elements = match session.find_all(&strategy.locator).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!(locator = %strategy.locator, error = %e, "Lookup failed");
                continue;
            }
        };
        for element in &elements {
            match read(session, element, strategy.read, base.as_ref()).await {
                Ok(Some(value)) if (strategy.accept)(&value) => values.push(value),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Skipping unreadable element"),
            }
        }
    }
    values
}

/// Fields read from one article page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub body_text: Option<String>,
    pub image_urls: Vec<String>,
}

/// Field specs for one article page, built once per agent.
#[derive(Debug, Clone)]
pub struct ArticleSpecs {
    pub title: FieldSpec,
    pub author: FieldSpec,
    pub body: FieldSpec,
    pub images: FieldSpec,
}

impl Default for ArticleSpecs {
    fn default() -> Self {
        Self {
            title: FieldSpec::title(),
            author: FieldSpec::author(),
            body: FieldSpec::body(),
            images: FieldSpec::images(),
        }
    }
}

impl ArticleSpecs {
    pub async fn extract_all(&self, session: &dyn RemoteSession) -> ArticleFields {
        ArticleFields {
            title: extract(session, &self.title).await,
            author: extract(session, &self.author).await,
            body_text: extract(session, &self.body).await,
            image_urls: extract_every(session, &self.images).await,
        }
    }
}
