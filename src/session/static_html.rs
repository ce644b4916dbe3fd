//! Static HTML session backend.
//!
//! Fetches pages with a plain HTTP client and answers element queries with
//! CSS selectors over the parsed document. There is no script engine, so
//! lazy-loaded content never appears and `execute` is a no-op. Pages can
//! also be preloaded, which makes this backend a deterministic stand-in for
//! a browser.
//!
//! Element handles are positions in document order and stay valid until the
//! next navigation. Text and attributes of every element are captured once
//! per navigation; only selector lookups parse the document again.

use super::{ElementHandle, Locator, RemoteSession, SessionConnector, SessionError};
use crate::models::EnvironmentDescriptor;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("section_scout/", env!("CARGO_PKG_VERSION"));

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());

/// Hands out [`StaticSession`]s that share one HTTP client and page set.
#[derive(Debug, Clone, Default)]
pub struct StaticConnector {
    client: Option<Client>,
    pages: Arc<HashMap<String, String>>,
}

impl StaticConnector {
    /// Sessions that fetch every page over HTTP.
    pub fn http(timeout: Duration) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client: Some(client),
            pages: Arc::default(),
        })
    }

    /// Sessions that only serve the given `(url, html)` pairs.
    pub fn with_pages<I, U, H>(pages: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        Self {
            client: None,
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(u, h)| (u.into(), h.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SessionConnector for StaticConnector {
    async fn open(
        &self,
        environment: &EnvironmentDescriptor,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        Ok(Box::new(StaticSession {
            client: self.client.clone(),
            pages: Arc::clone(&self.pages),
            locale: environment.locale.clone(),
            page: None,
        }))
    }
}

#[derive(Debug)]
struct CachedElement {
    attributes: HashMap<String, String>,
    /// Whitespace-collapsed text content.
    text: String,
}

/// A loaded document plus per-element data in document order.
#[derive(Debug)]
struct StaticPage {
    url: String,
    html: String,
    elements: Vec<CachedElement>,
}

impl StaticPage {
    fn load(url: String, html: String) -> Self {
        let elements = {
            let document = Html::parse_document(&html);
            document
                .select(&ANY_ELEMENT)
                .map(|el| CachedElement {
                    attributes: el
                        .value()
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    text: el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "),
                })
                .collect()
        };
        Self {
            url,
            html,
            elements,
        }
    }
}

#[derive(Debug)]
pub struct StaticSession {
    client: Option<Client>,
    pages: Arc<HashMap<String, String>>,
    locale: String,
    page: Option<StaticPage>,
}

impl StaticSession {
    fn page(&self) -> Result<&StaticPage, SessionError> {
        self.page.as_ref().ok_or(SessionError::NoPage)
    }

    fn element(&self, handle: &ElementHandle) -> Result<&CachedElement, SessionError> {
        self.page()?
            .elements
            .get(handle.index())
            .ok_or_else(|| SessionError::StaleElement(handle.clone()))
    }

    /// Parse the current page once and run `f` over the document.
    ///
    /// `Html` is not `Send`, so it never outlives this synchronous call.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&Html, &DocumentIndex) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let document = Html::parse_document(&self.page()?.html);
        let index = DocumentIndex::new(&document);
        f(&document, &index)
    }

    fn store(&mut self, url: String, html: String) {
        let page = StaticPage::load(url, html);
        debug!(url = %page.url, elements = page.elements.len(), "Loaded static page");
        self.page = Some(page);
    }
}

/// Element order of one parse, for turning matches into handles.
///
/// Positions are keyed by the address of each element inside the parsed
/// tree, which is unique and stable for the lifetime of that parse.
struct DocumentIndex<'a> {
    elements: Vec<ElementRef<'a>>,
    positions: HashMap<*const Element, usize>,
}

impl<'a> DocumentIndex<'a> {
    fn new(document: &'a Html) -> Self {
        let elements: Vec<ElementRef<'a>> = document.select(&ANY_ELEMENT).collect();
        let positions = elements
            .iter()
            .enumerate()
            .map(|(i, e)| (std::ptr::from_ref(e.value()), i))
            .collect();
        Self {
            elements,
            positions,
        }
    }

    fn get(&self, handle: &ElementHandle) -> Result<ElementRef<'a>, SessionError> {
        self.elements
            .get(handle.index())
            .copied()
            .ok_or_else(|| SessionError::StaleElement(handle.clone()))
    }

    fn handles<'b>(&self, found: impl Iterator<Item = ElementRef<'b>>) -> Vec<ElementHandle> {
        found
            .filter_map(|el| self.positions.get(&std::ptr::from_ref(el.value())))
            .map(|&i| ElementHandle(i.to_string()))
            .collect()
    }
}

impl ElementHandle {
    fn index(&self) -> usize {
        self.0.parse().unwrap_or(usize::MAX)
    }
}

fn css_of(locator: &Locator) -> Result<Selector, SessionError> {
    match locator {
        Locator::Css(selector) => Selector::parse(selector)
            .map_err(|e| SessionError::Protocol(format!("invalid selector {selector:?}: {e}"))),
        Locator::XPath(_) => Err(SessionError::UnsupportedLocator(locator.clone())),
    }
}

#[async_trait]
impl RemoteSession for StaticSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        if let Some(html) = self.pages.get(url) {
            let html = html.clone();
            self.store(url.to_string(), html);
            return Ok(());
        }
        let Some(client) = &self.client else {
            return Err(SessionError::Remote {
                status: 404,
                message: format!("no preloaded page for {url}"),
            });
        };

        let response = client
            .get(url)
            .header(ACCEPT_LANGUAGE, self.locale.as_str())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Remote {
                status: status.as_u16(),
                message: format!("GET {url}"),
            });
        }
        let final_url = response.url().to_string();
        let body = response.text().await?;
        self.store(final_url, body);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(self.page()?.url.clone())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let selector = css_of(locator)?;
        self.with_document(|document, index| Ok(index.handles(document.select(&selector))))
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let selector = css_of(locator)?;
        self.with_document(|_, index| {
            let parent = index.get(parent)?;
            let found = parent.select(&selector).filter(|e| e.id() != parent.id());
            Ok(index.handles(found))
        })
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        Ok(self.element(element)?.text.clone())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn execute(&self, _script: &str) -> Result<serde_json::Value, SessionError> {
        Ok(serde_json::Value::Null)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.element(element).map(|_| ())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        Ok(())
    }
}
