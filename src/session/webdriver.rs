//! W3C WebDriver client for remote hubs.
//!
//! Speaks the JSON wire format of the W3C WebDriver protocol over `reqwest`.
//! Works against a local Selenium grid or a cloud grid that accepts vendor
//! capabilities under `bstack:options`.
//!
//! # Commands used
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | open | `POST /session` |
//! | navigate | `POST /session/{id}/url` |
//! | current url | `GET /session/{id}/url` |
//! | find | `POST /session/{id}/elements`, `POST /session/{id}/element/{e}/elements` |
//! | read | `GET /session/{id}/element/{e}/text`, `.../attribute/{name}`, `.../property/{name}` |
//! | script | `POST /session/{id}/execute/sync` |
//! | close | `DELETE /session/{id}` |

use super::{ElementHandle, Locator, RemoteSession, SessionConnector, SessionError};
use crate::models::EnvironmentDescriptor;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Key under which W3C remote ends return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Attributes whose DOM property is the resolved absolute URL.
const RESOLVED_PROPERTIES: [&str; 2] = ["href", "src"];

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub access_key: String,
}

/// Opens one WebDriver session per environment on a remote hub.
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    client: Client,
    hub_url: String,
    credentials: Option<Credentials>,
    build_name: String,
    page_load_timeout: Duration,
}

impl WebDriverConnector {
    /// `request_timeout` bounds every single HTTP round trip to the hub,
    /// `page_load_timeout` is handed to the remote browser.
    pub fn new(
        hub_url: &str,
        credentials: Option<Credentials>,
        build_name: String,
        request_timeout: Duration,
        page_load_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            hub_url: hub_url.trim_end_matches('/').to_string(),
            credentials,
            build_name,
            page_load_timeout,
        })
    }
}

/// Build the W3C `alwaysMatch` capabilities for one environment.
pub fn capabilities(environment: &EnvironmentDescriptor, build_name: &str) -> Value {
    let platform = &environment.platform;
    let mut vendor = json!({
        "sessionName": format!("section_scout - {}", environment.label),
        "buildName": build_name,
        "local": false,
    });
    let fields = [
        ("os", platform.os.as_deref()),
        ("osVersion", platform.os_version.as_deref()),
        ("deviceName", platform.device.as_deref()),
        ("resolution", platform.resolution.as_deref()),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            vendor[key] = json!(value);
        }
    }
    if platform.real_mobile {
        vendor["realMobile"] = json!("true");
    }

    let mut caps = json!({
        "browserName": platform.browser.to_lowercase(),
        "bstack:options": vendor,
    });
    if let Some(version) = &platform.browser_version {
        caps["browserVersion"] = json!(version);
    }
    if platform.browser.eq_ignore_ascii_case("chrome") && !environment.is_constrained() {
        caps["goog:chromeOptions"] = json!({
            "args": [format!("--lang={}", environment.locale)],
            "prefs": { "intl.accept_languages": environment.locale },
        });
    }
    caps
}

async fn command(
    client: &Client,
    credentials: Option<&Credentials>,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, SessionError> {
    let mut request = client.request(method, url);
    if let Some(creds) = credentials {
        request = request.basic_auth(&creds.username, Some(&creds.access_key));
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let mut payload: Value = response
        .json()
        .await
        .map_err(|e| SessionError::Protocol(format!("{url}: {e}")))?;
    if !status.is_success() {
        let message = payload["value"]["message"]
            .as_str()
            .or_else(|| payload["value"]["error"].as_str())
            .unwrap_or("no error message")
            .to_string();
        return Err(SessionError::Remote {
            status: status.as_u16(),
            message,
        });
    }
    Ok(payload["value"].take())
}

fn locator_body(locator: &Locator) -> Value {
    match locator {
        Locator::Css(s) => json!({ "using": "css selector", "value": s }),
        Locator::XPath(s) => json!({ "using": "xpath", "value": s }),
    }
}

fn element_handles(value: Value) -> Result<Vec<ElementHandle>, SessionError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(SessionError::Protocol(format!(
                "expected element list, got {other}"
            )));
        }
    };
    items
        .iter()
        .map(|item| {
            item[ELEMENT_KEY]
                .as_str()
                .map(|id| ElementHandle(id.to_string()))
                .ok_or_else(|| SessionError::Protocol(format!("not an element reference: {item}")))
        })
        .collect()
}

#[async_trait]
impl SessionConnector for WebDriverConnector {
    #[instrument(level = "info", skip_all, fields(env = %environment.label))]
    async fn open(
        &self,
        environment: &EnvironmentDescriptor,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        let body = json!({
            "capabilities": { "alwaysMatch": capabilities(environment, &self.build_name) }
        });
        let url = format!("{}/session", self.hub_url);
        info!("Connecting to remote hub");

        let value = command(
            &self.client,
            self.credentials.as_ref(),
            Method::POST,
            &url,
            Some(body),
        )
        .await
        .map_err(|e| SessionError::Setup(e.to_string()))?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| SessionError::Setup(format!("no sessionId in {value}")))?;

        let session = WebDriverSession {
            client: self.client.clone(),
            credentials: self.credentials.clone(),
            base: format!("{url}/{session_id}"),
        };
        session
            .call(
                Method::POST,
                "/timeouts",
                Some(json!({ "pageLoad": self.page_load_timeout.as_millis() as u64 })),
            )
            .await
            .map_err(|e| SessionError::Setup(e.to_string()))?;

        info!(%session_id, "Connected");
        Ok(Box::new(session))
    }
}

#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    credentials: Option<Credentials>,
    /// `{hub}/session/{id}`
    base: String,
}

impl WebDriverSession {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SessionError> {
        let url = format!("{}{}", self.base, path);
        command(&self.client, self.credentials.as_ref(), method, &url, body).await
    }

    fn element_path(element: &ElementHandle, rest: &str) -> String {
        format!("/element/{}{}", urlencoding::encode(&element.0), rest)
    }
}

#[async_trait]
impl RemoteSession for WebDriverSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.call(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let value = self.call(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::Protocol(format!("current url is not a string: {value}")))
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError> {
        let value = self
            .call(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        element_handles(value)
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let path = Self::element_path(parent, "/elements");
        let value = self
            .call(Method::POST, &path, Some(locator_body(locator)))
            .await?;
        element_handles(value)
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let value = self
            .call(Method::GET, &Self::element_path(element, "/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        // Links and sources read as properties come back resolved against
        // the page; other properties (currentSrc) are not reflected as
        // attributes at all.
        let order = if RESOLVED_PROPERTIES.contains(&name) {
            ["property", "attribute"]
        } else {
            ["attribute", "property"]
        };
        let name = urlencoding::encode(name);
        for kind in order {
            let path = Self::element_path(element, &format!("/{kind}/{name}"));
            if let Some(value) = self.call(Method::GET, &path, None).await?.as_str() {
                return Ok(Some(value.to_string()));
            }
        }
        Ok(None)
    }

    async fn execute(&self, script: &str) -> Result<Value, SessionError> {
        self.call(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError> {
        self.call(Method::POST, &Self::element_path(element, "/click"), Some(json!({})))
            .await
            .map(|_| ())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        debug!(session = %self.base, "Deleting remote session");
        if let Err(e) = self.call(Method::DELETE, "", None).await {
            warn!(error = %e, "Remote session delete failed");
            return Err(e);
        }
        Ok(())
    }
}
