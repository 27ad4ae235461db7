//! Minimal W3C WebDriver client.
//!
//! Only the handful of endpoints the portal adapter needs: session lifecycle,
//! navigation, element lookup, clicks, typing, property reads and a
//! right-click through the actions API.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Strategy used to locate elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector.
    Css,
    /// XPath expression.
    XPath,
}

impl Locator {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
        }
    }
}

/// Reference to an element in the remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(String);

#[derive(Deserialize)]
struct Envelope {
    value: Value,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// An open WebDriver session.
pub struct WebDriverSession {
    http: reqwest::Client,
    base: String,
}

impl WebDriverSession {
    /// Starts a Chrome session on the WebDriver server at `server_url`.
    ///
    /// Downloads are directed to `download_dir` without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable or refuses the session.
    pub async fn start(server_url: &str, download_dir: &Path, headless: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        let server = server_url.trim_end_matches('/').to_string();

        let mut args = vec!["--disable-gpu".to_string()];
        if headless {
            args.push("--headless=new".to_string());
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "prefs": {
                            "download.default_directory": download_dir.display().to_string(),
                            "download.prompt_for_download": false,
                        }
                    }
                }
            }
        });

        let value = Self::send(http.post(format!("{server}/session")).json(&capabilities)).await?;
        let session: NewSession = serde_json::from_value(value)
            .map_err(|e| Error::Driver(format!("malformed new-session response: {e}")))?;
        log::info!("WebDriver session {} started", session.session_id);

        Ok(Self {
            http,
            base: format!("{server}/session/{}", session.session_id),
        })
    }

    /// Navigates the browser to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the navigation command fails.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.post("url", json!({ "url": url })).await.map(|_| ())
    }

    /// Finds the first element matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Driver`] if no element matches.
    pub async fn find(&self, locator: Locator, selector: &str) -> Result<ElementRef> {
        let value = self
            .post(
                "element",
                json!({ "using": locator.as_str(), "value": selector }),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| Error::Driver(format!("no element reference for {selector}")))
    }

    /// Clicks an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is stale or not interactable.
    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        self.post(&format!("element/{}/click", element.0), json!({}))
            .await
            .map(|_| ())
    }

    /// Types `text` into an element.
    ///
    /// # Errors
    ///
    /// Returns an error if the element does not accept input.
    pub async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.post(&format!("element/{}/value", element.0), json!({ "text": text }))
            .await
            .map(|_| ())
    }

    /// Reads a DOM property (e.g. `outerHTML`) of an element as a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Markup`] if the property is not a string.
    pub async fn property(&self, element: &ElementRef, name: &str) -> Result<String> {
        let value = self
            .get(&format!("element/{}/property/{name}", element.0))
            .await?;
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| Error::Markup(format!("property {name} is not text")))
    }

    /// Reads an attribute of an element, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .get(&format!("element/{}/attribute/{name}", element.0))
            .await?;
        Ok(value.as_str().map(ToString::to_string))
    }

    /// Right-clicks an element to open its context menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the actions command fails.
    pub async fn context_click(&self, element: &ElementRef) -> Result<()> {
        let actions = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [
                    { "type": "pointerMove", "origin": { ELEMENT_KEY: element.0 }, "x": 0, "y": 0 },
                    { "type": "pointerDown", "button": 2 },
                    { "type": "pointerUp", "button": 2 }
                ]
            }]
        });
        self.post("actions", actions).await?;
        self.http
            .delete(format!("{}/actions", self.base))
            .send()
            .await?;
        Ok(())
    }

    /// Ends the session and closes the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the request.
    pub async fn quit(&self) -> Result<()> {
        Self::send(self.http.delete(&self.base)).await?;
        log::info!("WebDriver session closed");
        Ok(())
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        Self::send(self.http.post(format!("{}/{path}", self.base)).json(&body)).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        Self::send(self.http.get(format!("{}/{path}", self.base))).await
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let envelope: Envelope = response.json().await?;
        if status.is_success() {
            Ok(envelope.value)
        } else {
            Err(Error::Driver(describe_failure(&envelope.value, status.as_u16())))
        }
    }
}

/// Renders a WebDriver error payload as `<error>: <message>`.
fn describe_failure(value: &Value, status: u16) -> String {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    if message.is_empty() {
        format!("{error} (HTTP {status})")
    } else {
        format!("{error}: {message}")
    }
}
