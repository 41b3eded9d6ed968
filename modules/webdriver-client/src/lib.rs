pub mod error;

pub use error::{Result, WebDriverError};

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

/// W3C element identifier key in find-element responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

pub struct WebDriverClient {
    client: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open a new browser session via `POST /session`.
    pub async fn new_session(&self) -> Result<WebDriverSession> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage"]
                    }
                }
            }
        });

        let value = post_command(&self.client, &format!("{}/session", self.base_url), &body).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Protocol("missing sessionId in response".into()))?
            .to_string();

        debug!(%session_id, "WebDriver session opened");
        Ok(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, session_id),
            session_id,
        })
    }
}

/// An element handle returned by `find_element`. Only valid within the
/// session that produced it.
#[derive(Debug, Clone)]
pub struct ElementRef {
    id: String,
}

pub struct WebDriverSession {
    client: reqwest::Client,
    session_url: String,
    pub session_id: String,
}

impl WebDriverSession {
    pub async fn navigate(&self, url: &str) -> Result<()> {
        post_command(
            &self.client,
            &format!("{}/url", self.session_url),
            &json!({ "url": url }),
        )
        .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let value = get_command(&self.client, &format!("{}/url", self.session_url)).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| WebDriverError::Protocol("current url is not a string".into()))
    }

    /// Full serialized DOM of the current page.
    pub async fn page_source(&self) -> Result<String> {
        let value = get_command(&self.client, &format!("{}/source", self.session_url)).await?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| WebDriverError::Protocol("page source is not a string".into()))
    }

    /// Find the first element matching a CSS selector. `Ok(None)` when the
    /// driver reports `no such element` rather than a transport failure.
    pub async fn find_element(&self, css: &str) -> Result<Option<ElementRef>> {
        let body = json!({ "using": "css selector", "value": css });
        let resp = self
            .client
            .post(format!("{}/element", self.session_url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let envelope: Value = resp.json().await?;

        if !status.is_success() {
            let error_code = envelope
                .pointer("/value/error")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if error_code == "no such element" {
                return Ok(None);
            }
            return Err(api_error(status.as_u16(), &envelope));
        }

        let id = envelope
            .pointer("/value")
            .and_then(|v| v.get(ELEMENT_KEY))
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Protocol("missing element id in response".into()))?
            .to_string();

        Ok(Some(ElementRef { id }))
    }

    pub async fn click(&self, element: &ElementRef) -> Result<()> {
        post_command(
            &self.client,
            &format!("{}/element/{}/click", self.session_url, element.id),
            &json!({}),
        )
        .await?;
        Ok(())
    }

    /// Dispatch a single key press (down + up) to the focused element.
    /// `key` is a WebDriver key string, e.g. `"\u{E014}"` for ArrowRight.
    pub async fn send_key(&self, key: &str) -> Result<()> {
        let body = json!({
            "actions": [{
                "type": "key",
                "id": "keyboard",
                "actions": [
                    { "type": "keyDown", "value": key },
                    { "type": "keyUp", "value": key }
                ]
            }]
        });
        post_command(&self.client, &format!("{}/actions", self.session_url), &body).await?;
        Ok(())
    }

    /// Synthesize a press-move-release pointer gesture between two viewport
    /// coordinates, with a short hold so the page registers it as a drag.
    pub async fn pointer_drag(&self, from: (i64, i64), to: (i64, i64)) -> Result<()> {
        let body = json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": [
                    { "type": "pointerMove", "duration": 0, "x": from.0, "y": from.1 },
                    { "type": "pointerDown", "button": 0 },
                    { "type": "pause", "duration": 100 },
                    { "type": "pointerMove", "duration": 250, "x": to.0, "y": to.1 },
                    { "type": "pointerUp", "button": 0 }
                ]
            }]
        });
        post_command(&self.client, &format!("{}/actions", self.session_url), &body).await?;
        Ok(())
    }

    /// End the session and close the browser window.
    pub async fn close(self) -> Result<()> {
        let resp = self.client.delete(&self.session_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let envelope: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(api_error(status.as_u16(), &envelope));
        }
        debug!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

async fn post_command(client: &reqwest::Client, url: &str, body: &Value) -> Result<Value> {
    let resp = client.post(url).json(body).send().await?;
    unwrap_value(resp).await
}

async fn get_command(client: &reqwest::Client, url: &str) -> Result<Value> {
    let resp = client.get(url).send().await?;
    unwrap_value(resp).await
}

/// All WebDriver responses wrap their payload in `{"value": ...}`.
async fn unwrap_value(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let envelope: Value = resp.json().await?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &envelope));
    }

    envelope
        .get("value")
        .cloned()
        .ok_or_else(|| WebDriverError::Protocol("missing value in response".into()))
}

fn api_error(status: u16, envelope: &Value) -> WebDriverError {
    let message = envelope
        .pointer("/value/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown WebDriver error")
        .to_string();
    WebDriverError::Api { status, message }
}
