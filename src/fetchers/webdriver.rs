// =============================================================================
// fetchers/webdriver.rs — DRIVING A BROWSER WITH NOTHING BUT reqwest
// =============================================================================
//
// The W3C WebDriver protocol is JSON over HTTP. geckodriver, chromedriver and
// Selenium all speak it. We need five commands of it:
//
//   POST   /session                          start a browser
//   POST   /session/{id}/url                 navigate (returns after load)
//   POST   /session/{id}/elements            find elements, document order
//   GET    /session/{id}/element/{eid}/text  rendered text of one element
//   DELETE /session/{id}                     quit the browser
//
// Every response is wrapped as {"value": ...}. Errors come back with a non-2xx
// status and {"value": {"error": "...", "message": "..."}}.
//
// A session is a browser process on someone's machine. Whoever starts one
// must call `quit`, on success and on failure alike.
// =============================================================================

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("webdriver transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver {status}: {error}: {message}")]
    Protocol {
        status: StatusCode,
        error: String,
        message: String,
    },

    #[error("webdriver sent something unexpected (HTTP {status}): {body}")]
    Unexpected { status: StatusCode, body: String },

    #[error("bad webdriver endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// How to look elements up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    fn wire(&self) -> (&'static str, &str) {
        match self {
            Locator::Css(v) => ("css selector", v.as_str()),
            Locator::XPath(v) => ("xpath", v.as_str()),
        }
    }
}

/// Opaque handle to an element in the live page. W3C tags element
/// references in JSON with a fixed, very memorable key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    id: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// A live browser session. Cheap to clone; all clones drive the same browser.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: reqwest::Client,
    base: String,
    id: String,
}

impl WebDriverSession {
    /// Start a Firefox session on the WebDriver server at `server`.
    pub async fn start(
        client: reqwest::Client,
        server: &Url,
        headless: bool,
    ) -> Result<Self, WebDriverError> {
        let base = server.as_str().trim_end_matches('/').to_string();
        let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args }
                }
            }
        });

        let created: NewSession =
            send(&client, Method::POST, endpoint(&base, "session")?, Some(body)).await?;

        info!(server = %base, session = %created.session_id, headless, "WebDriver session started");
        Ok(Self {
            client,
            base,
            id: created.session_id,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Load `url` and wait for the page load to finish.
    pub async fn navigate(&self, url: &Url) -> Result<(), WebDriverError> {
        debug!(session = %self.id, url = %url, "Navigating");
        let _: Value = self
            .command(Method::POST, "url", Some(json!({ "url": url.as_str() })))
            .await?;
        Ok(())
    }

    /// All matching elements, in document order. No match is an empty list.
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, WebDriverError> {
        let (using, value) = locator.wire();
        self.command(
            Method::POST,
            "elements",
            Some(json!({ "using": using, "value": value })),
        )
        .await
    }

    /// Visible text of an element, as the browser renders it.
    pub async fn element_text(&self, element: &ElementRef) -> Result<String, WebDriverError> {
        self.command(Method::GET, &format!("element/{}/text", element.id), None)
            .await
    }

    /// Text of every match, in document order.
    pub async fn texts(&self, locator: &Locator) -> Result<Vec<String>, WebDriverError> {
        let mut out = Vec::new();
        for element in self.find_elements(locator).await? {
            out.push(self.element_text(&element).await?);
        }
        Ok(out)
    }

    /// End the session and close the browser.
    pub async fn quit(self) -> Result<(), WebDriverError> {
        let url = endpoint(&self.base, &format!("session/{}", self.id))?;
        let _: Value = send(&self.client, Method::DELETE, url, None).await?;
        info!(session = %self.id, "WebDriver session closed");
        Ok(())
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, WebDriverError> {
        let url = endpoint(&self.base, &format!("session/{}/{}", self.id, path))?;
        send(&self.client, method, url, body).await
    }
}

fn endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{base}/{path}"))
}

async fn send<T: DeserializeOwned>(
    client: &reqwest::Client,
    method: Method,
    url: Url,
    body: Option<Value>,
) -> Result<T, WebDriverError> {
    let mut request = client.request(method.clone(), url);
    // POST commands must carry a JSON object, even an empty one.
    if method == Method::POST {
        request = request.json(&body.unwrap_or_else(|| json!({})));
    }
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    decode(status, &text)
}

/// Unwrap a WebDriver response body into its `value`.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, WebDriverError> {
    if !status.is_success() {
        return match serde_json::from_str::<Envelope<WireError>>(body) {
            Ok(env) => Err(WebDriverError::Protocol {
                status,
                error: env.value.error,
                message: env.value.message,
            }),
            Err(_) => Err(WebDriverError::Unexpected {
                status,
                body: body.to_string(),
            }),
        };
    }

    serde_json::from_str::<Envelope<T>>(body)
        .map(|env| env.value)
        .map_err(|_| WebDriverError::Unexpected {
            status,
            body: body.to_string(),
        })
}
