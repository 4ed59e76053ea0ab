// =============================================================================
// fetchers/rendered_fetcher.rs — LET THE BROWSER DO THE RENDERING
// =============================================================================
//
// One browser session serves the whole cycle. Opening a network's page
// navigates that session, so pages must be read in turn: open, read all three
// fragments, then move on. The scan cycle already works that way.
//
// The session is borrowed, never owned. Starting it and quitting it is the
// cycle's job (see scanners::run_cycle).
// =============================================================================

use async_trait::async_trait;

use crate::config::NetworkConfig;
use crate::error::ScanError;
use crate::fetchers::webdriver::{Locator, WebDriverSession};
use crate::fetchers::{PageFetcher, TokenPage};
use crate::models::Network;

pub struct RenderedFetcher {
    session: WebDriverSession,
}

impl RenderedFetcher {
    pub fn new(session: WebDriverSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl PageFetcher for RenderedFetcher {
    type Page = RenderedPage;

    async fn open(&self, network: &NetworkConfig) -> Result<RenderedPage, ScanError> {
        self.session
            .navigate(&network.url)
            .await
            .map_err(|e| ScanError::fetch_failed(network.network, e))?;

        Ok(RenderedPage {
            session: self.session.clone(),
            network: network.network,
            holders: Locator::Css(format!(".{}", network.holder_class)),
            price_spans: Locator::XPath(format!(
                "//span[@class = \"{}\"]",
                network.price_span_class
            )),
            // Market cap comes from the button labels, the same source the
            // static strategy reads. The browser layout also shows it as the
            // second `d-block` span (one leading char to strip), but that
            // would need its own parse rule.
            buttons: Locator::Css("button".to_string()),
        })
    }
}

/// The page currently loaded in the browser.
pub struct RenderedPage {
    session: WebDriverSession,
    network: Network,
    holders: Locator,
    price_spans: Locator,
    buttons: Locator,
}

impl RenderedPage {
    async fn first_text(&self, locator: &Locator) -> Result<String, ScanError> {
        let elements = self
            .session
            .find_elements(locator)
            .await
            .map_err(|e| ScanError::fetch_failed(self.network, e))?;

        let first = elements.first().ok_or_else(|| {
            ScanError::fetch_failed(self.network, format!("no element matches {locator:?}"))
        })?;

        self.session
            .element_text(first)
            .await
            .map_err(|e| ScanError::fetch_failed(self.network, e))
    }
}

#[async_trait]
impl TokenPage for RenderedPage {
    async fn fetch_holder_fragment(&self) -> Result<String, ScanError> {
        self.first_text(&self.holders).await
    }

    /// The price line is the first `d-block` span on the page.
    async fn fetch_price_fragment(&self) -> Result<String, ScanError> {
        self.first_text(&self.price_spans).await
    }

    async fn fetch_market_cap_labels(&self) -> Result<Vec<String>, ScanError> {
        self.session
            .texts(&self.buttons)
            .await
            .map_err(|e| ScanError::fetch_failed(self.network, e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use url::Url;

    const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
    pub(crate) const SESSION: &str = "fake-session";

    /// A WebDriver server on localhost that serves one canned token page and
    /// logs every command as "METHOD /path".
    pub(crate) struct FakeDriver {
        pub url: Url,
        pub requests: Arc<Mutex<Vec<String>>>,
    }

    impl FakeDriver {
        pub(crate) async fn start(price_line: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));

            let log = requests.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, price_line, log.clone()));
                }
            });

            Self { url, requests }
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn serve(stream: TcpStream, price_line: &'static str, log: Arc<Mutex<Vec<String>>>) {
        let mut reader = BufReader::new(stream);
        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                return;
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut content_length = 0;
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
                    return;
                }
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).await.unwrap();

            log.lock().unwrap().push(format!("{method} {path}"));
            let (status, value) = route(&method, &path, &body, price_line);
            let payload = value.to_string();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
                payload.len()
            );
            if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    fn route(method: &str, path: &str, body: &[u8], price_line: &str) -> (&'static str, Value) {
        let session_path = format!("/session/{SESSION}");
        let element = |id: &str| json!({ ELEMENT_KEY: id });

        let value = match (method, path) {
            ("POST", "/session") => json!({ "sessionId": SESSION, "capabilities": {} }),
            ("DELETE", p) if p == session_path => Value::Null,
            ("POST", p) if p == format!("{session_path}/url") => Value::Null,
            ("POST", p) if p == format!("{session_path}/elements") => {
                let query: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
                match (query["using"].as_str(), query["value"].as_str()) {
                    (Some("css selector"), Some(".mr-3")) => json!([element("holders")]),
                    (Some("xpath"), _) => json!([element("price"), element("cap-span")]),
                    (Some("css selector"), Some("button")) => {
                        json!([element("b0"), element("b1"), element("b2")])
                    }
                    _ => json!([]),
                }
            }
            ("GET", p) if p.starts_with(&format!("{session_path}/element/")) => {
                let id = p.split('/').nth(4).unwrap_or_default();
                match id {
                    "holders" => json!("1,234 addresses"),
                    "price" => json!(price_line),
                    "cap-span" => json!("$500,000"),
                    "b0" => json!("Overview"),
                    "b1" => json!("Contract"),
                    "b2" => json!("$ 500,000"),
                    _ => return not_found(path),
                }
            }
            _ => return not_found(path),
        };
        ("200 OK", json!({ "value": value }))
    }

    fn not_found(path: &str) -> (&'static str, Value) {
        (
            "404 Not Found",
            json!({ "value": { "error": "unknown command", "message": path } }),
        )
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn network() -> NetworkConfig {
        NetworkConfig::new(
            Network::Ethereum,
            Url::parse("https://etherscan.io/token/0x1").unwrap(),
            None,
        )
    }

    #[tokio::test]
    async fn test_rendered_page_reads_live_elements() {
        let driver = FakeDriver::start("$0.0832 @ 0.000041 Eth (+4.21%)").await;
        let session = WebDriverSession::start(client(), &driver.url, true)
            .await
            .unwrap();
        assert_eq!(session.id(), SESSION);

        let fetcher = RenderedFetcher::new(session.clone());
        let page = fetcher.open(&network()).await.unwrap();
        assert_eq!(page.fetch_holder_fragment().await.unwrap(), "1,234 addresses");
        assert_eq!(
            page.fetch_price_fragment().await.unwrap(),
            "$0.0832 @ 0.000041 Eth (+4.21%)"
        );
        assert_eq!(
            page.fetch_market_cap_labels().await.unwrap(),
            vec!["Overview", "Contract", "$ 500,000"]
        );

        session.quit().await.unwrap();
        let requests = driver.requests();
        assert_eq!(requests[0], "POST /session");
        assert_eq!(requests[1], format!("POST /session/{SESSION}/url"));
        assert_eq!(requests.last().unwrap(), &format!("DELETE /session/{SESSION}"));
    }

    #[tokio::test]
    async fn test_no_matching_element_is_fetch_failure() {
        let driver = FakeDriver::start("$1 @ 1 Eth (+1%)").await;
        let session = WebDriverSession::start(client(), &driver.url, true)
            .await
            .unwrap();
        let mut config = network();
        config.holder_class = "missing".to_string();

        let page = RenderedFetcher::new(session).open(&config).await.unwrap();
        match page.fetch_holder_fragment().await {
            Err(ScanError::FetchFailed { network, cause }) => {
                assert_eq!(network, Network::Ethereum);
                assert!(cause.contains("missing"));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }
}
