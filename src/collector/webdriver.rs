//! Full-render backend: a real browser driven over the W3C WebDriver protocol
//! (chromedriver, geckodriver).

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::session::{ImageAttrs, PageMetrics, Predicate, RenderSession};
use crate::config::{Browser, CollectConfig};

const POLL_INTERVAL_MS: u64 = 250;
const SCRIPT_TIMEOUT_MS: u64 = 30_000;
// slack on top of the page-load timeout for the HTTP round-trip to the driver
const HTTP_SLACK_SECS: u64 = 10;

const QUERY_SCRIPT: &str = r#"
return Array.from(document.querySelectorAll(arguments[0]), function (img) {
    return {
        src: img.getAttribute('src') || '',
        lazy_src: img.getAttribute('data-src') || img.getAttribute('data-lazy-src') || '',
        alt: img.getAttribute('alt') || ''
    };
});
"#;

const METRICS_SCRIPT: &str = r#"
var b = document.body, d = document.documentElement;
return {
    height: Math.max(b.scrollHeight, d.scrollHeight, b.offsetHeight, d.offsetHeight, b.clientHeight, d.clientHeight),
    bottom: window.scrollY + window.innerHeight
};
"#;

const SCROLL_SCRIPT: &str = "window.scrollBy(0, window.innerHeight);";

pub struct WebDriverSession {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
    browser: Browser,
}

impl WebDriverSession {
    /// Start a browser session, trying the configured browser first.
    pub async fn connect(config: &CollectConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.page_load_timeout + Duration::from_secs(HTTP_SLACK_SECS))
            .build()?;
        let endpoint = config.webdriver_url.trim_end_matches('/').to_string();

        let mut last_err = None;
        for browser in config.browser.preference() {
            let body = capabilities(browser, config);
            match new_session(&client, &endpoint, &body).await {
                Ok(session_id) => {
                    info!("{:?} session {} started via {}", browser, session_id, endpoint);
                    return Ok(WebDriverSession {
                        client,
                        endpoint,
                        session_id,
                        browser,
                    });
                }
                Err(e) => {
                    warn!("{:?} session failed: {:#}", browser, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| anyhow!("no browser configured"))
            .context(format!("No WebDriver session could be created at {}", endpoint)))
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("WebDriver request to {} failed", path))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .context("WebDriver returned a non-JSON response")?;
        unwrap_value(status, payload)
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn load(&mut self, url: &str) -> Result<()> {
        info!("Loading {} in {:?}", url, self.browser);
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn wait_for(&mut self, predicate: &Predicate, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let images = self.query_all(predicate).await?;
            if images.iter().any(|img| predicate.matches(&img.alt)) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }
    }

    async fn scroll_by_viewport(&mut self) -> Result<()> {
        self.execute(SCROLL_SCRIPT, vec![]).await?;
        Ok(())
    }

    async fn page_metrics(&mut self) -> Result<PageMetrics> {
        #[derive(Deserialize)]
        struct Metrics {
            height: f64,
            bottom: f64,
        }

        let value = self.execute(METRICS_SCRIPT, vec![]).await?;
        let m: Metrics = serde_json::from_value(value).context("Unexpected page metrics")?;
        Ok(PageMetrics {
            height: m.height.max(0.0).round() as u64,
            viewport_bottom: m.bottom.max(0.0).round() as u64,
        })
    }

    async fn query_all(&mut self, predicate: &Predicate) -> Result<Vec<ImageAttrs>> {
        let value = self
            .execute(QUERY_SCRIPT, vec![json!(predicate.selector())])
            .await?;
        let images: Vec<ImageAttrs> =
            serde_json::from_value(value).context("Unexpected image query result")?;
        debug!("{} images match {}", images.len(), predicate.selector());
        Ok(images)
    }

    async fn close(&mut self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        debug!("Session {} closed", self.session_id);
        Ok(())
    }
}

async fn new_session(client: &reqwest::Client, endpoint: &str, body: &Value) -> Result<String> {
    let response = client
        .post(format!("{}/session", endpoint))
        .json(body)
        .send()
        .await
        .with_context(|| format!("WebDriver server unreachable at {}", endpoint))?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = unwrap_value(status, payload)?;

    value
        .get("sessionId")
        .and_then(|s| s.as_str())
        .map(String::from)
        .ok_or_else(|| anyhow!("WebDriver response has no sessionId"))
}

/// The `value` member of a WebDriver response, or its error as `Err`.
fn unwrap_value(status: StatusCode, payload: Value) -> Result<Value> {
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("");
        bail!("WebDriver error '{}' ({}): {}", error, status, message);
    }
    if !status.is_success() {
        bail!("WebDriver returned {}", status);
    }
    Ok(value)
}

/// New-session request body. Images are not downloaded: only their
/// attributes matter.
fn capabilities(browser: Browser, config: &CollectConfig) -> Value {
    let timeouts = json!({
        "pageLoad": config.page_load_timeout.as_millis() as u64,
        "script": SCRIPT_TIMEOUT_MS,
    });

    let always_match = match browser {
        Browser::Chrome => {
            let mut args = vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
                "--window-size=1920,1080".to_string(),
                format!("--user-agent={}", config.user_agent),
            ];
            if config.headless {
                args.push("--headless=new".to_string());
            }
            json!({
                "browserName": "chrome",
                "pageLoadStrategy": "eager",
                "timeouts": timeouts,
                "goog:chromeOptions": {
                    "args": args,
                    "prefs": { "profile.managed_default_content_settings.images": 2 },
                },
            })
        }
        Browser::Firefox => {
            let mut args = vec!["--width=1920".to_string(), "--height=1080".to_string()];
            if config.headless {
                args.push("-headless".to_string());
            }
            json!({
                "browserName": "firefox",
                "pageLoadStrategy": "eager",
                "timeouts": timeouts,
                "moz:firefoxOptions": {
                    "args": args,
                    "prefs": {
                        "permissions.default.image": 2,
                        "general.useragent.override": config.user_agent,
                    },
                },
            })
        }
    };

    json!({ "capabilities": { "alwaysMatch": always_match, "firstMatch": [{}] } })
}
