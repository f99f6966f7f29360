//! Backends that see the page as a single HTML snapshot: a plain HTTP fetch,
//! or spider.cloud rendering it remotely. Neither can scroll.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::info;

use super::html;
use super::session::{ImageAttrs, PageMetrics, Predicate, RenderSession, ScrollOutcome, ScrollPolicy};
use crate::config::CollectConfig;
use crate::progress::ProgressFn;

const HTTP_TIMEOUT_SECS: u64 = 10;

enum Fetcher {
    Http(reqwest::Client),
    Spider(Spider),
}

pub struct SnapshotSession {
    fetcher: Fetcher,
    html: String,
}

impl SnapshotSession {
    pub fn http(config: &CollectConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(SnapshotSession {
            fetcher: Fetcher::Http(client),
            html: String::new(),
        })
    }

    pub fn spider(config: &CollectConfig) -> Result<Self> {
        let api_key = config
            .spider_api_key
            .clone()
            .ok_or_else(|| anyhow!("SPIDER_API_KEY environment variable must be set"))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| anyhow!("Failed to create Spider client: {}", e))?;

        Ok(SnapshotSession {
            fetcher: Fetcher::Spider(spider),
            html: String::new(),
        })
    }

    #[cfg(test)]
    fn from_html(html: &str) -> Self {
        SnapshotSession {
            fetcher: Fetcher::Http(reqwest::Client::new()),
            html: html.to_string(),
        }
    }
}

#[async_trait]
impl RenderSession for SnapshotSession {
    async fn load(&mut self, url: &str) -> Result<()> {
        let start = Instant::now();
        self.html = match &self.fetcher {
            Fetcher::Http(client) => client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
                .context("Failed to read page body")?,
            Fetcher::Spider(spider) => fetch_rendered(spider, url).await?,
        };
        info!(
            "Fetched {} ({} bytes) in {:.1}s",
            url,
            self.html.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// The snapshot cannot change, so there is nothing to wait for.
    async fn wait_for(&mut self, predicate: &Predicate, _timeout: Duration) -> Result<bool> {
        let images = html::images(&self.html, predicate.selector());
        Ok(images.iter().any(|img| predicate.matches(&img.alt)))
    }

    async fn scroll_by_viewport(&mut self) -> Result<()> {
        Ok(())
    }

    async fn page_metrics(&mut self) -> Result<PageMetrics> {
        Ok(PageMetrics {
            height: 0,
            viewport_bottom: 0,
        })
    }

    async fn scroll_to_stable(
        &mut self,
        _policy: &ScrollPolicy,
        _progress: &ProgressFn,
    ) -> Result<ScrollOutcome> {
        Ok(ScrollOutcome {
            probes: 0,
            height: 0,
            converged: true,
        })
    }

    async fn query_all(&mut self, predicate: &Predicate) -> Result<Vec<ImageAttrs>> {
        Ok(html::images(&self.html, predicate.selector()))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Raw HTML of the page after spider.cloud has rendered it.
async fn fetch_rendered(spider: &Spider, url: &str) -> Result<String> {
    let params = RequestParams {
        return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
        ..Default::default()
    };

    let response = spider
        .scrape_url(url, Some(params), "application/json")
        .await
        .map_err(|e| anyhow!("Spider scrape failed: {}", e))?;

    let parsed: serde_json::Value = match response.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
        None => response,
    };

    parsed
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from)
        .ok_or_else(|| anyhow!("No content in spider response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::silent;

    fn quick_config() -> CollectConfig {
        CollectConfig {
            wait_timeout: Duration::ZERO,
            settle_delay: Duration::ZERO,
            ..CollectConfig::default()
        }
    }

    #[tokio::test]
    async fn snapshot_collects_without_scrolling() {
        let html = std::fs::read_to_string("tests/fixtures/cards.html").unwrap();
        let mut session = SnapshotSession::from_html(&html);
        let out = session
            .scroll_to_stable(&ScrollPolicy::default(), &silent)
            .await
            .unwrap();
        assert_eq!(out.probes, 0);

        assert!(session.wait_for(&Predicate::Primary, Duration::ZERO).await.unwrap());
        assert_eq!(session.query_all(&Predicate::Primary).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn script_only_page_yields_nothing() {
        let html = r#"<html><body><div id="root"></div><script src="/app.js"></script></body></html>"#;
        let mut session = SnapshotSession::from_html(html);
        assert!(!session.wait_for(&Predicate::Primary, Duration::ZERO).await.unwrap());
    }

    #[test]
    fn spider_requires_api_key() {
        let err = SnapshotSession::spider(&quick_config()).err().unwrap();
        assert!(err.to_string().contains("SPIDER_API_KEY"));
    }

    #[tokio::test]
    async fn snapshot_fallback_query() {
        let html = r#"<html><body>
            <img src="/a/OGN-120.png" alt="Sett, The Boss. Rarity: Rare.">
            <img src="/a/logo.png" alt="logo">
        </body></html>"#;
        let mut session = SnapshotSession::from_html(html);
        let fallback = Predicate::Fallback { min_len: 20 };
        assert!(!session.wait_for(&Predicate::Primary, Duration::ZERO).await.unwrap());
        let images = session.query_all(&fallback).await.unwrap();
        let raws = crate::collector::to_raw_elements(images, &fallback);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].source_url, "/a/OGN-120.png");
    }
}
