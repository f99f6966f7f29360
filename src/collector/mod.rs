pub mod html;
pub mod session;
pub mod snapshot;
pub mod webdriver;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Backend, CollectConfig};
use crate::progress::{Progress, ProgressFn};
use session::{ImageAttrs, Predicate, RenderSession};
use snapshot::SnapshotSession;
use webdriver::WebDriverSession;

/// One candidate card image as collected from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    pub source_url: String,
    pub alt_text: String,
    pub document_index: usize,
}

/// Anything that can produce the raw card images for a URL.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// An empty result means the scrape failed, not that there are no cards.
    async fn collect(&self, url: &str, progress: &ProgressFn) -> Result<Vec<RawElement>>;
}

/// Collector over the configured rendering backend.
pub struct Collector {
    config: CollectConfig,
}

impl Collector {
    pub fn new(config: CollectConfig) -> Self {
        Collector { config }
    }

    async fn collect_from<S: RenderSession>(
        &self,
        mut session: S,
        url: &str,
        progress: &ProgressFn,
    ) -> Result<Vec<RawElement>> {
        let result = collect_with(&mut session, url, &self.config, progress).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close render session: {:#}", e);
        }
        result
    }

    async fn collect_webdriver(&self, url: &str, progress: &ProgressFn) -> Result<Vec<RawElement>> {
        let session = WebDriverSession::connect(&self.config).await?;
        self.collect_from(session, url, progress).await
    }

    async fn collect_static(&self, url: &str, progress: &ProgressFn) -> Result<Vec<RawElement>> {
        let session = SnapshotSession::http(&self.config)?;
        self.collect_from(session, url, progress).await
    }
}

#[async_trait]
impl ElementSource for Collector {
    async fn collect(&self, url: &str, progress: &ProgressFn) -> Result<Vec<RawElement>> {
        match self.config.backend {
            Backend::Webdriver => self.collect_webdriver(url, progress).await,
            Backend::Static => self.collect_static(url, progress).await,
            Backend::Spider => {
                let session = SnapshotSession::spider(&self.config)?;
                self.collect_from(session, url, progress).await
            }
            Backend::Auto => {
                match self.collect_static(url, progress).await {
                    Ok(found) if !found.is_empty() => return Ok(found),
                    Ok(_) => info!("Static fetch found no cards; site likely requires JavaScript"),
                    Err(e) => warn!("Static fetch failed: {:#}", e),
                }
                self.collect_webdriver(url, progress).await
            }
        }
    }
}

/// Load, wait for cards, scroll until the page stops growing, then read every
/// matching image in one query. Falls back to a broader predicate when the
/// card markup is not found.
pub async fn collect_with<S: RenderSession + ?Sized>(
    session: &mut S,
    url: &str,
    config: &CollectConfig,
    progress: &ProgressFn,
) -> Result<Vec<RawElement>> {
    progress(Progress::Loading {
        url: url.to_string(),
    });
    session
        .load(url)
        .await
        .with_context(|| format!("Failed to load {}", url))?;

    let fallback = Predicate::Fallback {
        min_len: config.fallback_min_alt_len,
    };
    let mut predicate = Predicate::Primary;

    progress(Progress::Waiting);
    if !session.wait_for(&predicate, config.wait_timeout).await? {
        warn!(
            "No card images after {:.1}s; trying fallback predicate",
            config.wait_timeout.as_secs_f64()
        );
        progress(Progress::Fallback);
        predicate = fallback.clone();
        if !session.wait_for(&predicate, config.wait_timeout).await? {
            warn!("Fallback predicate matched nothing before scrolling");
        }
    }

    let outcome = session.scroll_to_stable(&config.scroll, progress).await?;
    info!(
        "Scrolled {} probes, page height {}px{}",
        outcome.probes,
        outcome.height,
        if outcome.converged { "" } else { " (ceiling reached)" }
    );

    if !config.settle_delay.is_zero() {
        tokio::time::sleep(config.settle_delay).await;
    }

    let mut elements = to_raw_elements(session.query_all(&predicate).await?, &predicate);
    if elements.is_empty() && predicate == Predicate::Primary {
        warn!("No card images after scrolling; trying fallback predicate");
        progress(Progress::Fallback);
        elements = to_raw_elements(session.query_all(&fallback).await?, &fallback);
    }

    info!("Found {} card images", elements.len());
    progress(Progress::Collected {
        count: elements.len(),
    });
    Ok(elements)
}

pub fn to_raw_elements(images: Vec<ImageAttrs>, predicate: &Predicate) -> Vec<RawElement> {
    images
        .into_iter()
        .filter(|img| predicate.matches(&img.alt))
        .enumerate()
        .map(|(document_index, img)| RawElement {
            source_url: img.best_src().to_string(),
            alt_text: img.alt,
            document_index,
        })
        .collect()
}

// ── Tests ──
