use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::progress::{Progress, ProgressFn};

pub const DEFAULT_FALLBACK_MIN_LEN: usize = 20;

const FALLBACK_KEYWORDS: &[&str] = &[
    "Type:",
    "Rarity:",
    "Champion",
    "Unit",
    "Spell",
    "Gear",
    "Rune",
    "Legend",
    "Battlefield",
];

const PROBE_DELAY_MS: u64 = 300;
const STABLE_PROBES: u32 = 2;
const MAX_PROBES: u32 = 60;

/// Which images count as cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `img` whose alt mentions `Color:`
    Primary,
    /// Any `img` with a long alt that reads like a sentence or names a card keyword.
    Fallback { min_len: usize },
}

impl Predicate {
    /// CSS that narrows the candidates; `matches` has the final say.
    pub fn selector(&self) -> &'static str {
        match self {
            Predicate::Primary => r#"img[alt*="Color:"]"#,
            Predicate::Fallback { .. } => "img[alt]",
        }
    }

    pub fn matches(&self, alt: &str) -> bool {
        match self {
            Predicate::Primary => alt.contains("Color:"),
            Predicate::Fallback { min_len } => {
                let alt = alt.trim();
                alt.chars().count() > *min_len
                    && (alt.contains('.') || FALLBACK_KEYWORDS.iter().any(|k| alt.contains(k)))
            }
        }
    }
}

/// Attributes of one candidate image, as the page reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageAttrs {
    pub src: String,
    pub lazy_src: String,
    pub alt: String,
}

impl ImageAttrs {
    /// Lazy-loaded images keep a placeholder in `src` until scrolled into view.
    pub fn best_src(&self) -> &str {
        let placeholder = self.src.is_empty() || self.src.starts_with("data:");
        if placeholder && !self.lazy_src.is_empty() {
            &self.lazy_src
        } else {
            &self.src
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMetrics {
    pub height: u64,
    pub viewport_bottom: u64,
}

impl PageMetrics {
    pub fn at_bottom(&self) -> bool {
        self.viewport_bottom >= self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPolicy {
    pub probe_delay: Duration,
    /// Consecutive no-growth probes at the bottom before stopping.
    pub stable_probes: u32,
    /// Hard ceiling on probes.
    pub max_probes: u32,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        ScrollPolicy {
            probe_delay: Duration::from_millis(PROBE_DELAY_MS),
            stable_probes: STABLE_PROBES,
            max_probes: MAX_PROBES,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub probes: u32,
    pub height: u64,
    pub converged: bool,
}

/// A loaded page the collector can drive.
#[async_trait]
pub trait RenderSession: Send {
    async fn load(&mut self, url: &str) -> Result<()>;

    /// `Ok(false)` on timeout.
    async fn wait_for(&mut self, predicate: &Predicate, timeout: Duration) -> Result<bool>;

    async fn scroll_by_viewport(&mut self) -> Result<()>;

    async fn page_metrics(&mut self) -> Result<PageMetrics>;

    /// Every image matching `predicate.selector()`, in document order.
    async fn query_all(&mut self, predicate: &Predicate) -> Result<Vec<ImageAttrs>>;

    async fn close(&mut self) -> Result<()>;

    /// Scroll one viewport at a time until the page stops growing.
    async fn scroll_to_stable(
        &mut self,
        policy: &ScrollPolicy,
        progress: &ProgressFn,
    ) -> Result<ScrollOutcome> {
        let mut height = self.page_metrics().await?.height;
        let mut idle = 0u32;
        let mut probes = 0u32;

        while probes < policy.max_probes {
            self.scroll_by_viewport().await?;
            if !policy.probe_delay.is_zero() {
                tokio::time::sleep(policy.probe_delay).await;
            }
            let metrics = self.page_metrics().await?;
            probes += 1;

            if metrics.height > height {
                debug!("Probe {}: page grew {} -> {}", probes, height, metrics.height);
                height = metrics.height;
                idle = 0;
                progress(Progress::Scrolled { probes, height });
            } else if metrics.at_bottom() {
                idle += 1;
                if idle >= policy.stable_probes.max(1) {
                    return Ok(ScrollOutcome {
                        probes,
                        height,
                        converged: true,
                    });
                }
            }
        }

        warn!(
            "Scroll ceiling of {} probes reached (page height {}px)",
            policy.max_probes, height
        );
        Ok(ScrollOutcome {
            probes,
            height,
            converged: false,
        })
    }
}
