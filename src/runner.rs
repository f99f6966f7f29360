use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use crate::collector::ElementSource;
use crate::parser::{self, Extractor};
use crate::progress::{Progress, ProgressFn};
use crate::status::{AlreadyRunning, RunState};
use crate::store::{CardRecord, CardStore, Color};

/// Below this share of cards with a parsed color the alt-text format has
/// probably changed.
const MIN_COLOR_RATE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cards: usize,
    pub colored: usize,
    pub by_color: BTreeMap<Color, usize>,
}

impl RunSummary {
    pub fn from_cards(cards: &[CardRecord]) -> Self {
        let mut by_color = BTreeMap::new();
        for color in cards.iter().flat_map(|c| &c.colors) {
            *by_color.entry(*color).or_insert(0) += 1;
        }
        RunSummary {
            cards: cards.len(),
            colored: cards.iter().filter(|c| !c.colors.is_empty()).count(),
            by_color,
        }
    }

    pub fn color_rate(&self) -> f64 {
        if self.cards == 0 {
            0.0
        } else {
            self.colored as f64 / self.cards as f64
        }
    }

    pub fn low_color_rate(&self) -> bool {
        self.cards > 0 && self.color_rate() < MIN_COLOR_RATE
    }

    pub fn message(&self) -> String {
        let mut msg = format!("Successfully scraped {} cards!", self.cards);
        if self.low_color_rate() {
            msg.push_str(&format!(
                " Warning: only {} had colors; the card format may have changed.",
                self.colored
            ));
        }
        msg
    }
}

/// One scrape pass: collect → extract → persist.
#[derive(Clone)]
pub struct Runner {
    source: Arc<dyn ElementSource>,
    store: CardStore,
    target_url: String,
    extractor: Extractor,
}

impl Runner {
    pub fn new(source: Arc<dyn ElementSource>, store: CardStore, target_url: impl Into<String>) -> Self {
        let target_url = target_url.into();
        let extractor = Extractor::new(Url::parse(&target_url).ok());
        Runner {
            source,
            store,
            target_url,
            extractor,
        }
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub async fn run(&self, progress: &ProgressFn) -> Result<RunSummary> {
        let start = Instant::now();

        let raws = self
            .source
            .collect(&self.target_url, progress)
            .await
            .context("Scrape failed")?;
        if raws.is_empty() {
            bail!(
                "Scrape failed: no card images found on {} (the page structure may have changed)",
                self.target_url
            );
        }

        let extractor = self.extractor.clone();
        let cards = tokio::task::spawn_blocking(move || parser::extract_all(&raws, &extractor))
            .await
            .context("Extraction task failed")?;

        let summary = RunSummary::from_cards(&cards);
        progress(Progress::Extracted {
            count: summary.cards,
            colored: summary.colored,
        });
        if summary.low_color_rate() {
            warn!(
                "Only {}/{} cards have colors; alt-text labels were probably not recognized",
                summary.colored, summary.cards
            );
        }

        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&cards))
            .await
            .context("Save task failed")??;
        progress(Progress::Saved {
            count: summary.cards,
            path: self.store.path().to_path_buf(),
        });

        info!(
            "Scraped {} cards in {:.1}s",
            summary.cards,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// Claim the run slot and run in the background, reporting into `state`.
    /// Rejected while another run is in flight.
    pub fn spawn(self, state: RunState) -> Result<JoinHandle<()>, AlreadyRunning> {
        state.try_start()?;

        Ok(tokio::spawn(async move {
            let progress_state = state.clone();
            let task = tokio::spawn(async move {
                let progress = move |p: Progress| progress_state.progress(p.to_string());
                self.run(&progress).await
            });

            match task.await {
                Ok(Ok(summary)) => state.complete(summary.message(), summary.cards),
                Ok(Err(e)) => {
                    error!("Scrape run failed: {:#}", e);
                    state.fail(format!("{:#}", e));
                }
                Err(e) => {
                    error!("Scrape task aborted: {}", e);
                    state.fail(format!("Scraper task aborted: {}", e));
                }
            }
        }))
    }
}

/// Re-run the extractor over stored records, e.g. after the rules changed.
pub fn reparse(cards: &[CardRecord], extractor: &Extractor) -> Vec<CardRecord> {
    let raws: Vec<_> = cards
        .iter()
        .enumerate()
        .map(|(i, c)| crate::collector::RawElement {
            source_url: c.image_url.clone(),
            alt_text: c.raw_text.clone(),
            document_index: i,
        })
        .collect();
    parser::extract_all(&raws, extractor)
}
