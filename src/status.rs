use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status: RunStatus,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cards: Option<usize>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusSnapshot {
            status: RunStatus::Idle,
            message: String::new(),
            started_at: None,
            finished_at: None,
            cards: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Scraping already in progress")]
pub struct AlreadyRunning;

/// Process-wide run status. Starts idle; only the run controller moves it
/// forward, status queries read snapshots.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    inner: Arc<Mutex<StatusSnapshot>>,
}

impl RunState {
    pub fn new() -> Self {
        RunState::default()
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    /// Claim the single run slot. A second caller is rejected, never queued.
    pub fn try_start(&self) -> Result<(), AlreadyRunning> {
        let mut s = self.lock();
        if s.status == RunStatus::Running {
            return Err(AlreadyRunning);
        }
        *s = StatusSnapshot {
            status: RunStatus::Running,
            message: "Starting scraper...".to_string(),
            started_at: Some(Utc::now()),
            finished_at: None,
            cards: None,
        };
        Ok(())
    }

    /// Ignored unless a run is in flight.
    pub fn progress(&self, message: impl Into<String>) {
        let mut s = self.lock();
        if s.status == RunStatus::Running {
            s.message = message.into();
        }
    }

    pub fn complete(&self, message: impl Into<String>, cards: usize) {
        self.finish(RunStatus::Complete, message.into(), Some(cards));
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.finish(RunStatus::Error, message.into(), None);
    }

    fn finish(&self, status: RunStatus, message: String, cards: Option<usize>) {
        let mut s = self.lock();
        s.status = status;
        s.message = message;
        s.finished_at = Some(Utc::now());
        s.cards = cards;
    }
}
