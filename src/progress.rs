use std::fmt;
use std::path::PathBuf;

/// Run milestones, reported in order. `Display` is the status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Loading { url: String },
    Waiting,
    Fallback,
    Scrolled { probes: u32, height: u64 },
    Collected { count: usize },
    Extracted { count: usize, colored: usize },
    Saved { count: usize, path: PathBuf },
}

pub type ProgressFn = dyn Fn(Progress) + Send + Sync;

/// Callback that drops every event.
#[cfg(test)]
pub fn silent(_: Progress) {}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Loading { url } => write!(f, "Loading {}", url),
            Progress::Waiting => write!(f, "Waiting for card images..."),
            Progress::Fallback => write!(f, "Card images not found, trying a broader match..."),
            Progress::Scrolled { probes, height } => {
                write!(f, "Scrolling ({} probes, page height {}px)", probes, height)
            }
            Progress::Collected { count } => write!(f, "Found {} card images", count),
            Progress::Extracted { count, colored } => {
                write!(f, "Extracted {} cards ({} with colors)", count, colored)
            }
            Progress::Saved { count, path } => {
                write!(f, "Saved {} cards to {}", count, path.display())
            }
        }
    }
}
