use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use crate::collector::session::{ScrollPolicy, DEFAULT_FALLBACK_MIN_LEN};
use crate::store;

pub const DEFAULT_TARGET_URL: &str = "https://riftbound.leagueoflegends.com/en-us/tcg-cards/";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const PAGE_LOAD_TIMEOUT_SECS: u64 = 30;
const WAIT_TIMEOUT_SECS: u64 = 15;
const SETTLE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Real browser through a WebDriver server (chromedriver/geckodriver)
    Webdriver,
    /// Remote rendering through spider.cloud
    Spider,
    /// Plain HTTP fetch, no JavaScript
    Static,
    /// Static fetch first, WebDriver if it finds nothing
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Browser {
    /// Configured browser first, the other one as fallback.
    pub fn preference(self) -> [Browser; 2] {
        match self {
            Browser::Chrome => [Browser::Chrome, Browser::Firefox],
            Browser::Firefox => [Browser::Firefox, Browser::Chrome],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub backend: Backend,
    pub webdriver_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub user_agent: String,
    pub page_load_timeout: Duration,
    pub wait_timeout: Duration,
    pub settle_delay: Duration,
    pub scroll: ScrollPolicy,
    pub fallback_min_alt_len: usize,
    pub spider_api_key: Option<String>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        CollectConfig {
            backend: Backend::Webdriver,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser: Browser::Chrome,
            headless: true,
            user_agent: USER_AGENT.to_string(),
            page_load_timeout: Duration::from_secs(PAGE_LOAD_TIMEOUT_SECS),
            wait_timeout: Duration::from_secs(WAIT_TIMEOUT_SECS),
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            scroll: ScrollPolicy::default(),
            fallback_min_alt_len: DEFAULT_FALLBACK_MIN_LEN,
            spider_api_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub output: PathBuf,
    pub collect: CollectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_url: DEFAULT_TARGET_URL.to_string(),
            output: PathBuf::from(store::DEFAULT_PATH),
            collect: CollectConfig::default(),
        }
    }
}

impl Config {
    pub fn base_url(&self) -> Option<Url> {
        Url::parse(&self.target_url).ok()
    }
}
