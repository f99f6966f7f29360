mod collector;
mod config;
mod parser;
mod progress;
mod runner;
mod server;
mod status;
mod store;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use collector::{Collector, RawElement};
use config::{Backend, Browser, CollectConfig, Config};
use parser::Extractor;
use progress::Progress;
use runner::Runner;
use status::RunState;
use store::{CardRecord, CardStore, Color};

#[derive(Parser)]
#[command(name = "riftbound_scraper", about = "Riftbound card gallery scraper")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Card gallery page to scrape
    #[arg(long, global = true, env = "RIFTBOUND_URL", default_value = config::DEFAULT_TARGET_URL)]
    url: String,
    /// JSON file holding the scraped cards
    #[arg(short, long, global = true, env = "RIFTBOUND_OUTPUT", default_value = store::DEFAULT_PATH)]
    output: PathBuf,
    /// How the page is rendered
    #[arg(long, global = true, env = "RIFTBOUND_BACKEND", value_enum, default_value = "webdriver")]
    backend: Backend,
    /// WebDriver server (chromedriver, geckodriver)
    #[arg(long, global = true, env = "WEBDRIVER_URL", default_value = config::DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,
    /// Browser tried first; the other is the fallback
    #[arg(long, global = true, env = "RIFTBOUND_BROWSER", value_enum, default_value = "chrome")]
    browser: Browser,
    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,
    /// Consecutive unchanged probes at the bottom before scrolling stops
    #[arg(long, global = true, env = "RIFTBOUND_STABLE_PROBES", default_value = "2")]
    stable_probes: u32,
    /// Hard ceiling on scroll probes
    #[arg(long, global = true, env = "RIFTBOUND_MAX_PROBES", default_value = "60")]
    max_probes: u32,
    /// Seconds to wait for card images to appear
    #[arg(long, global = true, env = "RIFTBOUND_WAIT_SECS", default_value = "15")]
    wait_secs: u64,
    #[arg(long, global = true, env = "SPIDER_API_KEY", hide_env_values = true)]
    spider_api_key: Option<String>,
}

impl GlobalArgs {
    fn into_config(self) -> Config {
        let defaults = CollectConfig::default();
        Config {
            target_url: self.url,
            output: self.output,
            collect: CollectConfig {
                backend: self.backend,
                webdriver_url: self.webdriver_url,
                browser: self.browser,
                headless: !self.headful,
                wait_timeout: Duration::from_secs(self.wait_secs),
                scroll: collector::session::ScrollPolicy {
                    stable_probes: self.stable_probes,
                    max_probes: self.max_probes,
                    ..defaults.scroll
                },
                spider_api_key: self.spider_api_key,
                ..defaults
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (trigger, status, cards)
    Serve {
        #[arg(long, env = "RIFTBOUND_BIND", default_value = config::DEFAULT_BIND)]
        bind: SocketAddr,
        /// Directory whose index.html is served at /
        #[arg(long, env = "RIFTBOUND_STATIC_DIR")]
        static_dir: Option<PathBuf>,
    },
    /// Scrape the gallery once and write the cards file
    Run,
    /// Table of the stored cards
    Show {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Only cards of this color
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Totals by color, rarity and type
    Stats,
    /// Re-extract stored cards from their alt text
    Reparse,
    /// Extract a single alt text and print the record
    Parse {
        alt: String,
        /// Image URL the alt text belongs to
        #[arg(long, default_value = "")]
        src: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = cli.global.into_config();
    let store = CardStore::new(&config.output);

    let result = match cli.command {
        Commands::Serve { bind, static_dir } => {
            let state = Arc::new(server::AppState {
                runner: build_runner(&config),
                status: RunState::new(),
                static_dir,
            });
            return server::serve(bind, state).await;
        }
        Commands::Run => {
            let runner = build_runner(&config);
            let pb = spinner();
            let bar = pb.clone();
            let progress = move |p: Progress| bar.set_message(p.to_string());

            let summary = runner.run(&progress).await;
            pb.finish_and_clear();
            let summary = summary?;

            println!("{}", summary.message());
            for (color, n) in &summary.by_color {
                println!("  {:<8} {}", color, n);
            }
            println!(
                "  {:<8} {}",
                "none",
                summary.cards - summary.colored
            );
            Ok(())
        }
        Commands::Show { limit, color } => {
            let filter = color
                .map(|c| Color::parse(&c).ok_or_else(|| anyhow!("unknown color '{}'", c)))
                .transpose()?;
            let cards = store.load()?;
            if cards.is_empty() {
                println!("No cards stored. Run 'run' first.");
                return Ok(());
            }
            let rows: Vec<&CardRecord> = cards
                .iter()
                .filter(|c| filter.map_or(true, |f| c.colors.contains(&f)))
                .collect();
            print_table(&rows, limit);
            Ok(())
        }
        Commands::Stats => {
            let cards = store.load()?;
            print_stats(&cards);
            Ok(())
        }
        Commands::Reparse => {
            let cards = store.load()?;
            if cards.is_empty() {
                println!("No cards stored. Run 'run' first.");
                return Ok(());
            }
            let extractor = Extractor::new(config.base_url());
            let previous = cards.clone();
            let fresh = tokio::task::spawn_blocking(move || runner::reparse(&cards, &extractor))
                .await
                .context("Reparse task failed")?;
            let changed = previous.iter().zip(&fresh).filter(|(a, b)| a != b).count();
            store.save(&fresh)?;
            println!(
                "Re-extracted {} cards ({} changed) into {}",
                fresh.len(),
                changed,
                store.path().display()
            );
            Ok(())
        }
        Commands::Parse { alt, src } => {
            let raw = RawElement {
                source_url: src,
                alt_text: alt,
                document_index: 0,
            };
            let card = Extractor::new(config.base_url()).extract(&raw, 1);
            println!("{}", serde_json::to_string_pretty(&card)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_runner(config: &Config) -> Runner {
    let collector = Collector::new(config.collect.clone());
    Runner::new(
        Arc::new(collector),
        CardStore::new(&config.output),
        config.target_url.clone(),
    )
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_table(rows: &[&CardRecord], limit: usize) {
    println!(
        "{:>4} | {:<9} | {:<28} | {:<14} | {:<10} | {:<10} | {:<20}",
        "#", "Code", "Name", "Colors", "Type", "Rarity", "Tags"
    );
    println!("{}", "-".repeat(112));

    for c in rows.iter().take(limit) {
        let colors: Vec<&str> = c.colors.iter().map(|c| c.as_str()).collect();
        println!(
            "{:>4} | {:<9} | {:<28} | {:<14} | {:<10} | {:<10} | {:<20}",
            c.id,
            truncate(&c.external_id, 9),
            truncate(&c.name, 28),
            truncate(&colors.join(", "), 14),
            truncate(&c.card_type, 10),
            truncate(&c.rarity, 10),
            truncate(&c.tags.join(", "), 20),
        );
    }

    if rows.len() > limit {
        println!("\n{} of {} cards shown (-n to show more)", limit, rows.len());
    } else {
        println!("\n{} cards", rows.len());
    }
}

fn print_stats(cards: &[CardRecord]) {
    let mut by_color: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_rarity: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();

    for c in cards {
        if c.colors.is_empty() {
            *by_color.entry("-").or_default() += 1;
        }
        for color in &c.colors {
            *by_color.entry(color.as_str()).or_default() += 1;
        }
        *by_rarity.entry(or_dash(&c.rarity)).or_default() += 1;
        *by_type.entry(or_dash(&c.card_type)).or_default() += 1;
    }

    println!("Total:     {}", cards.len());
    println!("With code: {}", cards.iter().filter(|c| !c.external_id.is_empty()).count());
    for (title, counts) in [("Colors", by_color), ("Rarity", by_rarity), ("Type", by_type)] {
        println!("\n--- {} ---", title);
        for (k, n) in counts {
            println!("  {:<16} {}", k, n);
        }
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
