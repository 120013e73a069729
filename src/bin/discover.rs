// src/bin/discover.rs
//! CLI: run one discovery and print the result as JSON.
//!
//! discover <keyword>... [--platforms youtube,instagram] [--range week] [--max 10]
//!          [--min-similarity 0.3] [--metrics]

use anyhow::Result;
use clap::Parser;
use trend_discovery::{
    telemetry, Credentials, DiscoveryConfig, DiscoveryOptions, Platform, TimeRange,
    TrendDiscovery, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY,
};

#[derive(Parser, Debug)]
#[command(name = "discover")]
#[command(about = "Find trending topics for a keyword across platforms")]
#[command(version)]
struct Cli {
    /// Keyword; several words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    keyword: Vec<String>,

    /// Platforms to search (youtube, instagram, perplexity)
    #[arg(long, value_delimiter = ',', default_values_t = Platform::ALL)]
    platforms: Vec<Platform>,

    /// Time window: day, week or month
    #[arg(long, default_value = "week")]
    range: TimeRange,

    /// Maximum number of topics returned
    #[arg(long = "max", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Minimum cosine similarity to the keyword (0..=1)
    #[arg(long, default_value_t = DEFAULT_MIN_SIMILARITY)]
    min_similarity: f32,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    metrics: bool,
}

impl Cli {
    fn options(&self) -> DiscoveryOptions {
        DiscoveryOptions::new(self.keyword.join(" "))
            .platforms(self.platforms.iter().copied())
            .time_range(self.range)
            .max_results(self.max_results)
            .min_similarity(self.min_similarity)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let prom = if cli.metrics {
        Some(trend_discovery::metrics::install_prometheus()?)
    } else {
        None
    };

    let cfg = DiscoveryConfig::load_default()?;
    let discovery = TrendDiscovery::from_config(&cfg, &Credentials::from_env())?;
    tracing::info!(capabilities = ?discovery.capabilities(), "discovery ready");

    let result = discovery.discover(cli.options()).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(handle) = prom {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
