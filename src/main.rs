use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod error;
mod feed;
mod models;
mod services;
mod store;

use app::App;
use config::Config;
use error::Result;

/// Resolve news feed tracking links to their articles and collect preview images.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file to use instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,

    /// RSS feed to read
    #[arg(long, env = "NEWS_RESOLVER_FEED_URL")]
    feed_url: Option<String>,

    /// JSON file holding the result records
    #[arg(short, long, env = "NEWS_RESOLVER_OUTPUT")]
    output: Option<PathBuf>,

    /// Time budget for following one tracking link's redirects
    #[arg(long)]
    redirect_timeout_ms: Option<u64>,

    /// Skip fetching Open Graph preview images
    #[arg(long, default_value_t = false)]
    no_images: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(feed_url) = args.feed_url {
        config.feed_url = feed_url;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(timeout) = args.redirect_timeout_ms {
        config.redirect_timeout_ms = timeout;
    }
    config.validate()?;

    let output_path = config.output_path.clone();
    let summary = App::new(config, !args.no_images).run().await?;

    tracing::info!("{}", summary);
    println!("Done. Results saved to '{}'", output_path.display());

    Ok(())
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
