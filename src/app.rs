use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::feed::FeedFetcher;
use crate::models::{FeedItem, ResultRecord};
use crate::services::{HttpNavigator, Navigator, PreviewFetcher, PreviewSource, RedirectResolver};
use crate::store::ResultStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub new_records: usize,
    pub skipped_known: usize,
    /// Tracking links whose resolution failed this run.
    pub failed: Vec<String>,
    pub images_found: usize,
    pub total_records: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new, {} already known, {} failed, {} preview images found, {} records total",
            self.new_records,
            self.skipped_known,
            self.failed.len(),
            self.images_found,
            self.total_records
        )
    }
}

pub struct App {
    config: Config,
    fetch_images: bool,
}

impl App {
    pub fn new(config: Config, fetch_images: bool) -> Self {
        Self {
            config,
            fetch_images,
        }
    }

    /// Load the store, fold in new feed items, enrich previews, save.
    ///
    /// Only a failed store load, feed fetch or final save aborts the run.
    pub async fn run(&self) -> Result<RunSummary> {
        let output_path = &self.config.output_path;
        let mut store = ResultStore::load(output_path)?;

        let items = FeedFetcher::new(&self.config)?
            .fetch(&self.config.feed_url)
            .await?;
        tracing::info!("Feed returned {} items", items.len());

        let navigator = HttpNavigator::new(&self.config)?;
        let mut resolver = RedirectResolver::new(
            navigator,
            Duration::from_millis(self.config.redirect_timeout_ms),
        );
        let mut summary = resolve_new_items(&mut resolver, &items, &mut store).await;
        resolver.close().await;

        if self.fetch_images {
            let missing = store.records().iter().filter(|r| r.needs_preview()).count();
            tracing::info!("Fetching preview images for {} records", missing);
            let previews = PreviewFetcher::new(&self.config)?;
            summary.images_found = enrich_previews(&previews, &mut store).await;
        }

        store.save(output_path)?;
        summary.total_records = store.len();
        Ok(summary)
    }
}

/// Resolve every feed item whose tracking link is not yet in the store and
/// upsert the result. Failures are logged and skipped.
pub async fn resolve_new_items<N: Navigator>(
    resolver: &mut RedirectResolver<N>,
    items: &[FeedItem],
    store: &mut ResultStore,
) -> RunSummary {
    let mut summary = RunSummary::default();

    for item in items {
        if store.contains_tracking_link(&item.tracking_link) {
            summary.skipped_known += 1;
            continue;
        }

        tracing::info!("Processing: {}", item.tracking_link);
        let final_url = match resolver.resolve(&item.tracking_link).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("No final URL for {}: {}", item.tracking_link, e);
                summary.failed.push(item.tracking_link.clone());
                continue;
            }
        };

        store.upsert(ResultRecord::from_feed_item(item, final_url));
        summary.new_records += 1;
    }

    summary
}

/// Fill in `og_image` for records that lack one. Returns how many were found.
pub async fn enrich_previews<P: PreviewSource + ?Sized>(previews: &P, store: &mut ResultStore) -> usize {
    let mut found = 0;

    for record in store.records_mut().iter_mut().filter(|r| r.needs_preview()) {
        record.og_image = previews.og_image(&record.link).await;
        match &record.og_image {
            Some(image) => {
                tracing::info!("Preview image for {}: {}", record.link, image);
                found += 1;
            }
            None => tracing::debug!("No preview image for {}", record.link),
        }
    }

    found
}
