//! `download` command: parse pages, download each item, save to disk.

use anyhow::{Result, bail};
use media_acquire::{Asset, ItemOutcome, ParseApi};
use tracing::{info, warn};

use crate::app::output::save_unique;
use crate::app::progress_ui::BarReporter;
use crate::app::runtime::{AcquireServices, RuntimeSettings};

/// Collects assets from every page, skipping pages that fail to parse.
pub(crate) async fn collect_assets(parse: &dyn ParseApi, pages: &[String]) -> Vec<Asset> {
    let mut assets = Vec::new();
    for page in pages {
        match parse.parse(page).await {
            Ok(found) => {
                info!(page = %page, items = found.len(), "Parsed page");
                assets.extend(found);
            }
            Err(error) => warn!(page = %page, error = %error, "Skipping page"),
        }
    }
    assets
}

pub(crate) async fn run_download_command(
    settings: &RuntimeSettings,
    pages: &[String],
    show_progress: bool,
) -> Result<()> {
    let services = AcquireServices::build(settings)?;
    let assets = collect_assets(&services.parse, pages).await;
    if assets.is_empty() {
        bail!("No downloadable media found");
    }

    let reporter = BarReporter::new("", show_progress);
    let mut saved = 0_usize;
    let mut upsell = 0_usize;
    let mut failed = 0_usize;

    for asset in &assets {
        reporter.start_item(&asset.display_title);
        match services.controller.download(asset, &reporter).await {
            ItemOutcome::Saved(binary) => {
                let path = save_unique(&settings.output_dir, &binary.file_name, &binary.bytes).await?;
                saved += 1;
                info!(path = %path.display(), bytes = binary.len(), "Saved");
            }
            ItemOutcome::Upsell => {
                upsell += 1;
                warn!(title = %asset.display_title, "Usage limit reached; upgrade your plan to continue");
            }
            ItemOutcome::Failed(error) => {
                failed += 1;
                warn!(title = %asset.display_title, error = %error, "Download failed; try again later");
            }
            ItemOutcome::Busy | ItemOutcome::Abandoned => {
                warn!(title = %asset.display_title, "Skipped duplicate item");
            }
        }
    }
    reporter.finish();

    info!(
        saved,
        upsell,
        failed,
        total = assets.len(),
        "Download complete"
    );

    if saved == 0 {
        bail!("No items were downloaded");
    }
    Ok(())
}
