//! `archive` command: parse pages, acquire all items, save one zip.

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::app::output::save_unique;
use crate::app::progress_ui::BarReporter;
use crate::app::runtime::{AcquireServices, RuntimeSettings};

use super::download::collect_assets;

pub(crate) async fn run_archive_command(
    settings: &RuntimeSettings,
    pages: &[String],
    archive_name: &str,
    show_progress: bool,
) -> Result<()> {
    let services = AcquireServices::build(settings)?;
    let assets = collect_assets(&services.parse, pages).await;
    if assets.is_empty() {
        bail!("No downloadable media found");
    }

    let reporter = BarReporter::new("archive", show_progress);
    let archiver = services.archiver.with_archive_name(archive_name);
    let result = archiver.archive_all(&assets, &reporter).await;
    reporter.finish();
    let blob = result?;

    for skipped in &blob.skipped {
        warn!(source_url = %skipped, "Item left out of archive");
    }
    let path = save_unique(&settings.output_dir, &blob.file_name, &blob.bytes).await?;
    info!(
        path = %path.display(),
        entries = blob.entries.len(),
        skipped = blob.skipped.len(),
        "Archive saved"
    );
    Ok(())
}
