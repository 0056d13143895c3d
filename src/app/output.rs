//! Writing acquired bytes to the output directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;

const MAX_SUFFIX: usize = 1000;

/// Writes `bytes` to `dir/file_name`, picking `name_2.ext`, `name_3.ext`, ...
/// when the name is taken. Never overwrites an existing file.
pub(crate) async fn save_unique(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

    let file_name = safe_file_name(file_name);
    let (stem, ext) = split_extension(&file_name);

    for suffix in 1..MAX_SUFFIX {
        let candidate = if suffix == 1 {
            dir.join(&file_name)
        } else {
            dir.join(format!("{stem}_{suffix}{ext}"))
        };

        let mut handle = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create '{}'", candidate.display()));
            }
        };
        handle
            .write_all(bytes)
            .await
            .with_context(|| format!("Failed to write '{}'", candidate.display()))?;
        handle.flush().await?;
        return Ok(candidate);
    }

    bail!(
        "No free file name for '{file_name}' in '{}' after {MAX_SUFFIX} attempts",
        dir.display()
    )
}

/// Keeps only the final path segment and rejects dot segments.
fn safe_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." {
        "download.bin".to_string()
    } else {
        last.to_string()
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}
