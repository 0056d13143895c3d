//! Zip packaging for acquired binaries.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::asset::MediaBinary;

/// Packs `binaries` into an in-memory zip, in order.
///
/// Media is already compressed, so entries are stored rather than deflated.
/// Returns the archive bytes and the entry names used.
pub(crate) fn pack(binaries: &[MediaBinary]) -> ZipResult<(Vec<u8>, Vec<String>)> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut names = EntryNames::default();
    let mut entries = Vec::with_capacity(binaries.len());

    for binary in binaries {
        let name = names.claim(&binary.file_name);
        writer.start_file(name.as_str(), options)?;
        writer.write_all(&binary.bytes)?;
        entries.push(name);
    }

    let cursor = writer.finish()?;
    Ok((cursor.into_inner(), entries))
}

/// Hands out unique entry names, suffixing repeats as `name_2.ext`, `name_3.ext`.
#[derive(Debug, Default)]
struct EntryNames {
    taken: HashSet<String>,
}

impl EntryNames {
    fn claim(&mut self, requested: &str) -> String {
        if self.taken.insert(requested.to_string()) {
            return requested.to_string();
        }

        let (stem, ext) = split_extension(requested);
        let mut suffix: u32 = 2;
        loop {
            let candidate = format!("{stem}_{suffix}{ext}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Splits `name` into stem and extension (with its dot), if any.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
