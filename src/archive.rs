// src/archive.rs

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{Read, Seek},
    path::Path,
};
use tracing::{debug, instrument, trace};
use zip::ZipArchive;

/// Upper bound on the buffer reserved up front from an entry's declared size.
const MAX_PREALLOC: u64 = 1 << 20;

/// One `.csv` member of an archive, buffered in memory.
#[derive(Debug, Clone)]
pub struct CsvEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Open `zip_path` and buffer every `.csv` entry, in archive order.
#[instrument(level = "info", skip(zip_path), fields(path = %zip_path.as_ref().display()))]
pub fn read_csv_entries<P: AsRef<Path>>(zip_path: P) -> Result<Vec<CsvEntry>> {
    let file = File::open(&zip_path)
        .with_context(|| format!("Failed to open ZIP file: {:?}", zip_path.as_ref()))?;
    csv_entries_from(file)
        .with_context(|| format!("Failed to read ZIP archive: {:?}", zip_path.as_ref()))
}

/// Same as [`read_csv_entries`] for an archive that is already open.
pub fn csv_entries_from<R: Read + Seek>(reader: R) -> Result<Vec<CsvEntry>> {
    let mut archive = ZipArchive::new(reader).context("not a ZIP archive")?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to access ZIP entry #{}", i))?;
        let name = entry.name().to_string();

        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            // the declared size comes from the archive itself and may be forged
            let mut data = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("Failed to read {} into memory", name))?;
            trace!(name = %name, bytes = data.len(), "buffered entry");
            entries.push(CsvEntry { name, data });
        } else {
            trace!(name = %name, "skipping non-CSV entry");
        }
    }

    debug!(entries = entries.len(), "read CSV entries");
    Ok(entries)
}

pub fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"))
}
