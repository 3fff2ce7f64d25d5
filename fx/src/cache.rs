//! Rate table cache file, one JSON file per base currency.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use exchange_common::normalize_base;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::table::RateTable;

/// Errors reading or writing the cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The file or its directory could not be accessed.
    #[error("Cache file I/O: {0}")]
    Io(#[from] io::Error),

    /// The table could not be encoded.
    #[error("Encoding cached data: {0}")]
    Encode(#[source] serde_json::Error),

    /// The file does not contain a rate table.
    #[error("Decoding cached data: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Location of the cache file for a base currency.
pub fn cache_path(directory: &Path, base_currency: &str) -> PathBuf {
    directory.join(format!("{}.json", normalize_base(base_currency)))
}

/// Read a cached rate table.
pub fn load(path: &Path) -> Result<RateTable, CacheError> {
    let data = fs::read(path)?;
    let table = serde_json::from_slice(&data).map_err(CacheError::Decode)?;

    debug!(path = %path.display(), "Loaded cached rates");
    Ok(table)
}

/// Write a rate table to the cache file.
///
/// The data goes to an owner-only temporary file next to the target which is
/// then renamed into place, so a reader sees either the old or the new file.
pub fn save(path: &Path, table: &RateTable) -> Result<(), CacheError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_directory(directory)?;

    let mut file = NamedTempFile::new_in(directory)?;
    serde_json::to_writer(&mut file, table).map_err(CacheError::Encode)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| CacheError::Io(e.error))?;

    debug!(path = %path.display(), rates = table.rates.len(), "Saved rates to cache");
    Ok(())
}

fn create_directory(directory: &Path) -> io::Result<()> {
    if directory.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }

    builder.create(directory)
}
