// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Structural loading of vendor raw data files
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod vendor_file;

pub use vendor_file::{RawAlleles, RawKit, RawRow, VendorFileParser};

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Whether a path names a gzip-compressed download (".txt.gz", ".csv.gz")
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

/// Open a raw data file, transparently decompressing gzip downloads
///
/// The handle is owned by the returned reader and released when it drops.
pub fn open_input(path: &Path) -> std::io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}
