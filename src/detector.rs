// ==============================================================================
// detector.rs - Vendor Detection
// ==============================================================================
// Description: Classifies a raw DNA data file by matching vendor fingerprints
//              against its file name and text
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Header length varies between 0 and 19 comment lines across vendors, so the
// whole file text is searched. First match in registry order wins.
// ==============================================================================

use regex::Regex;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, Stage, SuperkitError};
use crate::models::VendorId;
use crate::parsers::open_input;
use crate::profiles::ProfileRegistry;

/// Compiled fingerprints in detection priority order
#[derive(Debug, Clone)]
pub struct VendorDetector {
    fingerprints: Vec<(VendorId, Regex)>,
}

impl VendorDetector {
    pub fn new(registry: &ProfileRegistry) -> Result<Self> {
        let fingerprints = registry
            .profiles()
            .iter()
            .map(|profile| {
                Regex::new(profile.fingerprint)
                    .map(|re| (profile.vendor, re))
                    .map_err(|source| SuperkitError::Fingerprint {
                        vendor: profile.vendor,
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fingerprints })
    }

    /// Classify from a file name and the file text
    ///
    /// Both inputs are lowercased before matching. Returns
    /// `VendorId::Unknown` if no fingerprint matches.
    pub fn detect(&self, filename: &str, text: &str) -> VendorId {
        let filename = filename.to_lowercase();
        let text = text.to_lowercase();

        self.fingerprints
            .iter()
            .find(|(_, re)| re.is_match(&filename) || re.is_match(&text))
            .map(|(vendor, _)| *vendor)
            .unwrap_or(VendorId::Unknown)
    }

    /// Read a file and classify it
    ///
    /// Returns `DetectionFailure` when no fingerprint matches.
    pub fn detect_file(&self, path: impl AsRef<Path>) -> Result<VendorId> {
        let path = path.as_ref();
        let text = read_screening_text(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match self.detect(&filename, &text) {
            VendorId::Unknown => Err(SuperkitError::DetectionFailure {
                path: path.to_path_buf(),
            }),
            vendor => {
                debug!("Detected {} for {:?}", vendor, path);
                Ok(vendor)
            }
        }
    }
}

/// Concatenate every line of a file into one screening string
fn read_screening_text(path: &Path) -> Result<String> {
    let reader = BufReader::new(
        open_input(path).map_err(|e| SuperkitError::io(path, Stage::Detection, e))?,
    );

    let mut text = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| SuperkitError::io(path, Stage::Detection, e))?;
        text.push(' ');
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}
