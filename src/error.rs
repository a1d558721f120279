// ==============================================================================
// error.rs - SuperKit Error Taxonomy
// ==============================================================================
// Description: Errors raised by detection, parsing, canonicalization, merge
//              and formatting, each tagged with the stage that produced it
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::VendorId;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Size, type and checksum screening before detection
    Validation,
    Detection,
    Parsing,
    Canonicalization,
    Merge,
    Formatting,
    Reference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Detection => "detection",
            Stage::Parsing => "parsing",
            Stage::Canonicalization => "canonicalization",
            Stage::Merge => "merge",
            Stage::Formatting => "formatting",
            Stage::Reference => "reference",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while building a SuperKit
#[derive(Error, Debug)]
pub enum SuperkitError {
    /// Vendor unrecognized; the file is skipped
    #[error("Could not determine DNA vendor of {}", path.display())]
    DetectionFailure { path: PathBuf },

    /// Vendor layout violated; the file is excluded
    #[error("{vendor} file {} is malformed at line {line}: {details}", path.display())]
    MalformedInput {
        path: PathBuf,
        vendor: VendorId,
        line: u64,
        details: String,
    },

    #[error("Vendor '{vendor}' has no registered profile (during {stage})")]
    UnsupportedVendor { vendor: VendorId, stage: Stage },

    /// No kit survived canonicalization; aborts the run
    #[error("No kit could be loaded and canonicalized")]
    EmptyInput,

    #[error("Restore requested but no reference table exists for {vendor}")]
    ReferenceTableMismatch { vendor: VendorId },

    #[error("Invalid detection fingerprint for {vendor}: {source}")]
    Fingerprint {
        vendor: VendorId,
        #[source]
        source: regex::Error,
    },

    #[error("IO error on {} during {stage}: {source}", path.display())]
    Io {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {} during {stage}: {source}", path.display())]
    Csv {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: csv::Error,
    },

    #[error("Reference database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{vendor} output is ASCII-only, cannot encode '{value}'")]
    NonAscii { vendor: VendorId, value: String },
}

/// Type alias for Results using SuperkitError
pub type Result<T> = std::result::Result<T, SuperkitError>;

impl SuperkitError {
    pub fn io(path: impl AsRef<Path>, stage: Stage, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            stage,
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, stage: Stage, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            stage,
            source,
        }
    }

    pub fn malformed(
        path: impl AsRef<Path>,
        vendor: VendorId,
        line: u64,
        details: impl Into<String>,
    ) -> Self {
        Self::MalformedInput {
            path: path.as_ref().to_path_buf(),
            vendor,
            line,
            details: details.into(),
        }
    }

    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            SuperkitError::DetectionFailure { .. } | SuperkitError::Fingerprint { .. } => {
                Stage::Detection
            }
            SuperkitError::MalformedInput { .. } => Stage::Parsing,
            SuperkitError::UnsupportedVendor { stage, .. } => *stage,
            SuperkitError::EmptyInput => Stage::Merge,
            SuperkitError::ReferenceTableMismatch { .. } | SuperkitError::Sqlite(_) => {
                Stage::Reference
            }
            SuperkitError::Io { stage, .. } | SuperkitError::Csv { stage, .. } => *stage,
            SuperkitError::NonAscii { .. } => Stage::Formatting,
        }
    }

    /// Whether this error aborts the whole batch rather than a single file
    /// or a single output request
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(self, SuperkitError::EmptyInput | SuperkitError::Fingerprint { .. })
    }
}
