// ==============================================================================
// vendor_file.rs - Vendor Raw Data Parser
// ==============================================================================
// Description: Loads any supported vendor's raw genome file into raw rows
//              using that vendor's delimiter/comment/header options
// Author: Matt Barham
// Created: 2025-11-04
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Layouts:
//   23andMe / LivingDNA / SuperKit (tab, 4 columns)
//     rs548049170    1    69869    TT
//   MyHeritage / FamilyTreeDNA (comma, header line, 4 columns)
//     "rs4477212","1","82154","AA"
//   AncestryDNA (tab, header line, 5 columns)
//     rs4477212    1    82154    A    A
// ==============================================================================

use csv::{ReaderBuilder, Trim};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, Stage, SuperkitError};
use crate::models::VendorId;
use crate::parsers::open_input;
use crate::profiles::{ColumnLayout, ProfileRegistry};

/// Genotype as stored by the vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawAlleles {
    /// One genotype column ("AG", "--", "-A")
    Paired(String),
    /// Two allele columns ("A", "G")
    Split(String, String),
}

impl RawAlleles {
    /// Genotype as one string (split columns concatenated)
    pub fn joined(&self) -> String {
        match self {
            RawAlleles::Paired(genotype) => genotype.clone(),
            RawAlleles::Split(a, b) => format!("{}{}", a, b),
        }
    }
}

/// One data line, string-typed except for the position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub rsid: String,
    /// Vendor chromosome label ("1", "X", "23", ...)
    pub chromosome: String,
    pub position: u64,
    pub alleles: RawAlleles,
}

/// Raw rows of one file
#[derive(Debug, Clone)]
pub struct RawKit {
    pub path: PathBuf,
    pub vendor: VendorId,
    pub rows: Vec<RawRow>,
}

/// Parser for vendor raw data files
///
/// Performs no canonicalization: chromosome labels and genotypes are
/// returned exactly as the vendor wrote them.
#[derive(Debug, Clone, Copy)]
pub struct VendorFileParser<'a> {
    registry: &'a ProfileRegistry,
}

impl<'a> VendorFileParser<'a> {
    pub fn new(registry: &'a ProfileRegistry) -> Self {
        Self { registry }
    }

    /// Parse a vendor raw data file
    ///
    /// # Arguments
    /// * `path` - Path to the raw data file (optionally gzip-compressed)
    /// * `vendor` - Vendor the file was detected as
    ///
    /// # Returns
    /// * `Ok(RawKit)` - Successfully parsed rows
    /// * `Err(SuperkitError::MalformedInput)` - Wrong column count,
    ///   non-numeric position, or no data rows
    pub fn parse(&self, path: impl AsRef<Path>, vendor: VendorId) -> Result<RawKit> {
        let path = path.as_ref();
        let reader = open_input(path).map_err(|e| SuperkitError::io(path, Stage::Parsing, e))?;
        self.parse_reader(reader, path, vendor)
    }

    /// Parse from any reader; `path` is used for error context only
    pub fn parse_reader<R: Read>(
        &self,
        reader: R,
        path: &Path,
        vendor: VendorId,
    ) -> Result<RawKit> {
        let profile = self.registry.get(vendor, Stage::Parsing)?;
        let options = profile.parse;
        let expected = options.layout.column_count();

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .comment(options.comment)
            .has_headers(options.has_header)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        if options.has_header {
            let headers = csv_reader
                .headers()
                .map_err(|e| SuperkitError::csv(path, Stage::Parsing, e))?;
            if headers.len() != expected {
                let line = headers.position().map(|p| p.line()).unwrap_or(1);
                return Err(SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("expected {} header columns, found {}", expected, headers.len()),
                ));
            }
        }

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| SuperkitError::csv(path, Stage::Parsing, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() != expected {
                return Err(SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("expected {} fields, found {}", expected, record.len()),
                ));
            }

            let position_str = &record[2];
            let position = position_str.parse::<u64>().map_err(|_| {
                SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("invalid position '{}'", position_str),
                )
            })?;

            let alleles = match options.layout {
                ColumnLayout::Paired => RawAlleles::Paired(record[3].to_string()),
                ColumnLayout::SplitAlleles => {
                    RawAlleles::Split(record[3].to_string(), record[4].to_string())
                }
            };

            rows.push(RawRow {
                line,
                rsid: record[0].to_string(),
                chromosome: record[1].to_string(),
                position,
                alleles,
            });
        }

        if rows.is_empty() {
            return Err(SuperkitError::malformed(
                path,
                vendor,
                0,
                "file is empty or contains only comments",
            ));
        }

        debug!("Parsed {} {} rows from {:?}", rows.len(), vendor, path);

        Ok(RawKit {
            path: path.to_path_buf(),
            vendor,
            rows,
        })
    }
}
