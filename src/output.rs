// ==============================================================================
// output.rs - Vendor Format Output Generation
// ==============================================================================
// Description: Re-expands a SuperKit into any vendor's raw data layout and
//              writes it with that vendor's header, delimiter and line endings
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Formatting order:
//   1. Drop chromosomes the target vendor does not test
//   2. Restore the vendor's marker set (optional) or reattach chromosome 0
//   3. Trim to tested coordinate ranges (optional)
//   4. Sort by the vendor's chromosome order, then position
//   5. Encode genotypes (nocall sentinel, haploid style, omitted calls, split)
//   6. Vendor chromosome labels
// ==============================================================================

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, Stage, SuperkitError};
use crate::genotype::{self, NOCALL};
use crate::models::{Chromosome, Superkit, SuperkitRecord, VendorId};
use crate::profiles::{
    ColumnLayout, HeaderContext, LineTerminator, ProfileRegistry, Quoting, VendorProfile,
};
use crate::reference_table::{ReferenceLibrary, ReferenceTable};

/// Optional formatting steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Keep only positions inside the vendor's tested ranges
    pub trim: bool,
    /// Emit exactly the vendor's saved marker set
    pub restore: bool,
}

/// A SuperKit in a vendor's shape, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorTable {
    pub vendor: VendorId,
    /// Comment lines preceding the column line
    pub header: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Output file name for a target vendor ("DNASuperKit-MyHeritage v1.csv")
pub fn output_file_name(profile: &VendorProfile) -> String {
    format!(
        "DNASuperKit-{}.{}",
        profile.vendor.display_name(),
        profile.extension
    )
}

/// Vendor format generator
pub struct OutputFormatter<'a> {
    registry: &'a ProfileRegistry,
    references: Option<&'a ReferenceLibrary>,
    options: FormatOptions,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(registry: &'a ProfileRegistry, options: FormatOptions) -> Self {
        Self {
            registry,
            references: None,
            options,
        }
    }

    /// Reference tables used by the restore step
    pub fn with_references(mut self, references: &'a ReferenceLibrary) -> Self {
        self.references = Some(references);
        self
    }

    /// Shape a SuperKit for a target vendor
    ///
    /// # Returns
    /// * `Err(SuperkitError::UnsupportedVendor)` - target has no profile
    /// * `Err(SuperkitError::ReferenceTableMismatch)` - restore requested
    ///   but no table is loaded for the target
    /// * `Err(SuperkitError::NonAscii)` - a field cannot be written as ASCII
    pub fn format(
        &self,
        superkit: &Superkit,
        target: VendorId,
        ctx: &HeaderContext,
    ) -> Result<VendorTable> {
        let profile = self.registry.get(target, Stage::Formatting)?;

        // 1-2. Tested chromosomes, restored markers or reattached bucket
        let mut records: Vec<SuperkitRecord> = if self.options.restore {
            let table = self
                .references
                .ok_or(SuperkitError::ReferenceTableMismatch { vendor: target })?
                .require(target)?;
            restore(superkit, profile, table)
        } else {
            let mut records: Vec<SuperkitRecord> = superkit
                .records
                .iter()
                .filter(|r| profile.tests_chromosome(r.chromosome))
                .cloned()
                .collect();
            if profile.keeps_unplaced_bucket {
                records.extend(superkit.unplaced.iter().cloned());
            }
            records
        };

        // 3. Trim
        if self.options.trim {
            let before = records.len();
            records.retain(|r| profile.tested_ranges.contains(r.chromosome, r.position));
            debug!("Trimmed {} {} rows outside tested ranges", before - records.len(), target);
        }

        // 4. Vendor sort order
        records.sort_by_key(|r| {
            (
                profile.chromosome_rank(r.chromosome).unwrap_or(usize::MAX),
                r.position,
            )
        });

        // 5-6. Encode
        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let Some(alleles) = encode_genotype(profile, &record.genotype) else {
                continue;
            };

            let mut row = Vec::with_capacity(profile.parse.layout.column_count());
            row.push(record.rsid.clone());
            row.push(profile.chromosomes.to_vendor(record.chromosome));
            row.push(record.position.to_string());
            row.extend(alleles);

            if let Some(value) = row.iter().find(|field| !field.is_ascii()) {
                return Err(SuperkitError::NonAscii {
                    vendor: target,
                    value: value.clone(),
                });
            }
            rows.push(row);
        }

        debug!(
            "Formatted {} rows for {} ({} records before encoding)",
            rows.len(),
            target,
            records.len()
        );

        Ok(VendorTable {
            vendor: target,
            header: profile.header.render(ctx),
            columns: profile.columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }

    /// Write a formatted table to any writer
    pub fn write_to<W: Write>(&self, table: &VendorTable, mut writer: W) -> Result<()> {
        let profile = self.registry.get(table.vendor, Stage::Formatting)?;
        let context = PathBuf::from(output_file_name(profile));
        let terminator = profile.line_terminator.as_str();
        let delimiter = char::from(profile.output_delimiter()).to_string();

        let mut preamble = String::new();
        for line in &table.header {
            preamble.push_str(line);
            preamble.push_str(terminator);
        }
        preamble.push_str(&table.columns.join(delimiter.as_str()));
        preamble.push_str(terminator);
        writer
            .write_all(preamble.as_bytes())
            .map_err(|e| SuperkitError::io(&context, Stage::Formatting, e))?;

        let mut csv_writer = WriterBuilder::new()
            .delimiter(profile.output_delimiter())
            .has_headers(false)
            .terminator(match profile.line_terminator {
                LineTerminator::CrLf => Terminator::CRLF,
                LineTerminator::Lf => Terminator::Any(b'\n'),
            })
            .quote_style(match profile.quoting {
                Quoting::All => QuoteStyle::Always,
                Quoting::Minimal => QuoteStyle::Necessary,
            })
            .from_writer(writer);

        for row in &table.rows {
            csv_writer
                .write_record(row)
                .map_err(|e| SuperkitError::csv(&context, Stage::Formatting, e))?;
        }
        csv_writer
            .flush()
            .map_err(|e| SuperkitError::io(&context, Stage::Formatting, e))?;

        Ok(())
    }

    /// Format and write `DNASuperKit-<vendor>.<ext>` into `output_dir`
    pub fn write(
        &self,
        superkit: &Superkit,
        target: VendorId,
        output_dir: &Path,
        ctx: &HeaderContext,
    ) -> Result<PathBuf> {
        let table = self.format(superkit, target, ctx)?;
        self.write_table(&table, output_dir)
    }

    /// Write an already formatted table into `output_dir`
    pub fn write_table(&self, table: &VendorTable, output_dir: &Path) -> Result<PathBuf> {
        let profile = self.registry.get(table.vendor, Stage::Formatting)?;
        let path = output_dir.join(output_file_name(profile));

        info!("Writing {} rows of {} output: {:?}", table.rows.len(), table.vendor, path);

        let file = File::create(&path).map_err(|e| SuperkitError::io(&path, Stage::Formatting, e))?;
        self.write_to(table, BufWriter::new(file))?;

        Ok(path)
    }
}

/// The vendor's marker set filled with SuperKit genotypes
///
/// Placed markers are matched by (chromosome, position), chromosome-0 markers
/// by rsid. Markers without a SuperKit call become no-calls.
fn restore(
    superkit: &Superkit,
    profile: &VendorProfile,
    table: &ReferenceTable,
) -> Vec<SuperkitRecord> {
    let by_position: HashMap<(Chromosome, u64), &str> = superkit
        .records
        .iter()
        .filter(|r| r.chromosome != Chromosome::Unplaced)
        .map(|r| ((r.chromosome, r.position), r.genotype.as_str()))
        .collect();

    let mut by_rsid: HashMap<&str, &str> = HashMap::new();
    for record in superkit
        .records
        .iter()
        .filter(|r| r.chromosome == Chromosome::Unplaced)
        .chain(&superkit.unplaced)
    {
        by_rsid
            .entry(record.rsid.as_str())
            .or_insert(record.genotype.as_str());
    }

    table
        .markers()
        .iter()
        .filter(|m| profile.tests_chromosome(m.chromosome))
        .map(|marker| {
            let genotype = if marker.chromosome == Chromosome::Unplaced {
                by_rsid.get(marker.rsid.as_str())
            } else {
                by_position.get(&(marker.chromosome, marker.position))
            };
            SuperkitRecord {
                rsid: marker.rsid.clone(),
                chromosome: marker.chromosome,
                position: marker.position,
                genotype: genotype.copied().unwrap_or(NOCALL).to_string(),
            }
        })
        .collect()
}

/// Vendor genotype column(s) for a canonical call; `None` drops the row
fn encode_genotype(profile: &VendorProfile, canonical: &str) -> Option<Vec<String>> {
    if profile.omitted_genotypes.contains(&canonical) {
        return None;
    }

    let mut chars = canonical.chars();
    let encoded = match (chars.next(), chars.next()) {
        _ if genotype::is_nocall(canonical) => profile.nocall.to_string(),
        (Some(allele), None) if matches!(allele, 'A' | 'C' | 'G' | 'T') => {
            profile.haploid.encode(allele)
        }
        _ => canonical.to_string(),
    };

    match profile.parse.layout {
        ColumnLayout::Paired => Some(vec![encoded]),
        ColumnLayout::SplitAlleles => {
            let (first, second) = genotype::split_alleles(&encoded);
            Some(vec![first, second])
        }
    }
}
