// ==============================================================================
// canonicalizer.rs - Kit Canonicalization
// ==============================================================================
// Description: Maps vendor chromosome labels and genotype encodings into the
//              canonical schema, infers sex and builds immutable Kits
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Steps:
//   1. Join split allele columns
//   2. Vendor chromosome label -> canonical chromosome
//   3. Vendor genotype encoding -> canonical alphabet
//   4. Sex inference from X heterozygosity
//   5. Male: X/Y/MT collapsed to haploid, heterozygous -> "--"
//   6. Genotypes longer than 2 characters -> "--"
//   7. Position 0 -> chromosome 0
//   8. Chromosome 0 bucket set aside for vendors that keep one
// ==============================================================================

use tracing::debug;

use crate::error::{Result, Stage, SuperkitError};
use crate::genotype::{self, NOCALL};
use crate::models::{Chromosome, GenotypeRecord, Kit, Sex, VendorId};
use crate::parsers::RawKit;
use crate::profiles::ProfileRegistry;

/// Below this fraction of heterozygous X calls a kit is inferred male
pub const MALE_HETEROZYGOSITY_THRESHOLD: f64 = 0.05;

/// Turns parsed vendor rows into canonical Kits
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'a> {
    registry: &'a ProfileRegistry,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(registry: &'a ProfileRegistry) -> Self {
        Self { registry }
    }

    /// Canonicalize the raw rows of one file
    ///
    /// Fails with `UnsupportedVendor` when the vendor has no profile and with
    /// `MalformedInput` when a chromosome label is not in the vendor's table.
    pub fn canonicalize(&self, raw: RawKit) -> Result<Kit> {
        let profile = self.registry.get(raw.vendor, Stage::Canonicalization)?;
        let vendor = raw.vendor;

        let mut records = Vec::with_capacity(raw.rows.len());
        for row in raw.rows {
            let chromosome = profile
                .chromosomes
                .to_canonical(&row.chromosome)
                .ok_or_else(|| {
                    SuperkitError::malformed(
                        &raw.path,
                        vendor,
                        row.line,
                        format!("unknown chromosome '{}'", row.chromosome),
                    )
                })?;

            let joined = row.alleles.joined().to_ascii_uppercase();
            records.push(GenotypeRecord {
                rsid: row.rsid,
                chromosome,
                position: row.position,
                genotype: profile.genotypes.encode(&joined),
                source: vendor,
            });
        }

        let kit = self.normalize(records, vendor)?;
        Ok(kit.with_source(&raw.path, None))
    }

    /// Apply sex inference and the post-encoding cleanup steps
    ///
    /// Records must already use canonical chromosomes and genotypes.
    /// Normalizing the records (placed and unplaced) of a Kit again yields
    /// the same Kit.
    pub fn normalize(&self, mut records: Vec<GenotypeRecord>, vendor: VendorId) -> Result<Kit> {
        let profile = self.registry.get(vendor, Stage::Canonicalization)?;
        let sex = infer_sex(&records);

        for record in records.iter_mut() {
            if sex == Sex::Male && record.chromosome.is_male_haploid() {
                record.genotype = genotype::collapse_haploid(&record.genotype);
            }
            if record.genotype.chars().count() > 2 {
                record.genotype = NOCALL.to_string();
            }
            if record.position == 0 {
                record.chromosome = Chromosome::Unplaced;
            }
        }

        let (unplaced, placed): (Vec<_>, Vec<_>) = if profile.keeps_unplaced_bucket {
            records
                .into_iter()
                .partition(|r| r.chromosome == Chromosome::Unplaced)
        } else {
            (Vec::new(), records)
        };

        debug!(
            "Canonicalized {} kit: {} records, {} unplaced, sex {}",
            vendor,
            placed.len(),
            unplaced.len(),
            sex.as_str()
        );

        Ok(Kit::new(vendor, sex, placed, unplaced))
    }
}

/// Infer sex from the heterozygous fraction of placed X chromosome calls
///
/// A kit without X calls is `Sex::Unknown`.
pub fn infer_sex(records: &[GenotypeRecord]) -> Sex {
    let (total, hetero) = records
        .iter()
        .filter(|r| r.chromosome == Chromosome::X && r.position != 0)
        .fold((0usize, 0usize), |(total, hetero), r| {
            let het = usize::from(genotype::is_heterozygous(&r.genotype));
            (total + 1, hetero + het)
        });

    if total == 0 {
        return Sex::Unknown;
    }

    let ratio = hetero as f64 / total as f64;
    if ratio < MALE_HETEROZYGOSITY_THRESHOLD {
        Sex::Male
    } else {
        Sex::Female
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::{RawAlleles, RawRow};
    use std::path::PathBuf;

    fn record(chromosome: Chromosome, position: u64, genotype: &str) -> GenotypeRecord {
        GenotypeRecord {
            rsid: format!("rs{}", position),
            chromosome,
            position,
            genotype: genotype.to_string(),
            source: VendorId::TwentyThreeAndMeV5,
        }
    }

    fn x_records(homozygous: usize, heterozygous: usize) -> Vec<GenotypeRecord> {
        let mut records = Vec::new();
        for i in 0..homozygous {
            records.push(record(Chromosome::X, 1000 + i as u64, "AA"));
        }
        for i in 0..heterozygous {
            records.push(record(Chromosome::X, 5000 + i as u64, "AG"));
        }
        records
    }

    fn raw_row(line: u64, chromosome: &str, position: u64, alleles: RawAlleles) -> RawRow {
        RawRow {
            line,
            rsid: format!("rs{}", line),
            chromosome: chromosome.to_string(),
            position,
            alleles,
        }
    }

    #[test]
    fn test_sex_inference_boundary() {
        // 1/20 = 0.05 is not below the threshold
        assert_eq!(infer_sex(&x_records(19, 1)), Sex::Female);
        // 1/21 < 0.05
        assert_eq!(infer_sex(&x_records(20, 1)), Sex::Male);
        assert_eq!(infer_sex(&x_records(20, 0)), Sex::Male);
        assert_eq!(infer_sex(&x_records(10, 10)), Sex::Female);
    }

    #[test]
    fn test_sex_unknown_without_x() {
        let records = vec![record(Chromosome::Autosome(1), 100, "AG")];
        assert_eq!(infer_sex(&records), Sex::Unknown);
        assert_eq!(infer_sex(&[]), Sex::Unknown);
    }

    #[test]
    fn test_canonicalize_ancestry() {
        let registry = ProfileRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);

        let raw = RawKit {
            path: PathBuf::from("AncestryDNA.txt"),
            vendor: VendorId::AncestryDnaV2,
            rows: vec![
                raw_row(1, "1", 100, RawAlleles::Split("C".into(), "A".into())),
                raw_row(2, "2", 200, RawAlleles::Split("0".into(), "0".into())),
                raw_row(3, "23", 300, RawAlleles::Split("G".into(), "G".into())),
                raw_row(4, "26", 400, RawAlleles::Split("T".into(), "T".into())),
            ],
        };

        let kit = canonicalizer.canonicalize(raw).unwrap();
        assert_eq!(kit.vendor(), VendorId::AncestryDnaV2);
        assert_eq!(kit.sex(), Sex::Male);
        assert_eq!(kit.source_path(), Some(PathBuf::from("AncestryDNA.txt").as_path()));

        let records = kit.records();
        assert_eq!(records[0].genotype, "AC");
        assert_eq!(records[1].genotype, "--");
        assert_eq!(records[2].chromosome, Chromosome::X);
        assert_eq!(records[2].genotype, "G");
        assert_eq!(records[3].chromosome, Chromosome::MT);
        assert_eq!(records[3].genotype, "T");
    }

    #[test]
    fn test_unknown_chromosome_is_malformed() {
        let registry = ProfileRegistry::builtin();
        let raw = RawKit {
            path: PathBuf::from("genome.txt"),
            vendor: VendorId::TwentyThreeAndMeV5,
            rows: vec![
                raw_row(5, "1", 100, RawAlleles::Paired("AA".into())),
                raw_row(6, "23", 200, RawAlleles::Paired("AA".into())),
            ],
        };

        match Canonicalizer::new(&registry).canonicalize(raw).unwrap_err() {
            SuperkitError::MalformedInput { line, details, .. } => {
                assert_eq!(line, 6);
                assert!(details.contains("'23'"));
            }
            other => panic!("Expected MalformedInput error, got {:?}", other),
        }
    }

    #[test]
    fn test_male_collapse() {
        let registry = ProfileRegistry::builtin();
        let mut records = x_records(20, 1);
        records.push(record(Chromosome::Y, 10, "CC"));
        records.push(record(Chromosome::MT, 20, "CT"));
        records.push(record(Chromosome::XY, 30, "AG"));
        records.push(record(Chromosome::Autosome(3), 40, "GG"));

        let kit = Canonicalizer::new(&registry)
            .normalize(records, VendorId::TwentyThreeAndMeV5)
            .unwrap();
        assert_eq!(kit.sex(), Sex::Male);

        let genotype_at = |chromosome: Chromosome, position: u64| {
            kit.records()
                .iter()
                .find(|r| r.chromosome == chromosome && r.position == position)
                .map(|r| r.genotype.clone())
        };
        assert_eq!(genotype_at(Chromosome::X, 1000).as_deref(), Some("A"));
        assert_eq!(genotype_at(Chromosome::X, 5000).as_deref(), Some("--"));
        assert_eq!(genotype_at(Chromosome::Y, 10).as_deref(), Some("C"));
        assert_eq!(genotype_at(Chromosome::MT, 20).as_deref(), Some("--"));
        // Pseudoautosomal and autosomal calls stay diploid
        assert_eq!(genotype_at(Chromosome::XY, 30).as_deref(), Some("AG"));
        assert_eq!(genotype_at(Chromosome::Autosome(3), 40).as_deref(), Some("GG"));
    }

    #[test]
    fn test_female_calls_untouched() {
        let registry = ProfileRegistry::builtin();
        let kit = Canonicalizer::new(&registry)
            .normalize(x_records(10, 5), VendorId::TwentyThreeAndMeV5)
            .unwrap();
        assert_eq!(kit.sex(), Sex::Female);
        assert!(kit.records().iter().all(|r| r.genotype.len() == 2));
    }

    #[test]
    fn test_cleanup_steps() {
        let registry = ProfileRegistry::builtin();
        let records = vec![
            record(Chromosome::Autosome(1), 100, "AGT"),
            record(Chromosome::Autosome(2), 0, "AA"),
        ];
        let kit = Canonicalizer::new(&registry)
            .normalize(records, VendorId::MyHeritageV1)
            .unwrap();

        assert_eq!(kit.records()[0].genotype, "--");
        assert_eq!(kit.records()[1].chromosome, Chromosome::Unplaced);
        assert!(kit.unplaced().is_empty());
    }

    #[test]
    fn test_unplaced_bucket() {
        let registry = ProfileRegistry::builtin();
        let records = vec![
            record(Chromosome::Unplaced, 0, "AA"),
            record(Chromosome::Autosome(5), 0, "CC"),
            record(Chromosome::Autosome(5), 500, "GG"),
        ];
        let kit = Canonicalizer::new(&registry)
            .normalize(records, VendorId::FamilyTreeDnaV3)
            .unwrap();

        assert_eq!(kit.records().len(), 1);
        assert_eq!(kit.unplaced().len(), 2);
        assert!(kit
            .unplaced()
            .iter()
            .all(|r| r.chromosome == Chromosome::Unplaced));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let registry = ProfileRegistry::builtin();
        let canonicalizer = Canonicalizer::new(&registry);

        let mut records = x_records(30, 1);
        records.push(record(Chromosome::X, 0, "AG"));
        records.push(record(Chromosome::Y, 77, "TT"));
        records.push(record(Chromosome::Autosome(9), 90, "ACGT"));
        records.push(record(Chromosome::Autosome(9), 0, "CT"));

        let once = canonicalizer
            .normalize(records, VendorId::FamilyTreeDnaV3)
            .unwrap();

        let mut again_input = once.records().to_vec();
        again_input.extend(once.unplaced().iter().cloned());
        let twice = canonicalizer
            .normalize(again_input, VendorId::FamilyTreeDnaV3)
            .unwrap();

        assert_eq!(once.sex(), twice.sex());
        assert_eq!(once.records(), twice.records());
        assert_eq!(once.unplaced(), twice.unplaced());
    }

    #[test]
    fn test_unsupported_vendor() {
        let registry = ProfileRegistry::builtin();
        let err = Canonicalizer::new(&registry)
            .normalize(Vec::new(), VendorId::Unknown)
            .unwrap_err();
        assert!(matches!(
            err,
            SuperkitError::UnsupportedVendor {
                stage: Stage::Canonicalization,
                ..
            }
        ));
    }
}
