// ==============================================================================
// profiles/mod.rs - Vendor Profile Registry
// ==============================================================================
// Description: Immutable per-vendor rules for detecting, parsing,
//              canonicalizing and re-emitting raw DNA data files
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Vendor summary:
//   23andMe v5        tab, "# rsid" header comment, X/Y/MT, nocall "--"
//   AncestryDNA v2    tab, split allele columns, 23/24/25/26, nocall "00"
//   FamilyTreeDNA v3  comma, chromosome 0 bucket, XY/MT/X, haploid "-A"
//   LivingDNA v1.0.2  tab, autosomes + X only, nocalls omitted
//   MyHeritage v1     comma, quoted values, X/Y only, haploid "AA"
//   SuperKit          neutral tab format written by this tool
// ==============================================================================

pub mod headers;
pub mod ranges;

use std::collections::HashMap;

use crate::error::{Result, Stage, SuperkitError};
use crate::genotype::{self, ALLELES, NOCALL};
use crate::models::{Chromosome, VendorId};

pub use headers::{HeaderContext, HeaderTemplate};
pub use ranges::TestedRanges;

/// Number and meaning of the data columns in a vendor file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// rsid, chromosome, position, genotype
    Paired,
    /// rsid, chromosome, position, allele1, allele2
    SplitAlleles,
}

impl ColumnLayout {
    pub fn column_count(&self) -> usize {
        match self {
            ColumnLayout::Paired => 4,
            ColumnLayout::SplitAlleles => 5,
        }
    }
}

/// How a vendor file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub delimiter: u8,
    /// Lines starting with this byte are skipped
    pub comment: Option<u8>,
    /// First non-comment line holds column names
    pub has_header: bool,
    pub layout: ColumnLayout,
}

/// How a haploid call (male X/Y/MT) is written by a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaploidStyle {
    /// "A"
    Single,
    /// "AA"
    Doubled,
    /// "-A"
    HyphenPrefixed,
}

impl HaploidStyle {
    pub fn encode(&self, allele: char) -> String {
        match self {
            HaploidStyle::Single => allele.to_string(),
            HaploidStyle::Doubled => format!("{}{}", allele, allele),
            HaploidStyle::HyphenPrefixed => format!("-{}", allele),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
        }
    }
}

/// Quoting of data fields on output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    /// Only when a field requires it
    Minimal,
    /// Every data field quoted (the column header line is not)
    All,
}

/// Bidirectional chromosome label mapping
#[derive(Debug, Clone, Default)]
pub struct ChromosomeTable {
    inbound: HashMap<String, Chromosome>,
    outbound: HashMap<Chromosome, String>,
}

impl ChromosomeTable {
    /// Identity mapping over the canonical labels
    pub fn canonical() -> Self {
        let inbound = Chromosome::all()
            .into_iter()
            .map(|c| (c.to_string(), c))
            .collect();
        Self {
            inbound,
            outbound: HashMap::new(),
        }
    }

    /// Map a vendor label to a chromosome in both directions
    pub fn with_vendor_label(mut self, label: &str, chromosome: Chromosome) -> Self {
        self.inbound.insert(label.to_string(), chromosome);
        self.outbound.insert(chromosome, label.to_string());
        self
    }

    pub fn to_canonical(&self, label: &str) -> Option<Chromosome> {
        let label = label.trim();
        self.inbound
            .get(label)
            .or_else(|| self.inbound.get(&label.to_uppercase()))
            .copied()
    }

    pub fn to_vendor(&self, chromosome: Chromosome) -> String {
        self.outbound
            .get(&chromosome)
            .cloned()
            .unwrap_or_else(|| chromosome.to_string())
    }
}

/// Vendor genotype encodings mapped onto the canonical alphabet
///
/// Unlisted values pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct GenotypeTable {
    map: HashMap<String, String>,
}

impl GenotypeTable {
    /// Reversed allele pairs to alphabetical order ("CA" -> "AC")
    pub fn canonical() -> Self {
        let mut map = HashMap::new();
        for a in ALLELES {
            for b in ALLELES {
                let raw: String = [a, b].iter().collect();
                let ordered = genotype::canonical_order(&raw);
                if raw != ordered {
                    map.insert(raw, ordered);
                }
            }
        }
        Self { map }
    }

    pub fn with_mapping(mut self, from: &str, to: &str) -> Self {
        self.map.insert(from.to_string(), to.to_string());
        self
    }

    pub fn encode(&self, raw: &str) -> String {
        self.map.get(raw).cloned().unwrap_or_else(|| raw.to_string())
    }
}

/// Immutable rules describing one vendor's export format
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub vendor: VendorId,
    /// Lowercase regular expression matched against the lowercase file name
    /// and file text
    pub fingerprint: &'static str,
    pub parse: ParseOptions,
    pub chromosomes: ChromosomeTable,
    pub genotypes: GenotypeTable,
    /// Output column names, in file order
    pub columns: &'static [&'static str],
    /// Chromosomes the vendor tests, in the vendor's own sort order
    pub chromosome_order: Vec<Chromosome>,
    pub nocall: &'static str,
    pub haploid: HaploidStyle,
    /// Canonical genotypes the vendor never writes
    pub omitted_genotypes: &'static [&'static str],
    pub header: HeaderTemplate,
    pub line_terminator: LineTerminator,
    pub quoting: Quoting,
    pub extension: &'static str,
    pub tested_ranges: TestedRanges,
    /// Chromosome "0" rows are kept aside and reattached on output
    pub keeps_unplaced_bucket: bool,
}

impl VendorProfile {
    /// Position of a chromosome in this vendor's sort order
    pub fn chromosome_rank(&self, chromosome: Chromosome) -> Option<usize> {
        self.chromosome_order.iter().position(|c| *c == chromosome)
    }

    pub fn tests_chromosome(&self, chromosome: Chromosome) -> bool {
        self.chromosome_rank(chromosome).is_some()
    }

    pub fn output_delimiter(&self) -> u8 {
        self.parse.delimiter
    }
}

const INDEL_CALLS: &[&str] = &["DD", "II", "DI", "D", "I"];
const INDEL_AND_NOCALLS: &[&str] = &["DD", "II", "DI", "D", "I", NOCALL];

fn autosomes() -> impl Iterator<Item = Chromosome> {
    (1..=22).map(Chromosome::Autosome)
}

fn order(prefix: &[Chromosome], suffix: &[Chromosome]) -> Vec<Chromosome> {
    prefix
        .iter()
        .copied()
        .chain(autosomes())
        .chain(suffix.iter().copied())
        .collect()
}

/// Registry of vendor profiles in detection priority order
///
/// The order is part of the detection contract: the first profile whose
/// fingerprint matches wins. MyHeritage must precede FamilyTreeDNA since
/// both files carry the same column header line.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<VendorProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                twenty_three_and_me_v5(),
                living_dna_v102(),
                my_heritage_v1(),
                family_tree_dna_v3(),
                ancestry_dna_v2(),
                superkit(),
            ],
        }
    }

    /// Profiles in detection order
    pub fn profiles(&self) -> &[VendorProfile] {
        &self.profiles
    }

    pub fn get(&self, vendor: VendorId, stage: Stage) -> Result<&VendorProfile> {
        self.profiles
            .iter()
            .find(|p| p.vendor == vendor)
            .ok_or(SuperkitError::UnsupportedVendor { vendor, stage })
    }

    /// Replace a vendor's tested ranges (e.g. derived from a reference table)
    pub fn with_tested_ranges(mut self, vendor: VendorId, ranges: TestedRanges) -> Self {
        if let Some(profile) = self.profiles.iter_mut().find(|p| p.vendor == vendor) {
            profile.tested_ranges = ranges;
        }
        self
    }
}

fn twenty_three_and_me_v5() -> VendorProfile {
    VendorProfile {
        vendor: VendorId::TwentyThreeAndMeV5,
        fingerprint: r"_v5_full_|generated by 23andme",
        parse: ParseOptions {
            delimiter: b'\t',
            comment: Some(b'#'),
            has_header: false,
            layout: ColumnLayout::Paired,
        },
        chromosomes: ChromosomeTable::canonical(),
        genotypes: GenotypeTable::canonical(),
        columns: &["# rsid", "chromosome", "position", "genotype"],
        chromosome_order: order(&[], &[Chromosome::X, Chromosome::Y, Chromosome::MT]),
        nocall: NOCALL,
        haploid: HaploidStyle::Single,
        omitted_genotypes: &[],
        header: HeaderTemplate::TwentyThreeAndMe,
        line_terminator: LineTerminator::CrLf,
        quoting: Quoting::Minimal,
        extension: "txt",
        tested_ranges: ranges::builtin(VendorId::TwentyThreeAndMeV5),
        keeps_unplaced_bucket: false,
    }
}

fn living_dna_v102() -> VendorProfile {
    VendorProfile {
        vendor: VendorId::LivingDnaV102,
        fingerprint: r"# living dna customer genotype data download file version: 1\.0\.2",
        parse: ParseOptions {
            delimiter: b'\t',
            comment: Some(b'#'),
            has_header: false,
            layout: ColumnLayout::Paired,
        },
        chromosomes: ChromosomeTable::canonical(),
        genotypes: GenotypeTable::canonical(),
        columns: &["# rsid", "chromosome", "position", "genotype"],
        chromosome_order: order(&[Chromosome::Unplaced], &[Chromosome::X]),
        nocall: NOCALL,
        haploid: HaploidStyle::Single,
        omitted_genotypes: INDEL_AND_NOCALLS,
        header: HeaderTemplate::LivingDna,
        line_terminator: LineTerminator::Lf,
        quoting: Quoting::Minimal,
        extension: "txt",
        tested_ranges: ranges::builtin(VendorId::LivingDnaV102),
        keeps_unplaced_bucket: false,
    }
}

fn my_heritage_v1() -> VendorProfile {
    VendorProfile {
        vendor: VendorId::MyHeritageV1,
        fingerprint: r"# myheritage dna raw data\.",
        parse: ParseOptions {
            delimiter: b',',
            comment: Some(b'#'),
            has_header: true,
            layout: ColumnLayout::Paired,
        },
        chromosomes: ChromosomeTable::canonical(),
        genotypes: GenotypeTable::canonical(),
        columns: &["RSID", "CHROMOSOME", "POSITION", "RESULT"],
        chromosome_order: order(&[], &[Chromosome::X, Chromosome::Y]),
        nocall: NOCALL,
        haploid: HaploidStyle::Doubled,
        omitted_genotypes: INDEL_CALLS,
        header: HeaderTemplate::MyHeritage,
        line_terminator: LineTerminator::Lf,
        quoting: Quoting::All,
        extension: "csv",
        tested_ranges: ranges::builtin(VendorId::MyHeritageV1),
        keeps_unplaced_bucket: false,
    }
}

fn family_tree_dna_v3() -> VendorProfile {
    let genotypes = GenotypeTable::canonical()
        .with_mapping("-A", "A")
        .with_mapping("-C", "C")
        .with_mapping("-G", "G")
        .with_mapping("-T", "T");

    VendorProfile {
        vendor: VendorId::FamilyTreeDnaV3,
        fingerprint: r"rsid,chromosome,position,result",
        parse: ParseOptions {
            delimiter: b',',
            comment: Some(b'#'),
            has_header: true,
            layout: ColumnLayout::Paired,
        },
        chromosomes: ChromosomeTable::canonical(),
        genotypes,
        columns: &["RSID", "CHROMOSOME", "POSITION", "RESULT"],
        chromosome_order: order(
            &[Chromosome::Unplaced],
            &[Chromosome::XY, Chromosome::MT, Chromosome::X],
        ),
        nocall: NOCALL,
        haploid: HaploidStyle::HyphenPrefixed,
        omitted_genotypes: INDEL_CALLS,
        header: HeaderTemplate::None,
        line_terminator: LineTerminator::Lf,
        quoting: Quoting::Minimal,
        extension: "csv",
        tested_ranges: ranges::builtin(VendorId::FamilyTreeDnaV3),
        keeps_unplaced_bucket: true,
    }
}

fn ancestry_dna_v2() -> VendorProfile {
    let chromosomes = ChromosomeTable::canonical()
        .with_vendor_label("23", Chromosome::X)
        .with_vendor_label("24", Chromosome::Y)
        .with_vendor_label("25", Chromosome::XY)
        .with_vendor_label("26", Chromosome::MT);

    VendorProfile {
        vendor: VendorId::AncestryDnaV2,
        fingerprint: r"ancestrydna",
        parse: ParseOptions {
            delimiter: b'\t',
            comment: Some(b'#'),
            has_header: true,
            layout: ColumnLayout::SplitAlleles,
        },
        chromosomes,
        genotypes: GenotypeTable::canonical().with_mapping("00", NOCALL),
        columns: &["rsid", "chromosome", "position", "allele1", "allele2"],
        chromosome_order: order(
            &[Chromosome::Unplaced],
            &[Chromosome::X, Chromosome::Y, Chromosome::XY, Chromosome::MT],
        ),
        nocall: "00",
        haploid: HaploidStyle::Single,
        omitted_genotypes: &[],
        header: HeaderTemplate::AncestryDna,
        line_terminator: LineTerminator::CrLf,
        quoting: Quoting::Minimal,
        extension: "txt",
        tested_ranges: ranges::builtin(VendorId::AncestryDnaV2),
        keeps_unplaced_bucket: false,
    }
}

fn superkit() -> VendorProfile {
    VendorProfile {
        vendor: VendorId::SuperKit,
        fingerprint: r"# dna superkit",
        parse: ParseOptions {
            delimiter: b'\t',
            comment: Some(b'#'),
            has_header: true,
            layout: ColumnLayout::Paired,
        },
        chromosomes: ChromosomeTable::canonical(),
        genotypes: GenotypeTable::canonical(),
        columns: &["rsid", "chromosome", "position", "genotype"],
        chromosome_order: Chromosome::all(),
        nocall: NOCALL,
        haploid: HaploidStyle::Single,
        omitted_genotypes: &[],
        header: HeaderTemplate::SuperKit,
        line_terminator: LineTerminator::CrLf,
        quoting: Quoting::Minimal,
        extension: "txt",
        tested_ranges: TestedRanges::default(),
        keeps_unplaced_bucket: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_order_is_fixed() {
        let registry = ProfileRegistry::builtin();
        let order: Vec<VendorId> = registry.profiles().iter().map(|p| p.vendor).collect();
        assert_eq!(
            order,
            vec![
                VendorId::TwentyThreeAndMeV5,
                VendorId::LivingDnaV102,
                VendorId::MyHeritageV1,
                VendorId::FamilyTreeDnaV3,
                VendorId::AncestryDnaV2,
                VendorId::SuperKit,
            ]
        );
    }

    #[test]
    fn test_unknown_vendor_is_unsupported() {
        let registry = ProfileRegistry::builtin();
        let err = registry.get(VendorId::Unknown, Stage::Canonicalization).unwrap_err();
        assert!(matches!(
            err,
            SuperkitError::UnsupportedVendor {
                vendor: VendorId::Unknown,
                stage: Stage::Canonicalization
            }
        ));
    }

    #[test]
    fn test_ancestry_chromosome_table() {
        let registry = ProfileRegistry::builtin();
        let ancestry = registry.get(VendorId::AncestryDnaV2, Stage::Parsing).unwrap();

        assert_eq!(ancestry.chromosomes.to_canonical("23"), Some(Chromosome::X));
        assert_eq!(ancestry.chromosomes.to_canonical("24"), Some(Chromosome::Y));
        assert_eq!(ancestry.chromosomes.to_canonical("25"), Some(Chromosome::XY));
        assert_eq!(ancestry.chromosomes.to_canonical("26"), Some(Chromosome::MT));
        assert_eq!(ancestry.chromosomes.to_canonical("7"), Some(Chromosome::Autosome(7)));

        assert_eq!(ancestry.chromosomes.to_vendor(Chromosome::X), "23");
        assert_eq!(ancestry.chromosomes.to_vendor(Chromosome::MT), "26");
        assert_eq!(ancestry.chromosomes.to_vendor(Chromosome::Autosome(7)), "7");
    }

    #[test]
    fn test_chromosome_table_rejects_unknown_labels() {
        let table = ChromosomeTable::canonical();
        assert_eq!(table.to_canonical("23"), None);
        assert_eq!(table.to_canonical("chrM"), None);
        assert_eq!(table.to_canonical("mt"), Some(Chromosome::MT));
        assert_eq!(table.to_canonical(" X "), Some(Chromosome::X));
    }

    #[test]
    fn test_genotype_tables() {
        let registry = ProfileRegistry::builtin();
        let ancestry = registry.get(VendorId::AncestryDnaV2, Stage::Parsing).unwrap();
        assert_eq!(ancestry.genotypes.encode("00"), "--");
        assert_eq!(ancestry.genotypes.encode("CA"), "AC");
        assert_eq!(ancestry.genotypes.encode("ID"), "DI");
        assert_eq!(ancestry.genotypes.encode("GG"), "GG");

        let ftdna = registry.get(VendorId::FamilyTreeDnaV3, Stage::Parsing).unwrap();
        assert_eq!(ftdna.genotypes.encode("-G"), "G");
        assert_eq!(ftdna.genotypes.encode("TC"), "CT");
        assert_eq!(ftdna.genotypes.encode("--"), "--");

        let twenty_three = registry.get(VendorId::TwentyThreeAndMeV5, Stage::Parsing).unwrap();
        assert_eq!(twenty_three.genotypes.encode("00"), "00");
    }

    #[test]
    fn test_vendor_chromosome_coverage() {
        let registry = ProfileRegistry::builtin();
        let my_heritage = registry.get(VendorId::MyHeritageV1, Stage::Formatting).unwrap();
        assert!(my_heritage.tests_chromosome(Chromosome::Y));
        assert!(!my_heritage.tests_chromosome(Chromosome::MT));
        assert!(!my_heritage.tests_chromosome(Chromosome::XY));

        let ftdna = registry.get(VendorId::FamilyTreeDnaV3, Stage::Formatting).unwrap();
        assert!(!ftdna.tests_chromosome(Chromosome::Y));
        assert_eq!(ftdna.chromosome_rank(Chromosome::Unplaced), Some(0));
        assert!(ftdna.chromosome_rank(Chromosome::X) > ftdna.chromosome_rank(Chromosome::MT));
    }

    #[test]
    fn test_haploid_styles() {
        assert_eq!(HaploidStyle::Single.encode('A'), "A");
        assert_eq!(HaploidStyle::Doubled.encode('C'), "CC");
        assert_eq!(HaploidStyle::HyphenPrefixed.encode('T'), "-T");
    }
}
