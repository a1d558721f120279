// ==============================================================================
// models.rs - Canonical Genotype Data Models
// ==============================================================================
// Description: Vendor identifiers, canonical chromosomes, records, kits and
//              the merged SuperKit
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// DNA testing vendor (and export version) a file originates from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum VendorId {
    #[serde(rename = "23andme-v5")]
    TwentyThreeAndMeV5,
    #[serde(rename = "ancestrydna-v2")]
    AncestryDnaV2,
    #[serde(rename = "familytreedna-v3")]
    FamilyTreeDnaV3,
    #[serde(rename = "livingdna-v1.0.2")]
    LivingDnaV102,
    #[serde(rename = "myheritage-v1")]
    MyHeritageV1,
    /// Neutral pass-through format written by this tool
    #[serde(rename = "superkit")]
    SuperKit,
    /// File could not be attributed to any vendor
    #[serde(rename = "unknown")]
    Unknown,
}

impl VendorId {
    /// Every known vendor, in declaration order (Unknown excluded)
    pub const KNOWN: [VendorId; 6] = [
        VendorId::TwentyThreeAndMeV5,
        VendorId::AncestryDnaV2,
        VendorId::FamilyTreeDnaV3,
        VendorId::LivingDnaV102,
        VendorId::MyHeritageV1,
        VendorId::SuperKit,
    ];

    /// Human-readable vendor name as used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            VendorId::TwentyThreeAndMeV5 => "23andMe v5",
            VendorId::AncestryDnaV2 => "AncestryDNA v2",
            VendorId::FamilyTreeDnaV3 => "FamilyTreeDNA v3",
            VendorId::LivingDnaV102 => "LivingDNA v1.0.2",
            VendorId::MyHeritageV1 => "MyHeritage v1",
            VendorId::SuperKit => "SuperKit",
            VendorId::Unknown => "unknown",
        }
    }

    /// File-name safe identifier (also the reference table file stem)
    pub fn slug(&self) -> &'static str {
        match self {
            VendorId::TwentyThreeAndMeV5 => "23andme-v5",
            VendorId::AncestryDnaV2 => "ancestrydna-v2",
            VendorId::FamilyTreeDnaV3 => "familytreedna-v3",
            VendorId::LivingDnaV102 => "livingdna-v1.0.2",
            VendorId::MyHeritageV1 => "myheritage-v1",
            VendorId::SuperKit => "superkit",
            VendorId::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for VendorId {
    type Err = String;

    /// Accepts either the slug ("ancestrydna-v2") or the display name
    /// ("AncestryDNA v2"), case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        VendorId::KNOWN
            .iter()
            .copied()
            .find(|v| v.slug() == wanted || v.display_name().to_lowercase() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = VendorId::KNOWN.iter().map(|v| v.slug()).collect();
                format!("unknown vendor '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Canonical chromosome
///
/// Declaration order is the canonical sort order:
/// `0 < 1 < ... < 22 < X < Y < XY < MT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chromosome {
    /// Chromosome "0": unplaced markers and bad reads
    Unplaced,
    /// Autosomes 1-22
    Autosome(u8),
    X,
    Y,
    /// Pseudoautosomal region
    XY,
    /// Mitochondrial DNA
    MT,
}

impl Chromosome {
    /// All canonical chromosomes in canonical order
    pub fn all() -> Vec<Chromosome> {
        let mut all = Vec::with_capacity(27);
        all.push(Chromosome::Unplaced);
        all.extend((1..=22).map(Chromosome::Autosome));
        all.extend([Chromosome::X, Chromosome::Y, Chromosome::XY, Chromosome::MT]);
        all
    }

    /// Parse a canonical label ("0", "1".."22", "X", "Y", "XY", "MT")
    pub fn from_label(label: &str) -> Option<Chromosome> {
        match label {
            "0" => Some(Chromosome::Unplaced),
            "X" => Some(Chromosome::X),
            "Y" => Some(Chromosome::Y),
            "XY" => Some(Chromosome::XY),
            "MT" => Some(Chromosome::MT),
            other => match other.parse::<u8>() {
                Ok(n) if (1..=22).contains(&n) => Some(Chromosome::Autosome(n)),
                _ => None,
            },
        }
    }

    /// Haploid in males (X, Y and mitochondrial DNA)
    pub fn is_male_haploid(&self) -> bool {
        matches!(self, Chromosome::X | Chromosome::Y | Chromosome::MT)
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chromosome::Unplaced => f.write_str("0"),
            Chromosome::Autosome(n) => write!(f, "{}", n),
            Chromosome::X => f.write_str("X"),
            Chromosome::Y => f.write_str("Y"),
            Chromosome::XY => f.write_str("XY"),
            Chromosome::MT => f.write_str("MT"),
        }
    }
}

/// Sex inferred from X chromosome heterozygosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    /// Kit has no X chromosome records to infer from
    Unknown,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Unknown => "Unknown",
        }
    }
}

/// One genotype call from a single kit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeRecord {
    /// Marker identifier (rsID or vendor internal id)
    pub rsid: String,
    pub chromosome: Chromosome,
    /// 1-based position (GRCh37); 0 means unplaced
    pub position: u64,
    /// "--" for no-call, otherwise 1-2 alleles over {A,C,G,T,D,I}
    pub genotype: String,
    pub source: VendorId,
}

/// Canonicalized records of one input file
///
/// Built once by the canonicalizer and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Kit {
    vendor: VendorId,
    sex: Sex,
    records: Vec<GenotypeRecord>,
    /// Chromosome-0 rows set aside for vendors that keep them as a bucket
    unplaced: Vec<GenotypeRecord>,
    source_path: Option<PathBuf>,
    sha256: Option<String>,
}

impl Kit {
    pub fn new(
        vendor: VendorId,
        sex: Sex,
        records: Vec<GenotypeRecord>,
        unplaced: Vec<GenotypeRecord>,
    ) -> Self {
        Self {
            vendor,
            sex,
            records,
            unplaced,
            source_path: None,
            sha256: None,
        }
    }

    pub fn with_source(mut self, path: impl AsRef<Path>, sha256: Option<String>) -> Self {
        self.source_path = Some(path.as_ref().to_path_buf());
        self.sha256 = sha256;
        self
    }

    pub fn vendor(&self) -> VendorId {
        self.vendor
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    pub fn records(&self) -> &[GenotypeRecord] {
        &self.records
    }

    pub fn unplaced(&self) -> &[GenotypeRecord] {
        &self.unplaced
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn sha256(&self) -> Option<&str> {
        self.sha256.as_deref()
    }
}

/// Merged record, vendor provenance already discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperkitRecord {
    pub rsid: String,
    pub chromosome: Chromosome,
    pub position: u64,
    pub genotype: String,
}

impl From<&GenotypeRecord> for SuperkitRecord {
    fn from(record: &GenotypeRecord) -> Self {
        Self {
            rsid: record.rsid.clone(),
            chromosome: record.chromosome,
            position: record.position,
            genotype: record.genotype.clone(),
        }
    }
}

/// Counters describing how conflicts were resolved during merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub input_records: usize,
    pub positions: usize,
    /// Positions reported by more than one kit
    pub overlapping_positions: usize,
    pub nocalls_suppressed: usize,
    pub majority_resolved: usize,
    pub priority_resolved: usize,
}

/// Deduplicated merge of all kits
///
/// At most one record per (chromosome, position).
#[derive(Debug, Clone, Default)]
pub struct Superkit {
    pub records: Vec<SuperkitRecord>,
    /// Chromosome-0 bucket, reattached verbatim for targets that keep it
    pub unplaced: Vec<SuperkitRecord>,
    /// Records surviving into the SuperKit per source vendor
    pub vendor_counts: BTreeMap<VendorId, usize>,
    pub stats: MergeStats,
}

/// Total order over vendors used for sorting and tie-breaking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorPriorityList {
    order: Vec<VendorId>,
}

impl Default for VendorPriorityList {
    fn default() -> Self {
        Self {
            order: vec![
                VendorId::TwentyThreeAndMeV5,
                VendorId::AncestryDnaV2,
                VendorId::FamilyTreeDnaV3,
                VendorId::LivingDnaV102,
                VendorId::MyHeritageV1,
                VendorId::SuperKit,
            ],
        }
    }
}

impl VendorPriorityList {
    /// Build from an explicit order; duplicates keep their first position
    ///
    /// Known vendors missing from `order` follow the listed ones in their
    /// default order, so every vendor gets a distinct rank.
    pub fn new(order: Vec<VendorId>) -> Self {
        let defaults = Self::default().order;
        let mut deduped: Vec<VendorId> = Vec::with_capacity(defaults.len());
        for vendor in order.into_iter().chain(defaults) {
            if !deduped.contains(&vendor) {
                deduped.push(vendor);
            }
        }
        Self { order: deduped }
    }

    /// Rank of a vendor (lower wins); `Unknown` ranks after every vendor
    pub fn rank(&self, vendor: VendorId) -> usize {
        self.order
            .iter()
            .position(|v| *v == vendor)
            .unwrap_or(self.order.len())
    }

    pub fn vendors(&self) -> &[VendorId] {
        &self.order
    }
}
