// ==============================================================================
// profiles/ranges.rs - Tested Coordinate Ranges
// ==============================================================================
// Description: First/last assayed GRCh37 positions per chromosome for each
//              vendor chip, used by the trim step
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use std::collections::BTreeMap;

use crate::models::{Chromosome, VendorId};

/// Tested (start, end) position ranges per chromosome, both ends inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestedRanges {
    ranges: BTreeMap<Chromosome, Vec<(u64, u64)>>,
}

impl TestedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chromosome: Chromosome, start: u64, end: u64) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.ranges.entry(chromosome).or_default().push((start, end));
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, chromosome: Chromosome) -> Option<&[(u64, u64)]> {
        self.ranges.get(&chromosome).map(Vec::as_slice)
    }

    /// Whether a position lies inside a tested range
    ///
    /// Chromosome 0 is never trimmed, and chromosomes without any recorded
    /// range are kept as-is.
    pub fn contains(&self, chromosome: Chromosome, position: u64) -> bool {
        if chromosome == Chromosome::Unplaced {
            return true;
        }
        match self.ranges.get(&chromosome) {
            Some(ranges) => ranges
                .iter()
                .any(|(start, end)| (*start..=*end).contains(&position)),
            None => true,
        }
    }

    fn from_table(table: &[(&str, u64, u64)]) -> Self {
        let mut ranges = Self::new();
        for (label, start, end) in table {
            if let Some(chromosome) = Chromosome::from_label(label) {
                ranges.insert(chromosome, *start, *end);
            }
        }
        ranges
    }
}

/// Built-in ranges for a vendor; empty for SuperKit and Unknown
pub fn builtin(vendor: VendorId) -> TestedRanges {
    match vendor {
        VendorId::TwentyThreeAndMeV5 => TestedRanges::from_table(TWENTY_THREE_AND_ME_V5),
        VendorId::AncestryDnaV2 => TestedRanges::from_table(ANCESTRY_DNA_V2),
        VendorId::FamilyTreeDnaV3 => TestedRanges::from_table(FAMILY_TREE_DNA_V3),
        VendorId::LivingDnaV102 => TestedRanges::from_table(LIVING_DNA_V102),
        VendorId::MyHeritageV1 => TestedRanges::from_table(MY_HERITAGE_V1),
        VendorId::SuperKit | VendorId::Unknown => TestedRanges::new(),
    }
}

const TWENTY_THREE_AND_ME_V5: &[(&str, u64, u64)] = &[
    ("1", 69869, 249218992),
    ("2", 10587, 243152051),
    ("3", 60495, 197840429),
    ("4", 69404, 190915650),
    ("5", 12041, 180698131),
    ("6", 156911, 171053055),
    ("7", 43376, 159128574),
    ("8", 159974, 146304022),
    ("9", 46587, 141066491),
    ("10", 93313, 135524373),
    ("11", 167401, 134946453),
    ("12", 70277, 133777645),
    ("13", 19020145, 115106996),
    ("14", 20213260, 107285437),
    ("15", 20071673, 102461162),
    ("16", 60778, 90163275),
    ("17", 6689, 81048754),
    ("18", 11543, 78015057),
    ("19", 90974, 59095126),
    ("20", 61795, 62912463),
    ("21", 9411410, 48100155),
    ("22", 16050822, 51229805),
    ("X", 2700157, 154929412),
    ("Y", 2655180, 28799654),
    ("MT", 3, 16569),
];

const ANCESTRY_DNA_V2: &[(&str, u64, u64)] = &[
    ("1", 82154, 249212878),
    ("2", 18506, 243043927),
    ("3", 66894, 197840429),
    ("4", 71566, 190904061),
    ("5", 12041, 180696988),
    ("6", 203878, 170913051),
    ("7", 43376, 159128574),
    ("8", 164984, 146293414),
    ("9", 118449, 141018648),
    ("10", 100155, 135475469),
    ("11", 193121, 134945128),
    ("12", 144935, 133817224),
    ("13", 19058717, 115103529),
    ("14", 20359364, 107285437),
    ("15", 20161372, 102421736),
    ("16", 85453, 90158005),
    ("17", 6689, 81041938),
    ("18", 38709, 78015057),
    ("19", 260912, 59093239),
    ("20", 61795, 62965520),
    ("21", 9411410, 48097610),
    ("22", 16287253, 51211392),
    ("X", 2699968, 154913546),
    ("Y", 2655180, 28773201),
    ("XY", 60001, 2699520),
    ("XY", 154931044, 155260560),
    ("MT", 73, 16519),
];

const FAMILY_TREE_DNA_V3: &[(&str, u64, u64)] = &[
    ("1", 82154, 249218992),
    ("2", 18506, 243152051),
    ("3", 60495, 197840429),
    ("4", 71566, 190915650),
    ("5", 12041, 180698131),
    ("6", 156911, 171053055),
    ("7", 43376, 159128574),
    ("8", 159974, 146304022),
    ("9", 46587, 141066491),
    ("10", 93313, 135524373),
    ("11", 167401, 134946453),
    ("12", 70277, 133777645),
    ("13", 19020145, 115106996),
    ("14", 20213260, 107285437),
    ("15", 20071673, 102461162),
    ("16", 60778, 90163275),
    ("17", 6689, 81048754),
    ("18", 11543, 78015057),
    ("19", 90974, 59095126),
    ("20", 61795, 62912463),
    ("21", 9411410, 48100155),
    ("22", 16050822, 51229805),
    ("X", 2700157, 154929412),
    ("XY", 153977, 2697868),
    ("XY", 8503715, 155234707),
    ("MT", 3, 16569),
];

const LIVING_DNA_V102: &[(&str, u64, u64)] = &[
    ("1", 752566, 249210707),
    ("2", 19370, 243152051),
    ("3", 66894, 197840429),
    ("4", 69404, 190904061),
    ("5", 92235, 180698131),
    ("6", 203878, 170913051),
    ("7", 43376, 159128574),
    ("8", 164984, 146293414),
    ("9", 118449, 141066491),
    ("10", 100155, 135524373),
    ("11", 193121, 134946453),
    ("12", 144935, 133777645),
    ("13", 19058717, 115106996),
    ("14", 20359364, 107285437),
    ("15", 20161372, 102461162),
    ("16", 85453, 90163275),
    ("17", 6689, 81048754),
    ("18", 38709, 78015057),
    ("19", 260912, 59095126),
    ("20", 61795, 62912463),
    ("21", 9411410, 48100155),
    ("22", 16287253, 51229805),
    ("X", 2700157, 154913546),
];

const MY_HERITAGE_V1: &[(&str, u64, u64)] = &[
    ("1", 82154, 249218992),
    ("2", 18506, 243152051),
    ("3", 60495, 197840429),
    ("4", 71566, 190915650),
    ("5", 12041, 180698131),
    ("6", 156911, 171053055),
    ("7", 43376, 159128574),
    ("8", 159974, 146304022),
    ("9", 46587, 141066491),
    ("10", 93313, 135524373),
    ("11", 167401, 134946453),
    ("12", 70277, 133777645),
    ("13", 19020145, 115106996),
    ("14", 20213260, 107285437),
    ("15", 20071673, 102461162),
    ("16", 60778, 90163275),
    ("17", 6689, 81048754),
    ("18", 11543, 78015057),
    ("19", 90974, 59095126),
    ("20", 61795, 62912463),
    ("21", 9411410, 48100155),
    ("22", 16050822, 51229805),
    ("X", 2699968, 154929412),
    ("Y", 2655180, 28799654),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_inclusive_bounds() {
        let ranges = builtin(VendorId::TwentyThreeAndMeV5);
        let chr1 = Chromosome::Autosome(1);
        assert!(ranges.contains(chr1, 69869));
        assert!(ranges.contains(chr1, 249218992));
        assert!(!ranges.contains(chr1, 69868));
        assert!(!ranges.contains(chr1, 249218993));
    }

    #[test]
    fn test_multiple_ranges_per_chromosome() {
        let ranges = builtin(VendorId::FamilyTreeDnaV3);
        assert!(ranges.contains(Chromosome::XY, 200000));
        assert!(ranges.contains(Chromosome::XY, 9000000));
        assert!(!ranges.contains(Chromosome::XY, 5000000));
        assert_eq!(ranges.get(Chromosome::XY).map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_unplaced_and_missing_chromosomes_are_kept() {
        let ranges = builtin(VendorId::LivingDnaV102);
        assert!(ranges.contains(Chromosome::Unplaced, 0));
        assert!(ranges.contains(Chromosome::MT, 12));
        assert!(builtin(VendorId::SuperKit).is_empty());
    }

    #[test]
    fn test_insert_normalizes_order() {
        let mut ranges = TestedRanges::new();
        ranges.insert(Chromosome::Autosome(3), 500, 100);
        assert_eq!(ranges.get(Chromosome::Autosome(3)), Some(&[(100, 500)][..]));
    }
}
