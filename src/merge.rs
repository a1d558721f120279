// ==============================================================================
// merge.rs - Kit Merge and Conflict Resolution
// ==============================================================================
// Description: Combines canonical Kits into one deduplicated SuperKit using
//              nocall suppression, optional majority vote and vendor priority
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::error::{Result, SuperkitError};
use crate::genotype;
use crate::models::{
    GenotypeRecord, Kit, MergeStats, Superkit, SuperkitRecord, VendorId, VendorPriorityList,
};

/// Conflict resolution settings
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Resolve a position by its modal genotype when it covers at least half the calls
    pub majority_vote: bool,
    pub priority: VendorPriorityList,
}

/// Merges canonical kits into a SuperKit
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: MergeOptions,
}

/// How a (chromosome, position) group was reduced to one record
enum Resolution {
    Agreed,
    Majority,
    Priority,
}

impl MergeEngine {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge all kits
    ///
    /// The result does not depend on the order of `kits`: records are sorted
    /// by (chromosome, position, vendor priority) with genotype and rsid as
    /// final tie-breakers before any group is resolved.
    ///
    /// # Returns
    /// * `Ok(Superkit)` - at most one record per (chromosome, position)
    /// * `Err(SuperkitError::EmptyInput)` - no kits were given
    pub fn merge(&self, kits: &[Kit]) -> Result<Superkit> {
        if kits.is_empty() {
            return Err(SuperkitError::EmptyInput);
        }

        let priority = &self.options.priority;

        // 1. Concatenate, keeping provenance
        let mut rows: Vec<&GenotypeRecord> = kits.iter().flat_map(|k| k.records()).collect();

        // 2. Canonical sort
        rows.sort_by(|a, b| {
            (a.chromosome, a.position, priority.rank(a.source), &a.genotype, &a.rsid).cmp(&(
                b.chromosome,
                b.position,
                priority.rank(b.source),
                &b.genotype,
                &b.rsid,
            ))
        });

        let mut stats = MergeStats {
            input_records: rows.len(),
            ..MergeStats::default()
        };
        let mut vendor_counts: BTreeMap<VendorId, usize> =
            kits.iter().map(|k| (k.vendor(), 0)).collect();
        let mut records = Vec::new();

        // 3-5. Resolve each (chromosome, position) group
        let mut start = 0;
        while start < rows.len() {
            let key = (rows[start].chromosome, rows[start].position);
            let mut end = start + 1;
            while end < rows.len() && (rows[end].chromosome, rows[end].position) == key {
                end += 1;
            }

            let group = &rows[start..end];
            stats.positions += 1;
            if group.len() > 1 {
                stats.overlapping_positions += 1;
            }

            let (winner, resolution) = self.resolve(group, &mut stats);
            match resolution {
                Resolution::Agreed => {}
                Resolution::Majority => stats.majority_resolved += 1,
                Resolution::Priority => stats.priority_resolved += 1,
            }

            *vendor_counts.entry(winner.source).or_insert(0) += 1;
            records.push(SuperkitRecord::from(winner));
            start = end;
        }

        let unplaced = self.merge_unplaced(kits);

        info!(
            "Merged {} kits: {} records -> {} positions ({} overlapping, {} nocalls suppressed, \
             {} by majority, {} by priority)",
            kits.len(),
            stats.input_records,
            stats.positions,
            stats.overlapping_positions,
            stats.nocalls_suppressed,
            stats.majority_resolved,
            stats.priority_resolved
        );

        Ok(Superkit {
            records,
            unplaced,
            vendor_counts,
            stats,
        })
    }

    /// Reduce one sorted group to a single record
    fn resolve<'r>(
        &self,
        group: &[&'r GenotypeRecord],
        stats: &mut MergeStats,
    ) -> (&'r GenotypeRecord, Resolution) {
        let distinct: HashSet<&str> = group.iter().map(|r| r.genotype.as_str()).collect();

        // Nocall suppression
        let mut candidates: Vec<&'r GenotypeRecord> = group.to_vec();
        let has_call = group.iter().any(|r| !genotype::is_nocall(&r.genotype));
        if distinct.len() > 1 && has_call {
            let before = candidates.len();
            candidates.retain(|r| !genotype::is_nocall(&r.genotype));
            stats.nocalls_suppressed += before - candidates.len();
        }

        let conflicting = candidates
            .iter()
            .any(|r| r.genotype != candidates[0].genotype);
        if !conflicting {
            return (candidates[0], Resolution::Agreed);
        }

        // Majority vote
        if self.options.majority_vote {
            if let Some(winner) = majority(&candidates) {
                debug!(
                    "Majority genotype {} at {}:{}",
                    winner.genotype, winner.chromosome, winner.position
                );
                return (winner, Resolution::Majority);
            }
        }

        // Priority fallback
        (candidates[0], Resolution::Priority)
    }

    /// Chromosome-0 buckets in vendor priority order, one row per rsid
    fn merge_unplaced(&self, kits: &[Kit]) -> Vec<SuperkitRecord> {
        let priority = &self.options.priority;

        let mut rows: Vec<&GenotypeRecord> = kits.iter().flat_map(|k| k.unplaced()).collect();
        rows.sort_by(|a, b| {
            (priority.rank(a.source), a.position, &a.rsid, &a.genotype).cmp(&(
                priority.rank(b.source),
                b.position,
                &b.rsid,
                &b.genotype,
            ))
        });

        let mut seen: HashSet<String> = HashSet::new();
        rows.into_iter()
            .filter(|r| seen.insert(r.rsid.clone()))
            .map(SuperkitRecord::from)
            .collect()
    }
}

/// First occurrence of the modal genotype if it covers at least half the group
///
/// Equal counts go to the genotype seen first.
fn majority<'r>(candidates: &[&'r GenotypeRecord]) -> Option<&'r GenotypeRecord> {
    let mut counts: Vec<(&str, usize, &'r GenotypeRecord)> = Vec::new();
    for record in candidates {
        match counts.iter_mut().find(|(g, _, _)| *g == record.genotype) {
            Some(entry) => entry.1 += 1,
            None => counts.push((record.genotype.as_str(), 1, *record)),
        }
    }

    let mut best: Option<(usize, &'r GenotypeRecord)> = None;
    for (_, count, first) in &counts {
        if best.map_or(true, |(best_count, _)| *count > best_count) {
            best = Some((*count, *first));
        }
    }

    best.filter(|(count, _)| count * 2 >= candidates.len())
        .map(|(_, record)| record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chromosome, Sex};

    fn record(
        vendor: VendorId,
        chromosome: Chromosome,
        position: u64,
        genotype: &str,
    ) -> GenotypeRecord {
        GenotypeRecord {
            rsid: format!("rs{}", position),
            chromosome,
            position,
            genotype: genotype.to_string(),
            source: vendor,
        }
    }

    fn kit(vendor: VendorId, calls: &[(Chromosome, u64, &str)]) -> Kit {
        let records = calls
            .iter()
            .map(|(c, p, g)| record(vendor, *c, *p, g))
            .collect();
        Kit::new(vendor, Sex::Female, records, Vec::new())
    }

    fn chr1(position: u64, genotype: &str) -> (Chromosome, u64, &str) {
        (Chromosome::Autosome(1), position, genotype)
    }

    fn engine(majority_vote: bool) -> MergeEngine {
        MergeEngine::new(MergeOptions {
            majority_vote,
            priority: VendorPriorityList::default(),
        })
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(engine(false).merge(&[]), Err(SuperkitError::EmptyInput)));
    }

    #[test]
    fn test_nocall_suppression() {
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[chr1(100, "--")]),
            kit(VendorId::MyHeritageV1, &[chr1(100, "AG")]),
        ];
        let superkit = engine(false).merge(&kits).unwrap();

        assert_eq!(superkit.records.len(), 1);
        assert_eq!(superkit.records[0].genotype, "AG");
        assert_eq!(superkit.stats.nocalls_suppressed, 1);
        assert_eq!(superkit.vendor_counts[&VendorId::MyHeritageV1], 1);
        assert_eq!(superkit.vendor_counts[&VendorId::TwentyThreeAndMeV5], 0);
    }

    #[test]
    fn test_all_nocalls_kept_once() {
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[chr1(100, "--")]),
            kit(VendorId::AncestryDnaV2, &[chr1(100, "--")]),
        ];
        let superkit = engine(false).merge(&kits).unwrap();
        assert_eq!(superkit.records.len(), 1);
        assert_eq!(superkit.records[0].genotype, "--");
        assert_eq!(superkit.stats.nocalls_suppressed, 0);
    }

    #[test]
    fn test_majority_vote() {
        // Highest priority vendor disagrees with the other two
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[chr1(100, "AC")]),
            kit(VendorId::AncestryDnaV2, &[chr1(100, "AG")]),
            kit(VendorId::MyHeritageV1, &[chr1(100, "AG")]),
        ];

        let superkit = engine(true).merge(&kits).unwrap();
        assert_eq!(superkit.records.len(), 1);
        assert_eq!(superkit.records[0].genotype, "AG");
        assert_eq!(superkit.vendor_counts[&VendorId::AncestryDnaV2], 1);
        assert_eq!(superkit.stats.majority_resolved, 1);

        // Without the vote, priority decides
        let superkit = engine(false).merge(&kits).unwrap();
        assert_eq!(superkit.records[0].genotype, "AC");
        assert_eq!(superkit.stats.priority_resolved, 1);
    }

    #[test]
    fn test_majority_without_modal_falls_back_to_priority() {
        let kits = vec![
            kit(VendorId::MyHeritageV1, &[chr1(100, "TT")]),
            kit(VendorId::FamilyTreeDnaV3, &[chr1(100, "AC")]),
            kit(VendorId::AncestryDnaV2, &[chr1(100, "AG")]),
        ];
        let superkit = engine(true).merge(&kits).unwrap();
        assert_eq!(superkit.records[0].genotype, "AG");
        assert_eq!(superkit.stats.priority_resolved, 1);
        assert_eq!(superkit.stats.majority_resolved, 0);
    }

    #[test]
    fn test_dedup_and_order() {
        let kits = vec![
            kit(
                VendorId::MyHeritageV1,
                &[
                    (Chromosome::X, 50, "AA"),
                    chr1(300, "CC"),
                    (Chromosome::Autosome(2), 10, "GG"),
                ],
            ),
            kit(
                VendorId::TwentyThreeAndMeV5,
                &[chr1(300, "CC"), chr1(200, "TT"), (Chromosome::MT, 7, "A")],
            ),
        ];
        let superkit = engine(false).merge(&kits).unwrap();

        let keys: Vec<(Chromosome, u64)> = superkit
            .records
            .iter()
            .map(|r| (r.chromosome, r.position))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Chromosome::Autosome(1), 200),
                (Chromosome::Autosome(1), 300),
                (Chromosome::Autosome(2), 10),
                (Chromosome::X, 50),
                (Chromosome::MT, 7),
            ]
        );
        assert_eq!(superkit.stats.input_records, 6);
        assert_eq!(superkit.stats.overlapping_positions, 1);
        assert_eq!(superkit.stats.priority_resolved, 0);
        assert_eq!(superkit.vendor_counts[&VendorId::TwentyThreeAndMeV5], 3);
        assert_eq!(superkit.vendor_counts[&VendorId::MyHeritageV1], 2);
    }

    #[test]
    fn test_kit_order_does_not_matter() {
        let a = kit(VendorId::LivingDnaV102, &[chr1(5, "CT"), chr1(6, "--")]);
        let b = kit(VendorId::FamilyTreeDnaV3, &[chr1(5, "CC"), chr1(6, "GG")]);
        let c = kit(VendorId::FamilyTreeDnaV3, &[chr1(5, "TT")]);

        let forward = engine(true).merge(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = engine(true).merge(&[c, b, a]).unwrap();
        assert_eq!(forward.records, backward.records);
        assert_eq!(forward.vendor_counts, backward.vendor_counts);
    }

    #[test]
    fn test_custom_priority() {
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[chr1(1, "AA")]),
            kit(VendorId::LivingDnaV102, &[chr1(1, "GG")]),
        ];
        let engine = MergeEngine::new(MergeOptions {
            majority_vote: false,
            priority: VendorPriorityList::new(vec![VendorId::LivingDnaV102]),
        });
        assert_eq!(engine.merge(&kits).unwrap().records[0].genotype, "GG");
    }

    #[test]
    fn test_partial_priority_ranks_unlisted_vendors() {
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[chr1(5, "TT")]),
            kit(VendorId::MyHeritageV1, &[chr1(5, "AA")]),
        ];
        let engine = MergeEngine::new(MergeOptions {
            majority_vote: false,
            priority: VendorPriorityList::new(vec![VendorId::LivingDnaV102]),
        });

        let superkit = engine.merge(&kits).unwrap();
        assert_eq!(superkit.records[0].genotype, "TT");
        assert_eq!(superkit.vendor_counts[&VendorId::TwentyThreeAndMeV5], 1);
        assert_eq!(superkit.vendor_counts[&VendorId::MyHeritageV1], 0);
        assert_eq!(superkit.stats.priority_resolved, 1);
    }

    #[test]
    fn test_unplaced_buckets_merge_by_priority() {
        let bucket = |vendor: VendorId, rsid: &str, genotype: &str| GenotypeRecord {
            rsid: rsid.to_string(),
            chromosome: Chromosome::Unplaced,
            position: 0,
            genotype: genotype.to_string(),
            source: vendor,
        };
        let superkit_kit = Kit::new(
            VendorId::SuperKit,
            Sex::Unknown,
            vec![record(VendorId::SuperKit, Chromosome::Autosome(1), 1, "AA")],
            vec![bucket(VendorId::SuperKit, "rs1", "CC"), bucket(VendorId::SuperKit, "rs3", "TT")],
        );
        let ftdna = Kit::new(
            VendorId::FamilyTreeDnaV3,
            Sex::Unknown,
            Vec::new(),
            vec![
                bucket(VendorId::FamilyTreeDnaV3, "rs1", "AA"),
                bucket(VendorId::FamilyTreeDnaV3, "rs2", "GG"),
            ],
        );

        let superkit = engine(false).merge(&[superkit_kit, ftdna]).unwrap();
        let bucket: Vec<(&str, &str)> = superkit
            .unplaced
            .iter()
            .map(|r| (r.rsid.as_str(), r.genotype.as_str()))
            .collect();
        assert_eq!(bucket, vec![("rs1", "AA"), ("rs2", "GG"), ("rs3", "TT")]);
    }

    #[test]
    fn test_chr7_nocall_versus_call() {
        let kits = vec![
            kit(VendorId::TwentyThreeAndMeV5, &[(Chromosome::Autosome(7), 1000, "--")]),
            kit(VendorId::AncestryDnaV2, &[(Chromosome::Autosome(7), 1000, "AC")]),
        ];
        for vote in [false, true] {
            let superkit = engine(vote).merge(&kits).unwrap();
            assert_eq!(superkit.records.len(), 1);
            assert_eq!(superkit.records[0].chromosome, Chromosome::Autosome(7));
            assert_eq!(superkit.records[0].position, 1000);
            assert_eq!(superkit.records[0].genotype, "AC");
        }
    }
}
