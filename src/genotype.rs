// ==============================================================================
// genotype.rs - Genotype String Helpers
// ==============================================================================
// Description: Classification and reshaping of canonical genotype strings
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Canonical alphabet:
//   - "--"            no-call
//   - "AG", "CT", ... diploid call, alleles in alphabetical order
//   - "A", "D", ...   haploid call (male X/Y/MT)
//   - "DD", "DI", "I" insertion/deletion calls
// ==============================================================================

/// Canonical no-call sentinel
pub const NOCALL: &str = "--";

/// Alleles a canonical call may be built from
pub const ALLELES: [char; 6] = ['A', 'C', 'G', 'T', 'D', 'I'];

pub fn is_nocall(genotype: &str) -> bool {
    genotype == NOCALL
}

fn is_allele(c: char) -> bool {
    ALLELES.contains(&c)
}

/// Two distinct alleles (e.g. "AG", "DI")
///
/// # Examples
/// ```
/// use dna_superkit::genotype::is_heterozygous;
///
/// assert!(is_heterozygous("AG"));
/// assert!(!is_heterozygous("AA"));
/// assert!(!is_heterozygous("--"));
/// assert!(!is_heterozygous("A"));
/// ```
pub fn is_heterozygous(genotype: &str) -> bool {
    let mut chars = genotype.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) => a != b && is_allele(a) && is_allele(b),
        _ => false,
    }
}

/// Call involving an insertion or deletion allele
pub fn is_indel(genotype: &str) -> bool {
    genotype.chars().any(|c| c == 'D' || c == 'I')
}

/// Reorder a two-allele call alphabetically ("CA" -> "AC", "ID" -> "DI")
pub fn canonical_order(genotype: &str) -> String {
    let mut chars: Vec<char> = genotype.chars().collect();
    if chars.len() == 2 && chars.iter().all(|c| is_allele(*c)) {
        chars.sort_unstable();
    }
    chars.into_iter().collect()
}

/// Collapse a call on a male haploid chromosome
///
/// Homozygous calls become one letter ("GG" -> "G"); heterozygous calls are
/// measurement errors and become no-calls. Anything else is left alone.
pub fn collapse_haploid(genotype: &str) -> String {
    let mut chars = genotype.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), None) if is_allele(a) && is_allele(b) => {
            if a == b {
                a.to_string()
            } else {
                NOCALL.to_string()
            }
        }
        _ => genotype.to_string(),
    }
}

/// Split a call into two allele columns
///
/// First and last character, so haploid calls repeat ("A" -> ("A", "A")).
pub fn split_alleles(genotype: &str) -> (String, String) {
    let first = genotype.chars().next().map(String::from).unwrap_or_default();
    let last = genotype.chars().last().map(String::from).unwrap_or_default();
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nocall() {
        assert!(is_nocall("--"));
        assert!(!is_nocall("00"));
        assert!(!is_nocall("AA"));
    }

    #[test]
    fn test_heterozygous() {
        for het in ["AC", "AG", "AT", "CG", "CT", "GT", "DI"] {
            assert!(is_heterozygous(het), "{} should be heterozygous", het);
        }
        for hom in ["AA", "CC", "GG", "TT", "DD", "II", "--", "A", "", "AGT", "-A"] {
            assert!(!is_heterozygous(hom), "{} should not be heterozygous", hom);
        }
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(canonical_order("CA"), "AC");
        assert_eq!(canonical_order("TG"), "GT");
        assert_eq!(canonical_order("ID"), "DI");
        assert_eq!(canonical_order("AG"), "AG");
        assert_eq!(canonical_order("--"), "--");
        assert_eq!(canonical_order("-A"), "-A");
        assert_eq!(canonical_order("A"), "A");
    }

    #[test]
    fn test_collapse_haploid() {
        assert_eq!(collapse_haploid("GG"), "G");
        assert_eq!(collapse_haploid("DD"), "D");
        assert_eq!(collapse_haploid("II"), "I");
        assert_eq!(collapse_haploid("AG"), "--");
        assert_eq!(collapse_haploid("DI"), "--");
        assert_eq!(collapse_haploid("--"), "--");
        assert_eq!(collapse_haploid("A"), "A");
    }

    #[test]
    fn test_split_alleles() {
        assert_eq!(split_alleles("AG"), ("A".to_string(), "G".to_string()));
        assert_eq!(split_alleles("T"), ("T".to_string(), "T".to_string()));
        assert_eq!(split_alleles("00"), ("0".to_string(), "0".to_string()));
    }

    #[test]
    fn test_indel() {
        assert!(is_indel("DI"));
        assert!(is_indel("D"));
        assert!(!is_indel("AG"));
        assert!(!is_indel("--"));
    }
}
