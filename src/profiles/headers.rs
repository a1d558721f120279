// ==============================================================================
// profiles/headers.rs - Synthetic Vendor File Headers
// ==============================================================================
// Description: Comment blocks matching each vendor's real download header,
//              with the timestamp and session identifiers regenerated
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Comment line counts (excluding the column header line):
//   23andMe v5 = 19, AncestryDNA v2 = 18, LivingDNA v1.0.2 = 11,
//   MyHeritage v1 = 6, FamilyTreeDNA v3 = 0
// ==============================================================================

use chrono::{DateTime, Utc};
use rand::Rng;

/// Which vendor header block to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTemplate {
    TwentyThreeAndMe,
    AncestryDna,
    LivingDna,
    MyHeritage,
    SuperKit,
    /// Vendor files start directly with the column header line
    None,
}

/// Dynamic header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderContext {
    pub generated_at: DateTime<Utc>,
    /// Download session / kit identifier (UUID, hyphen-less)
    pub session_id: String,
    /// 16 hex digit profile identifier used in 23andMe download links
    pub profile_id: String,
}

impl Default for HeaderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderContext {
    /// Current time with freshly generated identifiers
    pub fn new() -> Self {
        let profile: u64 = rand::thread_rng().gen();
        Self {
            generated_at: Utc::now(),
            session_id: uuid::Uuid::new_v4().simple().to_string(),
            profile_id: format!("{:016x}", profile),
        }
    }

    pub fn fixed(
        generated_at: DateTime<Utc>,
        session_id: impl Into<String>,
        profile_id: impl Into<String>,
    ) -> Self {
        Self {
            generated_at,
            session_id: session_id.into(),
            profile_id: profile_id.into(),
        }
    }
}

impl HeaderTemplate {
    /// Comment lines without line terminators
    pub fn render(&self, ctx: &HeaderContext) -> Vec<String> {
        match self {
            HeaderTemplate::TwentyThreeAndMe => twenty_three_and_me(ctx),
            HeaderTemplate::AncestryDna => ancestry_dna(ctx),
            HeaderTemplate::LivingDna => living_dna(ctx),
            HeaderTemplate::MyHeritage => my_heritage(ctx),
            HeaderTemplate::SuperKit => superkit(ctx),
            HeaderTemplate::None => Vec::new(),
        }
    }
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

fn twenty_three_and_me(ctx: &HeaderContext) -> Vec<String> {
    let mut lines = vec![format!(
        "# This data file generated by 23andMe at: {}",
        ctx.generated_at.format("%a %b %d %H:%M:%S %Y")
    )];
    lines.extend(owned(&[
        "#",
        "# This file contains raw genotype data, including data that is not used in 23andMe reports.",
        "# This data has undergone a general quality review however only a subset of markers have been ",
        "# individually validated for accuracy. As such, this data is suitable only for research, ",
        "# educational, and informational use and not for medical or other use.",
        "# ",
        "# Below is a text  version of your data.  Fields are TAB-separated",
        "# Each line corresponds to a single SNP.  For each SNP, we provide its identifier ",
        "# (an rsid or an internal id), its location on the reference human genome, and the ",
        "# genotype call oriented with respect to the plus strand on the human reference sequence.",
        "# We are using reference human assembly build 37 (also known as Annotation Release 104).",
        "# Note that it is possible that data downloaded at different times may be different due to ongoing ",
        "# improvements in our ability to call genotypes. More information about these changes can be found at:",
    ]));
    lines.push(format!(
        "# https://you.23andme.com/p/{}/tools/data/download/",
        ctx.profile_id
    ));
    lines.extend(owned(&[
        "# ",
        "# More information on reference human assembly builds:",
        "# https://www.ncbi.nlm.nih.gov/assembly/GCF_000001405.13/",
        "#",
    ]));
    lines
}

fn ancestry_dna(ctx: &HeaderContext) -> Vec<String> {
    let mut lines = owned(&["#AncestryDNA raw data download"]);
    lines.push(format!(
        "#This file was generated by AncestryDNA at: {}",
        ctx.generated_at.format("%m/%d/%Y %H:%M:%S UTC")
    ));
    lines.extend(owned(&[
        "#Data was collected using AncestryDNA array version: V2.0",
        "#Data is formatted using AncestryDNA converter version: V1.0",
        "#Below is a text version of your DNA file from Ancestry.com DNA, LLC.  THIS ",
        "#INFORMATION IS FOR YOUR PERSONAL USE AND IS INTENDED FOR GENEALOGICAL RESEARCH ",
        "#ONLY.  IT IS NOT INTENDED FOR MEDICAL, DIAGNOSTIC, OR HEALTH PURPOSES.  THE EXPORTED DATA IS ",
        "#SUBJECT TO THE ANCESTRYDNA TERMS AND CONDITIONS, BUT PLEASE BE AWARE THAT THE DOWNLOADED DATA WILL ",
        "#NO LONGER BE PROTECTED BY OUR SECURITY MEASURES.",
        "#WHEN YOU DOWNLOAD YOUR RAW DNA DATA, YOU ASSUME ALL RISK OF STORING, SECURING AND PROTECTING YOUR DOWNLOADED DATA.",
        "#For more information, see ancestry.com/dna/en/legal/us/privacyStatement",
        "#",
        "#Genetic data is provided below as five TAB delimited columns.  Each line ",
        "#corresponds to a SNP.  Column one provides the SNP identifier (rsID where ",
        "#possible).  Columns two and three contain the chromosome and basepair position ",
        "#of the SNP using human reference build 37.1 coordinates.  Columns four and five ",
        "#contain the two alleles observed at this SNP (genotype).  The genotype is reported ",
        "#on the forward (+) strand with respect to the human reference.",
    ]));
    lines
}

fn living_dna(ctx: &HeaderContext) -> Vec<String> {
    let mut lines = owned(&[
        "# Living DNA customer genotype data download file version: 1.0.2",
        "# This file contains raw genotype data, including data that is not used in Living DNA reports.",
        "# This data has undergone a general quality review however only a subset of markers have been ",
        "# individually validated for accuracy. As such, this data is suitable only for research, ",
        "# educational, and informational use and not for medical or other use.",
        "# ",
        "# Genotype data is oriented with respect to the plus strand on the human reference sequence.",
        "# We are using reference human assembly build 37 (also known as Annotation Release 104).",
        "# Note that it is possible that data downloaded at different times may be different due to ongoing ",
        "# improvements in our ability to call genotypes.",
    ]);
    lines.push(format!(
        "# File generated on {} for kit {}",
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S"),
        ctx.session_id
    ));
    lines
}

fn my_heritage(ctx: &HeaderContext) -> Vec<String> {
    let mut lines = owned(&["# MyHeritage DNA raw data."]);
    lines.push(format!(
        "# This file was generated on {}",
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.extend(owned(&[
        "# For each SNP, we provide the identifier, chromosome number, base pair position and genotype. The genotype is reported on the forward (+) strand with respect to the human reference build 37.",
        "# THIS INFORMATION IS FOR YOUR PERSONAL USE AND IS INTENDED FOR GENEALOGICAL RESEARCH ONLY. IT IS NOT INTENDED FOR MEDICAL OR HEALTH PURPOSES. PLEASE BE AWARE THAT THE DOWNLOADED DATA WILL NO LONGER BE PROTECTED BY OUR SECURITY MEASURES.",
    ]));
    lines.push(format!("# Download session: {}", ctx.session_id));
    lines.push("#".to_string());
    lines
}

fn superkit(ctx: &HeaderContext) -> Vec<String> {
    vec![
        "# DNA SuperKit".to_string(),
        format!("# Generated at: {}", ctx.generated_at.to_rfc3339()),
        "# Merged from several consumer DNA kits, reference human assembly build 37.".to_string(),
        "# Chromosomes 0 (unplaced), 1-22, X, Y, XY (pseudoautosomal) and MT.".to_string(),
        "# Genotypes list alleles in alphabetical order; -- is a no-call.".to_string(),
    ]
}
