// ==============================================================================
// lib.rs - DNA SuperKit Library
// ==============================================================================
// Description: Library interface for vendor detection, canonicalization,
//              merging and vendor-format output of consumer DNA kits
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod canonicalizer;
pub mod detector;
pub mod error;
pub mod genotype;
pub mod merge;
pub mod models;
pub mod output;
pub mod parsers;
pub mod processor;
pub mod profiles;
pub mod reference_table;
pub mod validator;
