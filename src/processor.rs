// ==============================================================================
// processor.rs - SuperKit Build Pipeline
// ==============================================================================
// Description: Scans an input directory, canonicalizes every kit, merges them
//              and writes each requested vendor format plus a run summary
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::canonicalizer::Canonicalizer;
use crate::detector::VendorDetector;
use crate::error::{Stage, SuperkitError};
use crate::merge::{MergeEngine, MergeOptions};
use crate::models::{Kit, MergeStats, Sex, VendorId};
use crate::output::{FormatOptions, OutputFormatter};
use crate::parsers::VendorFileParser;
use crate::profiles::{HeaderContext, ProfileRegistry};
use crate::reference_table::{ReferenceDatabase, ReferenceLibrary, ReferenceTable};
use crate::validator::{sanitize_filename, FileValidator};

/// Name of the JSON run report written next to the outputs
pub const SUMMARY_FILE_NAME: &str = "DNASuperKit-summary.json";

/// Settings for one build run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Output formats, written in this order
    pub targets: Vec<VendorId>,
    pub merge: MergeOptions,
    pub format: FormatOptions,
    /// Directory holding `<vendor-slug>.txt|csv` tables and/or `references.db`
    pub reference_dir: Option<PathBuf>,
    /// Replace built-in tested ranges with ranges derived from loaded tables
    pub ranges_from_reference: bool,
}

/// One successfully loaded kit
#[derive(Debug, Clone, Serialize)]
pub struct KitSummary {
    pub file: String,
    pub vendor: VendorId,
    pub sex: Sex,
    pub records: usize,
    pub unplaced: usize,
    pub sha256: Option<String>,
}

/// An input file left out of the merge
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub vendor: VendorId,
    pub path: PathBuf,
    pub rows: usize,
}

/// A requested output format that could not be produced
#[derive(Debug, Clone, Serialize)]
pub struct FailedOutput {
    pub vendor: VendorId,
    pub stage: Stage,
    pub reason: String,
}

/// Everything a caller needs to report on a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub majority_vote: bool,
    pub trim: bool,
    pub restore: bool,
    pub kits: Vec<KitSummary>,
    pub skipped: Vec<SkippedFile>,
    pub superkit_records: usize,
    pub unplaced_records: usize,
    /// Records surviving into the SuperKit per source vendor
    pub vendor_counts: BTreeMap<VendorId, usize>,
    pub merge: MergeStats,
    pub outputs: Vec<WrittenFile>,
    pub failed_outputs: Vec<FailedOutput>,
}

pub struct SuperkitProcessor {
    run_id: Uuid,
    config: PipelineConfig,
}

impl SuperkitProcessor {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            config,
        }
    }

    /// Main processing pipeline
    pub async fn process(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        info!("Starting SuperKit build {}", self.run_id);
        info!(
            "Targets: {:?}, majority vote: {}, trim: {}, restore: {}",
            self.config.targets,
            self.config.merge.majority_vote,
            self.config.format.trim,
            self.config.format.restore
        );

        // 1. Reference tables and vendor profiles
        let references = self.load_references()?;
        let registry = Arc::new(self.build_registry(references.as_ref()));

        // 2. Locate input files
        let files = self.locate_input_files()?;
        info!("Found {} candidate files in {:?}", files.len(), self.config.input_dir);

        // 3. Detect, parse and canonicalize every kit
        let (kits, skipped) = self.load_kits(Arc::clone(&registry), files).await?;
        for skip in &skipped {
            warn!("Skipped {} during {}: {}", skip.file, skip.stage, skip.reason);
        }

        if kits.is_empty() {
            return Err(SuperkitError::EmptyInput.into());
        }

        let kit_summaries: Vec<KitSummary> = kits.iter().map(summarize_kit).collect();
        for kit in &kit_summaries {
            info!(
                "Kit {}: {} ({} records, {} unplaced, sex {})",
                kit.file,
                kit.vendor,
                kit.records,
                kit.unplaced,
                kit.sex.as_str()
            );
        }

        // 4. Merge
        let engine = MergeEngine::new(self.config.merge.clone());
        let superkit = engine.merge(&kits).context("Failed to merge kits")?;
        for (vendor, count) in &superkit.vendor_counts {
            info!("{}: {} records in SuperKit", vendor, count);
        }

        // 5. Write each requested format
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output directory {:?}", self.config.output_dir)
            })?;

        let mut formatter = OutputFormatter::new(&registry, self.config.format);
        if let Some(references) = references.as_ref() {
            formatter = formatter.with_references(references);
        }

        let ctx = HeaderContext::new();
        let mut outputs = Vec::new();
        let mut failed_outputs = Vec::new();
        for target in &self.config.targets {
            let written = formatter
                .format(&superkit, *target, &ctx)
                .and_then(|table| {
                    let rows = table.rows.len();
                    formatter
                        .write_table(&table, &self.config.output_dir)
                        .map(|path| (path, rows))
                });

            match written {
                Ok((path, rows)) => {
                    info!("Wrote {} ({} rows)", path.display(), rows);
                    outputs.push(WrittenFile {
                        vendor: *target,
                        path,
                        rows,
                    });
                }
                Err(e) => {
                    warn!("Could not produce {} output: {}", target, e);
                    failed_outputs.push(FailedOutput {
                        vendor: *target,
                        stage: e.stage(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let summary = RunSummary {
            run_id: self.run_id,
            started_at,
            finished_at: Utc::now(),
            input_dir: self.config.input_dir.clone(),
            output_dir: self.config.output_dir.clone(),
            majority_vote: self.config.merge.majority_vote,
            trim: self.config.format.trim,
            restore: self.config.format.restore,
            kits: kit_summaries,
            skipped,
            superkit_records: superkit.records.len(),
            unplaced_records: superkit.unplaced.len(),
            vendor_counts: superkit.vendor_counts.clone(),
            merge: superkit.stats.clone(),
            outputs,
            failed_outputs,
        };

        // 6. Run summary
        let summary_path = self.config.output_dir.join(SUMMARY_FILE_NAME);
        let json =
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?;
        tokio::fs::write(&summary_path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", summary_path))?;

        info!(
            "SuperKit build {} complete: {} kits, {} records, {} outputs",
            self.run_id,
            summary.kits.len(),
            summary.superkit_records,
            summary.outputs.len()
        );

        Ok(summary)
    }

    fn load_references(&self) -> Result<Option<ReferenceLibrary>> {
        match &self.config.reference_dir {
            Some(dir) => {
                let library = ReferenceLibrary::open_dir(dir)
                    .with_context(|| format!("Failed to load reference tables from {:?}", dir))?;
                Ok(Some(library))
            }
            None => Ok(None),
        }
    }

    fn build_registry(&self, references: Option<&ReferenceLibrary>) -> ProfileRegistry {
        let mut registry = ProfileRegistry::builtin();
        if self.config.ranges_from_reference {
            if let Some(references) = references {
                for table in references.tables() {
                    debug!(
                        "Using {} reference markers as {} tested ranges",
                        table.len(),
                        table.vendor()
                    );
                    registry = registry.with_tested_ranges(table.vendor(), table.tested_ranges());
                }
            }
        }
        registry
    }

    fn locate_input_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.input_dir;
        if !dir.is_dir() {
            anyhow::bail!("Input directory not found: {:?}", dir);
        }

        let validator = FileValidator::new();
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to read input directory {:?}", dir))?;
            let path = entry.path();
            if entry.file_type().is_file()
                && validator.is_candidate(path)
                && !self.is_previous_output(path)
            {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Files inside an output directory nested under the input directory
    fn is_previous_output(&self, path: &Path) -> bool {
        let output = &self.config.output_dir;
        output != &self.config.input_dir
            && output.starts_with(&self.config.input_dir)
            && path.starts_with(output)
    }

    async fn load_kits(
        &self,
        registry: Arc<ProfileRegistry>,
        files: Vec<PathBuf>,
    ) -> Result<(Vec<Kit>, Vec<SkippedFile>)> {
        let detector = Arc::new(VendorDetector::new(&registry)?);

        let mut tasks = JoinSet::new();
        for path in files {
            let registry = Arc::clone(&registry);
            let detector = Arc::clone(&detector);
            tasks.spawn_blocking(move || {
                let result = load_kit(&registry, &detector, &path);
                (path, result)
            });
        }

        let mut kits = Vec::new();
        let mut skipped = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined.context("Kit loading task failed")?;
            match result {
                Ok(kit) => kits.push(kit),
                Err((stage, reason)) => skipped.push(SkippedFile {
                    file: display_name(&path),
                    stage,
                    reason,
                }),
            }
        }

        // Completion order is arbitrary
        kits.sort_by(|a, b| a.source_path().cmp(&b.source_path()));
        skipped.sort_by(|a, b| a.file.cmp(&b.file));

        Ok((kits, skipped))
    }
}

/// Validate, detect, parse and canonicalize one file
fn load_kit(
    registry: &ProfileRegistry,
    detector: &VendorDetector,
    path: &Path,
) -> std::result::Result<Kit, (Stage, String)> {
    let validated = FileValidator::new()
        .validate(path)
        .map_err(|e| (Stage::Validation, format!("{:#}", e)))?;

    let failed = |e: SuperkitError| (e.stage(), e.to_string());

    let vendor = detector.detect_file(path).map_err(failed)?;
    let raw = VendorFileParser::new(registry)
        .parse(path, vendor)
        .map_err(failed)?;
    let kit = Canonicalizer::new(registry)
        .canonicalize(raw)
        .map_err(failed)?;

    Ok(kit.with_source(path, Some(validated.hash_sha256)))
}

fn summarize_kit(kit: &Kit) -> KitSummary {
    KitSummary {
        file: kit.source_path().map(display_name).unwrap_or_default(),
        vendor: kit.vendor(),
        sex: kit.sex(),
        records: kit.records().len(),
        unplaced: kit.unplaced().len(),
        sha256: kit.sha256().map(str::to_string),
    }
}

fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    sanitize_filename(&name).unwrap_or(name)
}

/// Build a reference table from one vendor raw data file
///
/// `output` ending in `.db` stores the table in a SQLite reference database;
/// an existing directory receives `<vendor-slug>.txt`; anything else is
/// written as a text table.
pub async fn extract_reference(
    input: PathBuf,
    output: PathBuf,
    vendor: Option<VendorId>,
) -> Result<(ReferenceTable, PathBuf)> {
    tokio::task::spawn_blocking(move || {
        let registry = ProfileRegistry::builtin();
        let vendor = match vendor {
            Some(vendor) => vendor,
            None => VendorDetector::new(&registry)?.detect_file(&input)?,
        };
        info!("Extracting {} reference markers from {:?}", vendor, input);

        let raw = VendorFileParser::new(&registry).parse(&input, vendor)?;
        let kit = Canonicalizer::new(&registry).canonicalize(raw)?;
        let table = ReferenceTable::from_kit(&kit);

        let is_db = output
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("db"))
            .unwrap_or(false);

        let path = if is_db {
            ReferenceDatabase::open(&output)?.save(&table)?;
            output
        } else if output.is_dir() {
            let path = output.join(format!("{}.txt", vendor.slug()));
            table.save_text(&path)?;
            path
        } else {
            table.save_text(&output)?;
            output
        };

        Ok::<_, SuperkitError>((table, path))
    })
    .await
    .context("Reference extraction task failed")?
    .context("Failed to extract reference table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config(input: &Path, output: &Path) -> PipelineConfig {
        PipelineConfig {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            targets: vec![VendorId::SuperKit],
            merge: MergeOptions::default(),
            format: FormatOptions::default(),
            reference_dir: None,
            ranges_from_reference: false,
        }
    }

    #[test]
    fn test_nested_output_dir_is_not_scanned() {
        let nested =
            SuperkitProcessor::new(config(Path::new("/data/in"), Path::new("/data/in/out")));
        assert!(nested.is_previous_output(Path::new("/data/in/out/DNASuperKit-SuperKit.txt")));
        assert!(!nested.is_previous_output(Path::new("/data/in/genome_v5_Full.txt")));

        let same = SuperkitProcessor::new(config(Path::new("/data/in"), Path::new("/data/in")));
        assert!(!same.is_previous_output(Path::new("/data/in/DNASuperKit-SuperKit.txt")));
    }

    #[tokio::test]
    async fn test_empty_input_is_fatal() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("notes.txt"), "nothing to see here\n").unwrap();

        let err = SuperkitProcessor::new(config(input.path(), output.path()))
            .process()
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SuperkitError>(),
            Some(SuperkitError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_missing_input_dir() {
        let output = tempdir().unwrap();
        let missing = Path::new("/nonexistent/superkit/in");
        let result = SuperkitProcessor::new(config(missing, output.path()))
            .process()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_extract_reference_to_directory() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("AncestryDNA.txt");
        fs::write(
            &input,
            "#AncestryDNA raw data download\n\
             rsid\tchromosome\tposition\tallele1\tallele2\n\
             rs1\t1\t100\tA\tG\n\
             rs2\t23\t5000\tT\tT\n",
        )
        .unwrap();

        let (table, path) = extract_reference(input, dir.path().to_path_buf(), None)
            .await
            .unwrap();
        assert_eq!(table.vendor(), VendorId::AncestryDnaV2);
        assert_eq!(table.len(), 2);
        assert_eq!(path, dir.path().join("ancestrydna-v2.txt"));

        let loaded = ReferenceTable::load_text(&path, VendorId::AncestryDnaV2).unwrap();
        assert_eq!(loaded, table);
    }
}
