// ==============================================================================
// main.rs - DNA SuperKit Entry Point
// ==============================================================================
// Description: Command line entry point for building SuperKits and
//              extracting vendor reference tables
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dna_superkit::merge::MergeOptions;
use dna_superkit::models::{VendorId, VendorPriorityList};
use dna_superkit::output::FormatOptions;
use dna_superkit::processor::{self, PipelineConfig, SuperkitProcessor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every kit in a directory and write the requested formats
    Build(BuildArgs),

    /// Save the marker set of a vendor raw data file as a reference table
    ExtractReference(ExtractArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Directory containing raw data downloads
    #[arg(env = "SUPERKIT_INPUT_DIR")]
    input_dir: PathBuf,

    /// Directory receiving the generated files
    #[arg(env = "SUPERKIT_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Output format (slug or display name); repeat for several
    #[arg(
        short,
        long = "format",
        env = "SUPERKIT_FORMATS",
        value_delimiter = ',',
        default_value = "superkit"
    )]
    formats: Vec<VendorId>,

    /// Resolve conflicts by majority before falling back to vendor priority
    #[arg(long, env = "SUPERKIT_MAJORITY_VOTE")]
    majority_vote: bool,

    /// Drop markers outside each target vendor's tested ranges
    #[arg(long, env = "SUPERKIT_TRIM")]
    trim: bool,

    /// Emit exactly the target vendor's reference marker set
    #[arg(long, env = "SUPERKIT_RESTORE")]
    restore: bool,

    /// Directory with reference tables (<vendor-slug>.txt/.csv or references.db)
    #[arg(long, env = "SUPERKIT_REFERENCE_DIR")]
    reference_dir: Option<PathBuf>,

    /// Derive tested ranges from the loaded reference tables
    #[arg(long, env = "SUPERKIT_RANGES_FROM_REFERENCE", requires = "reference_dir")]
    ranges_from_reference: bool,

    /// Vendor priority for conflict resolution, highest first; unlisted vendors
    /// follow in the default order
    #[arg(long, env = "SUPERKIT_PRIORITY", value_delimiter = ',')]
    priority: Vec<VendorId>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Vendor raw data file
    input: PathBuf,

    /// Output .txt/.csv table, .db reference database, or directory
    output: PathBuf,

    /// Skip detection and treat the input as this vendor
    #[arg(long)]
    vendor: Option<VendorId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dna_superkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => build(args).await,
        Command::ExtractReference(args) => {
            let (table, path) =
                processor::extract_reference(args.input, args.output, args.vendor).await?;
            info!(
                "Saved {} reference table ({} markers) to {}",
                table.vendor(),
                table.len(),
                path.display()
            );
            Ok(())
        }
    }
}

async fn build(args: BuildArgs) -> Result<()> {
    if args.restore && args.reference_dir.is_none() {
        warn!("--restore without --reference-dir: outputs needing a reference table will fail");
    }

    let priority = if args.priority.is_empty() {
        VendorPriorityList::default()
    } else {
        VendorPriorityList::new(args.priority)
    };

    let config = PipelineConfig {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        targets: args.formats,
        merge: MergeOptions {
            majority_vote: args.majority_vote,
            priority,
        },
        format: FormatOptions {
            trim: args.trim,
            restore: args.restore,
        },
        reference_dir: args.reference_dir,
        ranges_from_reference: args.ranges_from_reference,
    };

    info!("DNA SuperKit starting...");
    let summary = SuperkitProcessor::new(config).process().await?;

    for skipped in &summary.skipped {
        warn!("Not merged: {} ({}: {})", skipped.file, skipped.stage, skipped.reason);
    }
    for failed in &summary.failed_outputs {
        warn!("Not written: {} ({}: {})", failed.vendor, failed.stage, failed.reason);
    }
    for written in &summary.outputs {
        info!("{}: {}", written.vendor, written.path.display());
    }

    if summary.outputs.is_empty() {
        anyhow::bail!("No output format could be written");
    }

    Ok(())
}
