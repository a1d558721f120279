// ==============================================================================
// reference_table.rs - Vendor Reference Marker Tables
// ==============================================================================
// Description: Saved (rsid, chromosome, position) marker sets per vendor, used
//              to restore a vendor's exact marker list on output
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Storage:
//   - Text:   <dir>/<vendor-slug>.txt (tab) or .csv (comma)
//             header: rsid, chromosome, position
//   - SQLite: <dir>/references.db, table `markers` keyed by vendor slug
// ==============================================================================

use csv::{ReaderBuilder, Trim, WriterBuilder};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Result, Stage, SuperkitError};
use crate::models::{Chromosome, Kit, VendorId};
use crate::profiles::TestedRanges;

/// File name of the SQLite reference store inside a reference directory
pub const REFERENCE_DB_NAME: &str = "references.db";

/// One marker of a vendor's chip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMarker {
    pub rsid: String,
    pub chromosome: Chromosome,
    pub position: u64,
}

/// Ordered marker set of one vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    vendor: VendorId,
    markers: Vec<ReferenceMarker>,
}

impl ReferenceTable {
    pub fn new(vendor: VendorId, markers: Vec<ReferenceMarker>) -> Self {
        Self { vendor, markers }
    }

    /// Marker set of a canonicalized kit, including its chromosome-0 bucket
    pub fn from_kit(kit: &Kit) -> Self {
        let markers = kit
            .records()
            .iter()
            .chain(kit.unplaced())
            .map(|r| ReferenceMarker {
                rsid: r.rsid.clone(),
                chromosome: r.chromosome,
                position: r.position,
            })
            .collect();
        Self::new(kit.vendor(), markers)
    }

    pub fn vendor(&self) -> VendorId {
        self.vendor
    }

    pub fn markers(&self) -> &[ReferenceMarker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Smallest and largest position per chromosome
    ///
    /// Chromosome 0 is left out since it is never trimmed.
    pub fn tested_ranges(&self) -> TestedRanges {
        let mut bounds: HashMap<Chromosome, (u64, u64)> = HashMap::new();
        for marker in &self.markers {
            if marker.chromosome == Chromosome::Unplaced {
                continue;
            }
            bounds
                .entry(marker.chromosome)
                .and_modify(|(start, end)| {
                    *start = (*start).min(marker.position);
                    *end = (*end).max(marker.position);
                })
                .or_insert((marker.position, marker.position));
        }

        let mut ranges = TestedRanges::new();
        for (chromosome, (start, end)) in bounds {
            ranges.insert(chromosome, start, end);
        }
        ranges
    }

    /// Load a text table; `.csv` files are comma separated, anything else tab
    pub fn load_text(path: impl AsRef<Path>, vendor: VendorId) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter_for(path))
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| SuperkitError::csv(path, Stage::Reference, e))?;

        let mut markers = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| SuperkitError::csv(path, Stage::Reference, e))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            if record.len() != 3 {
                return Err(SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("expected 3 reference fields, found {}", record.len()),
                ));
            }

            let chromosome = Chromosome::from_label(&record[1]).ok_or_else(|| {
                SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("unknown chromosome '{}'", &record[1]),
                )
            })?;
            let position = record[2].parse::<u64>().map_err(|_| {
                SuperkitError::malformed(
                    path,
                    vendor,
                    line,
                    format!("invalid position '{}'", &record[2]),
                )
            })?;

            markers.push(ReferenceMarker {
                rsid: record[0].to_string(),
                chromosome,
                position,
            });
        }

        debug!("Loaded {} {} reference markers from {:?}", markers.len(), vendor, path);
        Ok(Self::new(vendor, markers))
    }

    pub fn save_text(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter_for(path))
            .from_path(path)
            .map_err(|e| SuperkitError::csv(path, Stage::Reference, e))?;

        writer
            .write_record(["rsid", "chromosome", "position"])
            .map_err(|e| SuperkitError::csv(path, Stage::Reference, e))?;
        for marker in &self.markers {
            let chromosome = marker.chromosome.to_string();
            let position = marker.position.to_string();
            writer
                .write_record([marker.rsid.as_str(), chromosome.as_str(), position.as_str()])
                .map_err(|e| SuperkitError::csv(path, Stage::Reference, e))?;
        }
        writer
            .flush()
            .map_err(|e| SuperkitError::io(path, Stage::Reference, e))?;

        info!("Saved {} {} reference markers to {:?}", self.len(), self.vendor, path);
        Ok(())
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

/// SQLite-backed reference store
pub struct ReferenceDatabase {
    conn: Connection,
}

impl ReferenceDatabase {
    /// Open (or create) a reference database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS markers (
                vendor TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                rsid TEXT NOT NULL,
                chromosome TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (vendor, ordinal)
            )",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Replace the stored table of `table.vendor()`
    pub fn save(&mut self, table: &ReferenceTable) -> Result<()> {
        let vendor = table.vendor().slug();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM markers WHERE vendor = ?1", params![vendor])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO markers (vendor, ordinal, rsid, chromosome, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for (ordinal, marker) in table.markers().iter().enumerate() {
                stmt.execute(params![
                    vendor,
                    ordinal as i64,
                    marker.rsid,
                    marker.chromosome.to_string(),
                    marker.position as i64,
                ])?;
            }
        }
        tx.commit()?;

        info!("Stored {} {} reference markers", table.len(), table.vendor());
        Ok(())
    }

    /// Stored table of a vendor, if any
    pub fn load(&self, vendor: VendorId) -> Result<Option<ReferenceTable>> {
        let mut stmt = self.conn.prepare(
            "SELECT rsid, chromosome, position
             FROM markers
             WHERE vendor = ?1
             ORDER BY ordinal",
        )?;

        let marker_iter = stmt.query_map(params![vendor.slug()], |row| {
            let label: String = row.get(1)?;
            let chromosome = Chromosome::from_label(&label).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Unknown chromosome '{}'", label),
                    )),
                )
            })?;
            let position: i64 = row.get(2)?;

            Ok(ReferenceMarker {
                rsid: row.get(0)?,
                chromosome,
                position: position.max(0) as u64,
            })
        })?;

        let mut markers = Vec::new();
        for marker in marker_iter {
            markers.push(marker?);
        }

        if markers.is_empty() {
            return Ok(None);
        }
        Ok(Some(ReferenceTable::new(vendor, markers)))
    }

    /// Vendors with a stored table
    ///
    /// Rows under an unrecognized vendor slug are logged and skipped.
    pub fn vendors(&self) -> Result<Vec<VendorId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT vendor FROM markers ORDER BY vendor")?;
        let slugs = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut vendors = Vec::new();
        for slug in slugs {
            let slug = slug?;
            match slug.parse::<VendorId>() {
                Ok(vendor) => vendors.push(vendor),
                Err(e) => warn!("Ignoring reference markers stored under {}", e),
            }
        }
        Ok(vendors)
    }
}

/// Reference tables available to a run, at most one per vendor
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    tables: HashMap<VendorId, ReferenceTable>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table found in a reference directory
    ///
    /// Text tables (`<slug>.txt`, then `<slug>.csv`) take precedence over
    /// the SQLite store.
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut library = Self::new();

        for vendor in VendorId::KNOWN {
            if let Some(path) = text_table_path(dir, vendor) {
                library.insert(ReferenceTable::load_text(&path, vendor)?);
            }
        }

        let db_path = dir.join(REFERENCE_DB_NAME);
        if db_path.is_file() {
            let db = ReferenceDatabase::open(&db_path)?;
            for vendor in db.vendors()? {
                if library.get(vendor).is_some() {
                    continue;
                }
                if let Some(table) = db.load(vendor)? {
                    library.insert(table);
                }
            }
        }

        info!("Loaded {} reference tables from {:?}", library.len(), dir);
        Ok(library)
    }

    pub fn insert(&mut self, table: ReferenceTable) {
        self.tables.insert(table.vendor(), table);
    }

    pub fn get(&self, vendor: VendorId) -> Option<&ReferenceTable> {
        self.tables.get(&vendor)
    }

    pub fn tables(&self) -> impl Iterator<Item = &ReferenceTable> {
        self.tables.values()
    }

    /// Table for a restore request
    pub fn require(&self, vendor: VendorId) -> Result<&ReferenceTable> {
        self.get(vendor)
            .ok_or(SuperkitError::ReferenceTableMismatch { vendor })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn text_table_path(dir: &Path, vendor: VendorId) -> Option<PathBuf> {
    ["txt", "csv"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", vendor.slug(), ext)))
        .find(|path| path.is_file())
}
