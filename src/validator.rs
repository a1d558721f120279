// ==============================================================================
// validator.rs - Input File Validation
// ==============================================================================
// Description: Validates raw DNA data files before parsing (size, type,
//              gzip magic number) and fingerprints them with SHA-256
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024; // 500 MB

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub original_name: String,
    pub safe_name: String,
    pub extension: String,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct FileValidator {
    max_file_size: u64,
    allowed_types: HashMap<&'static str, &'static [u8]>,
}

impl FileValidator {
    pub fn new() -> Self {
        let mut allowed_types: HashMap<&'static str, &'static [u8]> = HashMap::new();

        // Vendor raw text downloads (plain text, no specific magic number)
        allowed_types.insert("txt", &[]);
        allowed_types.insert("csv", &[]);

        // Gzip compressed downloads
        allowed_types.insert("txt.gz", &GZIP_MAGIC);
        allowed_types.insert("csv.gz", &GZIP_MAGIC);

        Self {
            max_file_size: MAX_FILE_SIZE,
            allowed_types,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Whether a directory entry looks like a raw data file worth validating
    pub fn is_candidate(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .and_then(|name| get_extension(&name))
            .map(|ext| self.allowed_types.contains_key(ext.as_str()))
            .unwrap_or(false)
    }

    pub fn validate(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path"))?
            .to_string_lossy()
            .to_string();

        info!("Validating file: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to get file metadata for {:?}", file_path))?;
        let size = metadata.len();

        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        if size == 0 {
            anyhow::bail!("File is empty");
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Filename sanitization
        let safe_name = sanitize_filename(&file_name)?;
        debug!("Sanitized filename: {}", safe_name);

        // 3. Extension check (allowlist)
        let ext = get_extension(&safe_name.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("No file extension found"))?;
        let expected_magic = self
            .allowed_types
            .get(ext.as_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", ext))?;
        debug!("Extension check passed: {}", ext);

        // 4. Magic number verification
        if !expected_magic.is_empty() {
            let actual_magic = read_magic_number(file_path, expected_magic.len())?;
            if actual_magic.as_slice() != *expected_magic {
                anyhow::bail!("Magic number mismatch for .{} file", ext);
            }
            debug!("Magic number check passed");
        }

        // 5. Compute SHA-256 hash
        let hash = compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            original_name: file_name,
            safe_name,
            extension: ext,
            size,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Filename safe for logs and reports
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Remove path separators, null bytes, control characters
    let safe = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || *c == '.'
                || *c == '-'
                || *c == ' '
        })
        .collect::<String>();

    // Limit length to 255 characters
    let truncated: String = safe.trim().chars().take(255).collect();

    // Must not be empty after sanitization
    if truncated.is_empty() {
        anyhow::bail!("Invalid filename after sanitization");
    }

    Ok(truncated)
}

/// Lowercase extension, compound for gzip downloads ("txt.gz")
fn get_extension(filename: &str) -> Option<String> {
    let filename = filename.to_lowercase();

    // Handle compound extensions like .txt.gz
    for compound in ["txt.gz", "csv.gz"] {
        if filename.ends_with(&format!(".{}", compound)) {
            return Some(compound.to_string());
        }
    }

    // Single extension
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}

fn read_magic_number(path: &Path, len: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; len];
    file.read_exact(&mut buffer)
        .context("File too short for magic number")?;
    Ok(buffer)
}

/// Hex SHA-256 of a file's raw bytes
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::{tempdir, Builder};

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("genome_file.txt").unwrap(),
            "genome_file.txt"
        );

        assert_eq!(
            sanitize_filename("../../../etc/passwd").unwrap(),
            ".._.._.._etc_passwd"
        );

        assert_eq!(
            sanitize_filename("file\0with\nnull.txt").unwrap(),
            "file_withnull.txt"  // \n is filtered out, not replaced
        );

        assert!(sanitize_filename("\u{00e9}\u{00e8}").is_err());
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension("genome.txt.gz").as_deref(), Some("txt.gz"));
        assert_eq!(get_extension("AncestryDNA.TXT").as_deref(), Some("txt"));
        assert_eq!(get_extension("kit.csv").as_deref(), Some("csv"));
        assert_eq!(get_extension("README"), None);
    }

    #[test]
    fn test_candidates() {
        let validator = FileValidator::new();
        assert!(validator.is_candidate(Path::new("in/genome_v5_Full.txt")));
        assert!(validator.is_candidate(Path::new("in/MyHeritage.csv.gz")));
        assert!(!validator.is_candidate(Path::new("in/notes.pdf")));
        assert!(!validator.is_candidate(Path::new("in/archive.zip")));
    }

    #[test]
    fn test_validate_text_file() {
        let validator = FileValidator::new();

        let mut temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(temp_file, "# This data file generated by 23andMe").unwrap();
        writeln!(temp_file, "rs12345\t1\t12345\tAA").unwrap();
        temp_file.flush().unwrap();

        let validated = validator.validate(temp_file.path()).unwrap();
        assert_eq!(validated.extension, "txt");
        assert_eq!(validated.hash_sha256.len(), 64);
        assert_eq!(validated.hash_sha256, compute_sha256(temp_file.path()).unwrap());
    }

    #[test]
    fn test_gzip_magic_mismatch() {
        let dir = tempdir().unwrap();
        let validator = FileValidator::new();

        let fake = dir.path().join("kit.txt.gz");
        std::fs::write(&fake, "rs1\t1\t100\tAA\n").unwrap();
        assert!(validator.validate(&fake).is_err());

        let real = dir.path().join("kit2.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&real).unwrap(), Compression::default());
        encoder.write_all(b"rs1\t1\t100\tAA\n").unwrap();
        encoder.finish().unwrap();
        assert_eq!(validator.validate(&real).unwrap().extension, "txt.gz");
    }

    #[test]
    fn test_size_limits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kit.csv");
        std::fs::write(&path, "RSID,CHROMOSOME,POSITION,RESULT\n").unwrap();

        let validator = FileValidator::new().with_max_file_size(8);
        assert!(validator.validate(&path).is_err());

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "").unwrap();
        assert!(FileValidator::new().validate(&empty).is_err());
    }
}
