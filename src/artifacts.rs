//! Artifact archival — relocates run outputs into dated archive folders.
//!
//! Destination layout is `<archive_root>/<YYYY-MM-DD>/<tag>/<filename>`,
//! with the tag absent for the daily operational run and `median` /
//! `ensemble` / `seasonal` for forecast runs. Re-running with the same
//! date and identical content is a no-op; a destination already holding
//! different content is a hard error — two runs' outputs are never merged
//! silently.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::dates::date_stamp;
use crate::error::ArtifactError;

/// Record of one completed relocation.
#[derive(Debug)]
pub struct ArtifactMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Files newly copied into the archive.
    pub relocated: usize,
    /// Files skipped because the archive already held identical content.
    pub skipped_identical: usize,
}

/// Archival file operations rooted at one archive directory.
pub struct ArtifactManager {
    archive_root: PathBuf,
}

impl ArtifactManager {
    #[must_use]
    pub fn new(archive_root: PathBuf) -> Self {
        Self { archive_root }
    }

    /// Copy every file under `source_dir` into the dated (and optionally
    /// tagged) archive folder, preserving subdirectory structure.
    ///
    /// # Errors
    ///
    /// [`ArtifactError::MissingSource`] / [`ArtifactError::EmptySource`]
    /// when the expected output never materialized, and
    /// [`ArtifactError::Collision`] when the destination already holds a
    /// file with different content.
    pub fn relocate(
        &self,
        source_dir: &Path,
        date: NaiveDate,
        tag: Option<&str>,
    ) -> Result<ArtifactMove, ArtifactError> {
        if !source_dir.is_dir() {
            return Err(ArtifactError::MissingSource(source_dir.to_path_buf()));
        }

        let mut destination = self.archive_root.join(date_stamp(date));
        if let Some(tag) = tag {
            destination = destination.join(tag);
        }

        let mut result = ArtifactMove {
            source: source_dir.to_path_buf(),
            destination: destination.clone(),
            relocated: 0,
            skipped_identical: 0,
        };
        copy_tree(source_dir, &destination, &mut result)?;

        if result.relocated == 0 && result.skipped_identical == 0 {
            return Err(ArtifactError::EmptySource(source_dir.to_path_buf()));
        }
        Ok(result)
    }
}

fn copy_tree(
    source: &Path,
    destination: &Path,
    result: &mut ArtifactMove,
) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(destination).map_err(|source_err| ArtifactError::Io {
        path: destination.to_path_buf(),
        source: source_err,
    })?;

    let entries = std::fs::read_dir(source).map_err(|source_err| ArtifactError::Io {
        path: source.to_path_buf(),
        source: source_err,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source_err| ArtifactError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to, result)?;
        } else {
            copy_file(&from, &to, result)?;
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path, result: &mut ArtifactMove) -> Result<(), ArtifactError> {
    if to.exists() {
        let same = sha256_file(from)? == sha256_file(to)?;
        if same {
            result.skipped_identical += 1;
            return Ok(());
        }
        return Err(ArtifactError::Collision {
            path: to.to_path_buf(),
        });
    }
    std::fs::copy(from, to).map_err(|source_err| ArtifactError::Io {
        path: to.to_path_buf(),
        source: source_err,
    })?;
    result.relocated += 1;
    Ok(())
}

/// Compute the SHA256 hex digest of a file.
///
/// Reads the file in 64 KB chunks to avoid loading large model outputs
/// into memory.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, ArtifactError> {
    let io_err = |source: std::io::Error| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    Ok(hex)
}
