//! Bounded directory archiving.
//!
//! Links always point at a single file, so directories are zipped before a
//! link is issued for them. Only entries within `max_depth` levels of the
//! directory are included (the directory's own children are level 1), and
//! directories whose files add up to more than `max_size` bytes are refused
//! before anything is written.
//!
//! Symbolic links inside the directory are skipped.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ArchiveConfig;
use crate::crypto::{sha256, to_hex};
use crate::error::{Error, Result};

/// Zips directories into a fixed destination directory.
#[derive(Debug, Clone)]
pub struct Archiver {
    max_depth: usize,
    max_size: u64,
    dest_dir: PathBuf,
}

impl Archiver {
    /// Create an archiver writing into `dest_dir`.
    #[must_use]
    pub fn new(max_depth: usize, max_size: u64, dest_dir: PathBuf) -> Self {
        Self {
            max_depth,
            max_size,
            dest_dir,
        }
    }

    /// Create an archiver from configuration.
    #[must_use]
    pub fn from_config(config: &ArchiveConfig, dest_dir: PathBuf) -> Self {
        Self::new(config.max_depth, config.max_size, dest_dir)
    }

    /// Archive `dir` and return the path of the finished zip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveTooLarge`] if the estimated size exceeds the
    /// limit, or [`Error::Archive`] / [`Error::Io`] if writing fails.
    pub fn archive(&self, dir: &Path) -> Result<PathBuf> {
        let size = estimate_size(dir, self.max_depth)?;
        if size > self.max_size {
            return Err(Error::ArchiveTooLarge {
                size,
                limit: self.max_size,
            });
        }

        let zip_path = zip_directory(dir, self.max_depth, &self.dest_dir)?;
        tracing::info!(
            source = %dir.display(),
            archive = %zip_path.display(),
            bytes = size,
            "Archived directory"
        );
        Ok(zip_path)
    }
}

/// Total size of the regular files reachable within `max_depth` levels of `dir`.
pub fn estimate_size(dir: &Path, max_depth: usize) -> Result<u64> {
    let mut total = 0u64;
    for entry in walk(dir, max_depth) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_file() {
            total = total.saturating_add(entry.metadata().map_err(walk_error)?.len());
        }
    }
    Ok(total)
}

/// File name of the archive for `dir`: `<dir name>-<digest>.zip`.
///
/// The digest is the first 12 hex digits of the SHA-256 of the full
/// directory path, so same-named directories in different places get
/// separate archives.
pub fn archive_file_name(dir: &Path) -> Result<String> {
    let name = dir
        .file_name()
        .ok_or_else(|| Error::Archive(format!("cannot archive {}", dir.display())))?;
    let digest = sha256(dir.to_string_lossy().as_bytes());
    Ok(format!(
        "{}-{}.zip",
        name.to_string_lossy(),
        to_hex(&digest[..6])
    ))
}

/// Write the archive of `dir` into `dest_dir` and return its path.
///
/// The archive is written under a temporary name and renamed into place
/// once complete, so a half-written zip is never linked. Archiving the
/// same directory again replaces its previous archive.
pub fn zip_directory(dir: &Path, max_depth: usize, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = archive_file_name(dir)?;

    std::fs::create_dir_all(dest_dir)?;
    let final_path = dest_dir.join(&file_name);
    let partial_path = dest_dir.join(format!("{file_name}.partial"));

    if let Err(e) = write_zip(dir, max_depth, &partial_path) {
        let _ = std::fs::remove_file(&partial_path);
        return Err(e);
    }
    std::fs::rename(&partial_path, &final_path)?;

    Ok(final_path)
}

fn write_zip(dir: &Path, max_depth: usize, output: &Path) -> Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(output)?);

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for entry in walk(dir, max_depth).filter(|e| e.as_ref().map_or(true, |e| e.depth() > 0)) {
        let entry = entry.map_err(walk_error)?;
        let name = archive_name(dir, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            let size = entry.metadata().map_err(walk_error)?.len();
            zip.start_file(name, options.large_file(size >= u64::from(u32::MAX)))?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    zip.finish()?;
    Ok(())
}

fn walk(dir: &Path, max_depth: usize) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(dir)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
}

/// Forward-slash path of `path` relative to `root`, as zip entries expect.
fn archive_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::Archive(format!("{} escapes {}", path.display(), root.display())))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn walk_error(err: walkdir::Error) -> Error {
    match err.into_io_error() {
        Some(io_err) => Error::Io(io_err),
        None => Error::Archive("filesystem loop detected".to_string()),
    }
}
