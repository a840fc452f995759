//! Three-tier thumbnail cache.
//!
//! Generating a thumbnail is the expensive path; [`ThumbStore::resolve`]
//! tries three tiers first, in strictly increasing cost:
//!
//! 1. **Output directory** — already built this run (or left from a
//!    previous local run).
//! 2. **Persisted cache** — copied into the output directory on hit.
//! 3. **Published remote** — downloaded into the output directory on hit.
//!
//! Failures in tiers 2 and 3 (unreadable file, network error, 404) are
//! treated as misses, never as pipeline errors: the thumbnail is simply
//! regenerated. Content-addressed names make this sound — a name match
//! *is* a content match.
//!
//! [`CacheSync`] manages the persisted tier around the run: restoring it
//! from an archived snapshot before processing and folding the run's new
//! output back into it afterwards.

use crate::config::PipelineConfig;
use crate::fetch::{self, Remote};
use crate::metadata::{self, SizeMap};
use crate::output;
use std::fs;
use std::io;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Thumbnail store shared read-only across the worker pool. All methods
/// take `&self`; concurrent saves of the same name write identical bytes.
pub struct ThumbStore {
    output_dir: PathBuf,
    cache_thumbs_dir: PathBuf,
    thumbs_base_url: Option<String>,
}

impl ThumbStore {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            output_dir: config.paths.output_dir.clone(),
            cache_thumbs_dir: config.paths.cache_thumbs_dir(),
            thumbs_base_url: config.remote.thumbs_base_url.clone(),
        }
    }

    /// Final location of a named thumbnail in the output directory.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    /// Try to satisfy a thumbnail by name without generating it. On a
    /// tier-2 or tier-3 hit the bytes land in the output directory, so a
    /// `true` always means "present in output".
    pub fn resolve(&self, name: &str, remote: &dyn Remote) -> bool {
        let target = self.output_path(name);
        if target.exists() {
            return true;
        }

        let cached = self.cache_thumbs_dir.join(name);
        if cached.exists() && copy_into(&cached, &target).is_ok() {
            return true;
        }

        if let Some(base) = &self.thumbs_base_url {
            let url = format!("{}/{}", base.trim_end_matches('/'), name);
            if fetch::download_file(remote, &url, &target).is_ok() {
                return true;
            }
        }
        false
    }

    /// Write freshly generated thumbnail bytes into the output directory.
    pub fn save(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let target = self.output_path(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, bytes)
    }
}

fn copy_into(from: &std::path::Path, to: &std::path::Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

/// Restores and updates the persisted cache tier around a run.
pub struct CacheSync {
    cache_dir: PathBuf,
    cache_thumbs_dir: PathBuf,
    cache_metadata_path: PathBuf,
    output_dir: PathBuf,
    output_metadata_path: PathBuf,
    archive_url: Option<String>,
}

impl CacheSync {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            cache_dir: config.paths.cache_dir.clone(),
            cache_thumbs_dir: config.paths.cache_thumbs_dir(),
            cache_metadata_path: config.paths.cache_metadata_path(),
            output_dir: config.paths.output_dir.clone(),
            output_metadata_path: config.paths.output_metadata_path(),
            archive_url: config.remote.cache_archive_url.clone(),
        }
    }

    /// Populate the persisted cache from the archived snapshot, if it is
    /// empty. Every failure here is non-fatal: a cold cache only costs
    /// time.
    pub fn restore(&self, remote: &dyn Remote) {
        if self.cache_thumbs_dir.exists() {
            return;
        }
        let Some(url) = &self.archive_url else {
            return;
        };
        output::restoring_cache(url);

        let archive_path = self.cache_dir.join("thumbs.zip");
        if let Err(err) = fetch::download_file(remote, url, &archive_path) {
            output::warn_cache_restore(&format!("download failed: {err}"));
            return;
        }
        let extracted = extract_archive(&archive_path, &self.cache_dir);
        // The archive is only an expanded-form source; never keep it.
        let _ = fs::remove_file(&archive_path);
        if let Err(err) = extracted {
            output::warn_cache_restore(&format!("extraction failed: {err}"));
        }
    }

    /// Fold the run's output back into the persisted cache: copy any
    /// thumbnail the cache does not yet hold, and merge size metadata
    /// with the current run taking precedence.
    pub fn update(&self) -> io::Result<()> {
        output::updating_cache();
        fs::create_dir_all(&self.cache_thumbs_dir)?;

        for entry in WalkDir::new(&self.output_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let is_thumb = matches!(
                entry.path().extension().and_then(|e| e.to_str()),
                Some("jpg" | "jpeg" | "png")
            );
            if !is_thumb {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.output_dir) else {
                continue;
            };
            let target = self.cache_thumbs_dir.join(rel);
            if !target.exists() {
                copy_into(entry.path(), &target)?;
            }
        }

        let mut merged: SizeMap = metadata::read_size_file(&self.cache_metadata_path);
        merged.extend(metadata::read_size_file(&self.output_metadata_path));
        metadata::write_size_file(&self.cache_metadata_path, &merged)
    }
}

fn extract_archive(archive_path: &std::path::Path, into: &std::path::Path) -> io::Result<()> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
    archive.extract(into).map_err(io::Error::other)
}
