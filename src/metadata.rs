//! Image metadata resolution.
//!
//! Before any thumbnail work starts, the pipeline maps every distinct
//! source URL referenced by the catalog to its pixel dimensions. Sizes
//! come from a layered cache — each layer overlays the previous, so the
//! freshest source wins:
//!
//! 1. published remote size-metadata JSON (lowest precedence)
//! 2. persisted local size cache
//! 3. current-run output file
//!
//! A URL found in no layer is **probed**: the source is downloaded,
//! decoded, and measured. A probe failure drops the URL from the working
//! set with a warning — every thumbnail depending on it is skipped for
//! this run, the rest of the record is unaffected.
//!
//! The resulting URL→[`ImageMetadata`] map is built once, before the
//! worker pool starts, and shared read-only across all workers: exactly
//! one entry per distinct URL.

use crate::catalog::{ImageRef, ImageSize, ModelId, ModelRecord};
use crate::config::PipelineConfig;
use crate::fetch::{self, FetchError, Remote};
use crate::imaging::{self, CodecError, Raster};
use crate::naming;
use crate::output;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// URL → size map, as stored in `_image-metadata.json` files.
pub type SizeMap = BTreeMap<String, ImageSize>;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Resolved metadata for one distinct source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ImageMetadata {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Normalized extension, e.g. `jpg` or `png`.
    pub fn ext(&self) -> String {
        naming::url_ext(&self.url)
    }

    /// On-disk location of the downloaded source within the image cache.
    pub fn local_path(&self, images_dir: &Path) -> PathBuf {
        images_dir.join(naming::source_cache_name(&self.url))
    }

    /// Load and normalize the source image, downloading it first if the
    /// local copy is absent.
    pub fn load(&self, images_dir: &Path, remote: &dyn Remote) -> Result<Raster, ProbeError> {
        let file = self.local_path(images_dir);
        if !file.exists() {
            output::downloading(&self.url);
            fetch::download_file(remote, &self.url, &file)?;
        }
        let bytes = fs::read(&file)?;
        Ok(imaging::decode(&bytes)?)
    }
}

/// Read a size-metadata JSON file; a missing or unparsable file is an
/// empty map.
pub fn read_size_file(path: &Path) -> SizeMap {
    let Ok(content) = fs::read_to_string(path) else {
        return SizeMap::new();
    };
    serde_json::from_str(&content).unwrap_or_default()
}

/// Write a size-metadata JSON file with 2-space indentation.
pub fn write_size_file(path: &Path, sizes: &SizeMap) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(sizes)?;
    json.push('\n');
    fs::write(path, json)
}

/// Load the layered size cache: remote catalog (lowest), persisted local
/// cache, current-run output (highest).
pub fn load_size_cache(config: &PipelineConfig, remote: &dyn Remote) -> SizeMap {
    let mut sizes = SizeMap::new();
    if let Some(url) = &config.remote.size_metadata_url {
        // An unreachable or malformed published document is an empty layer.
        if let Ok(published) = fetch::fetch_json::<SizeMap>(remote, url) {
            sizes.extend(published);
        }
    }
    sizes.extend(read_size_file(&config.paths.cache_metadata_path()));
    sizes.extend(read_size_file(&config.paths.output_metadata_path()));
    sizes
}

/// Collect every distinct URL the run needs: all small-granularity URLs
/// (the LR side for pairs) plus the first image's full URLs (both sides
/// if paired). Order follows the catalog; duplicates collapse.
pub fn collect_urls(catalog: &BTreeMap<ModelId, ModelRecord>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    let mut push = |url: &str, seen: &mut std::collections::HashSet<String>| {
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    };
    for record in catalog.values() {
        if record.images.is_empty() {
            continue;
        }
        for image in &record.images {
            push(image.small_url(), &mut seen);
        }
        match &record.images[0] {
            ImageRef::Paired(pair) => {
                push(&pair.lr, &mut seen);
                push(&pair.sr, &mut seen);
            }
            ImageRef::Standalone(image) => push(&image.url, &mut seen),
        }
    }
    urls
}

/// Resolve every collected URL to its dimensions. Cache hits are free;
/// misses probe the source. Probe failures drop the URL and warn.
///
/// Returns the working-set map and the number of dropped URLs.
pub fn resolve_images(
    catalog: &BTreeMap<ModelId, ModelRecord>,
    size_cache: &SizeMap,
    config: &PipelineConfig,
    remote: &dyn Remote,
) -> (HashMap<String, ImageMetadata>, usize) {
    let images_dir = config.paths.images_dir();
    let mut images = HashMap::new();
    let mut dropped = 0;

    for url in collect_urls(catalog) {
        if let Some(size) = size_cache.get(&url) {
            images.insert(
                url.clone(),
                ImageMetadata {
                    url,
                    width: size.width,
                    height: size.height,
                },
            );
            continue;
        }
        let mut meta = ImageMetadata {
            url: url.clone(),
            width: 0,
            height: 0,
        };
        match meta.load(&images_dir, remote) {
            Ok(raster) => {
                let (width, height) = raster.dimensions();
                meta.width = width;
                meta.height = height;
                images.insert(url, meta);
            }
            Err(err) => {
                output::warn_load_failed(&url, &err);
                dropped += 1;
            }
        }
    }
    (images, dropped)
}

/// Persist the resolved working set as the current run's size metadata.
pub fn save_size_metadata(
    path: &Path,
    images: &HashMap<String, ImageMetadata>,
) -> io::Result<()> {
    let sizes: SizeMap = images
        .values()
        .map(|meta| {
            (
                meta.url.clone(),
                ImageSize {
                    width: meta.width,
                    height: meta.height,
                },
            )
        })
        .collect();
    write_size_file(path, &sizes)
}
