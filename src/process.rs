//! Thumbnail orchestration and the batch run.
//!
//! [`ThumbnailWriter`] produces one thumbnail at a time: derive the
//! content-addressed name, try the three cache tiers, and only on a full
//! miss load the source and do pixel work. [`process_record`] drives the
//! per-record state machine — main thumbnail from the first image, small
//! gallery thumbnails for every image — and writes the record back.
//! [`run`] is the whole pipeline: cache restore, catalog load, size
//! resolution, parallel fan-out, cache update, summary.
//!
//! ## Record state machine
//!
//! The main thumbnail is seeded with the original image URLs before any
//! generation is attempted. If generation succeeds the URLs are replaced
//! with `/thumbs/<name>` paths (and, for pairs, resolved pixel sizes);
//! if a source was dropped during size resolution the seeded originals
//! survive as a graceful fallback, so the site always has something to
//! show.
//!
//! ## Failure isolation
//!
//! Workers never abort the batch: a record that fails mid-processing is
//! warned about and counted, and every other record proceeds. One broken
//! source image must not hold hundreds of models hostage.

use crate::cache::{CacheSync, ThumbStore};
use crate::catalog::{
    self, CatalogError, ImageRef, ImageSize, ModelId, ModelRecord, PairedThumbnail,
    StandaloneThumbnail, Thumbnail,
};
use crate::config::{PipelineConfig, QualityConfig};
use crate::fetch::Remote;
use crate::imaging::{
    CodecError, DisplayGeometry, Region, cover_crop, lr_crop, small_crop, sr_crop,
};
use crate::metadata::{self, ImageMetadata, ProbeError};
use crate::naming;
use crate::output::{self, RunStats};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// One generated (or cache-resolved) thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailResult {
    /// Content-addressed name, possibly namespaced (`small/...`).
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailResult {
    /// Site-facing path the record files reference.
    pub fn site_path(&self) -> String {
        format!("/thumbs/{}", self.name)
    }

    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Produces individual thumbnails. Shared read-only across the worker
/// pool; all state lives on disk behind the [`ThumbStore`].
pub struct ThumbnailWriter<'a> {
    store: &'a ThumbStore,
    remote: &'a dyn Remote,
    geom: DisplayGeometry,
    quality: QualityConfig,
    images_dir: PathBuf,
}

impl<'a> ThumbnailWriter<'a> {
    pub fn new(store: &'a ThumbStore, remote: &'a dyn Remote, config: &PipelineConfig) -> Self {
        Self {
            store,
            remote,
            geom: DisplayGeometry::from_config(&config.display),
            quality: config.quality,
            images_dir: config.paths.images_dir(),
        }
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geom
    }

    /// LR side of a paired thumbnail. Lossless PNG preserves the pixelated
    /// look of a genuinely low-resolution input; at scale 1 the sides are
    /// the same resolution and JPEG is fine.
    pub fn lr_thumbnail(
        &self,
        meta: &ImageMetadata,
        scale: u32,
        sr_style: bool,
    ) -> Result<ThumbnailResult, ProcessError> {
        let region = if sr_style {
            sr_crop(meta.size(), scale, &self.geom)
        } else {
            lr_crop(meta.size(), scale, &self.geom)
        };
        let ext = if scale == 1 { "jpg" } else { "png" };
        self.crop_thumbnail(meta, region, ext)
    }

    /// SR side of a paired thumbnail. Always JPEG.
    pub fn sr_thumbnail(
        &self,
        meta: &ImageMetadata,
        scale: u32,
    ) -> Result<ThumbnailResult, ProcessError> {
        let region = sr_crop(meta.size(), scale, &self.geom);
        self.crop_thumbnail(meta, region, "jpg")
    }

    /// Cover thumbnail for a standalone image: ratio-clamped crop, then a
    /// downscale to the display width cap.
    pub fn cover_thumbnail(&self, meta: &ImageMetadata) -> Result<ThumbnailResult, ProcessError> {
        let (crop_size, resize_size) = cover_crop(meta.size(), &self.geom);
        let name = naming::resize_name(crop_size, resize_size, &meta.url);
        if self.store.resolve(&name, self.remote) {
            return Ok(self.resolved(name, resize_size));
        }

        let raster = meta.load(&self.images_dir, self.remote)?;
        let region = centered(meta.size(), crop_size);
        let cropped = raster.crop(&region);
        let resized = if resize_size == crop_size {
            cropped
        } else {
            cropped.resize(resize_size)
        };
        let bytes = crate::imaging::codec::encode(&resized, &name, self.quality.jpeg)?;
        self.save_encoded(meta, &name, resize_size, bytes)?;
        Ok(self.resolved(name, resize_size))
    }

    /// Small gallery thumbnail: whole-image downscale, heavy compression.
    pub fn small_thumbnail(&self, meta: &ImageMetadata) -> Result<ThumbnailResult, ProcessError> {
        let resize_size = small_crop(meta.size(), &self.geom);
        let name = naming::small_name(resize_size, &meta.url);
        if self.store.resolve(&name, self.remote) {
            return Ok(self.resolved(name, resize_size));
        }

        let raster = meta.load(&self.images_dir, self.remote)?;
        let resized = if resize_size == meta.size() {
            raster
        } else {
            raster.resize(resize_size)
        };
        let bytes = crate::imaging::codec::encode(&resized, &name, self.quality.small_jpeg)?;
        self.save_encoded(meta, &name, resize_size, bytes)?;
        Ok(self.resolved(name, resize_size))
    }

    /// Plain crop thumbnail at full resolution.
    fn crop_thumbnail(
        &self,
        meta: &ImageMetadata,
        region: Region,
        ext: &str,
    ) -> Result<ThumbnailResult, ProcessError> {
        let name = naming::crop_name(&region, &meta.url, ext);
        if self.store.resolve(&name, self.remote) {
            return Ok(self.resolved(name, region.size()));
        }

        let raster = meta.load(&self.images_dir, self.remote)?;
        let cropped = raster.crop(&region);
        let bytes = crate::imaging::codec::encode(&cropped, &name, self.quality.jpeg)?;
        self.save_encoded(meta, &name, region.size(), bytes)?;
        Ok(self.resolved(name, region.size()))
    }

    fn resolved(&self, name: String, size: (u32, u32)) -> ThumbnailResult {
        ThumbnailResult {
            name,
            width: size.0,
            height: size.1,
        }
    }

    /// Save encoded bytes, reusing the source file verbatim when the
    /// thumbnail is a full-frame JPEG of a JPEG source and the fresh
    /// encode came out larger. Re-encoding such an image only loses
    /// quality and gains bytes.
    fn save_encoded(
        &self,
        meta: &ImageMetadata,
        name: &str,
        dims: (u32, u32),
        mut bytes: Vec<u8>,
    ) -> Result<(), ProcessError> {
        if name.ends_with(".jpg") && meta.ext() == "jpg" && dims == meta.size() {
            if let Ok(original) = fs::read(meta.local_path(&self.images_dir)) {
                if original.len() < bytes.len() {
                    bytes = original;
                }
            }
        }
        self.store.save(name, &bytes)?;
        Ok(())
    }
}

/// Centered region of `target` size within `source` (already clamped by
/// the geometry functions that produced `target`).
fn centered(source: (u32, u32), target: (u32, u32)) -> Region {
    Region {
        x: source.0.saturating_sub(target.0) / 2,
        y: source.1.saturating_sub(target.1) / 2,
        w: target.0.min(source.0),
        h: target.1.min(source.1),
    }
}

/// The real resolution ratio of a pair, from resolved sizes. Catalog
/// `scale` declarations are not trusted; pairs in the wild disagree with
/// them.
fn pair_scale(lr: &ImageMetadata, sr: &ImageMetadata) -> u32 {
    ((sr.width as f64 / lr.width as f64).round() as u32).max(1)
}

/// Process one record: derive its main and small thumbnails, update its
/// thumbnail fields, and write it back to the catalog.
pub fn process_record(
    id: &ModelId,
    record: &mut ModelRecord,
    images: &HashMap<String, ImageMetadata>,
    writer: &ThumbnailWriter,
    models_dir: &Path,
) -> Result<(), ProcessError> {
    if record.images.is_empty() {
        return Ok(());
    }
    output::processing(id);

    match &record.images[0] {
        ImageRef::Paired(pair) => {
            // Seed with originals so a dropped source still leaves the
            // site something to render.
            record.thumbnail = Some(Thumbnail::Paired(PairedThumbnail {
                lr: pair.lr.clone(),
                sr: pair.sr.clone(),
                lr_size: None,
                sr_size: None,
            }));
            if let (Some(lr_meta), Some(sr_meta)) = (images.get(&pair.lr), images.get(&pair.sr)) {
                let scale = pair_scale(lr_meta, sr_meta);
                // Equal sizes mean the LR side is an already-upscaled
                // comparison image; crop it exactly like the SR side so
                // the slider stays aligned.
                let sr_style = lr_meta.size() == sr_meta.size();
                let lr_thumb = writer.lr_thumbnail(lr_meta, scale, sr_style)?;
                let sr_thumb = writer.sr_thumbnail(sr_meta, scale)?;
                record.thumbnail = Some(Thumbnail::Paired(PairedThumbnail {
                    lr: lr_thumb.site_path(),
                    sr: sr_thumb.site_path(),
                    lr_size: Some(lr_thumb.size()),
                    sr_size: Some(sr_thumb.size()),
                }));
            }
        }
        ImageRef::Standalone(image) => {
            record.thumbnail = Some(Thumbnail::Standalone(StandaloneThumbnail {
                url: image.url.clone(),
            }));
            if let Some(meta) = images.get(&image.url) {
                let thumb = writer.cover_thumbnail(meta)?;
                record.thumbnail = Some(Thumbnail::Standalone(StandaloneThumbnail {
                    url: thumb.site_path(),
                }));
            }
        }
    }

    for image in &mut record.images {
        let url = image.small_url().to_string();
        if let Some(meta) = images.get(&url) {
            let thumb = writer.small_thumbnail(meta)?;
            image.set_thumbnail(thumb.site_path());
        }
    }

    catalog::save_record(models_dir, id, record)?;
    Ok(())
}

/// Run the whole pipeline.
pub fn run(config: &PipelineConfig, remote: &dyn Remote) -> Result<RunStats, PipelineError> {
    let start = Instant::now();

    let sync = CacheSync::new(config);
    sync.restore(remote);

    let catalog = catalog::load_catalog(&config.paths.models_dir)?;
    let size_cache = metadata::load_size_cache(config, remote);
    let (images, dropped) = metadata::resolve_images(&catalog, &size_cache, config, remote);
    metadata::save_size_metadata(&config.paths.output_metadata_path(), &images)?;

    let store = ThumbStore::new(config);
    let writer = ThumbnailWriter::new(&store, remote, config);
    let models_dir = config.paths.models_dir.as_path();

    let mut records: Vec<(ModelId, ModelRecord)> = catalog.into_iter().collect();
    let failed = AtomicUsize::new(0);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.processing.workers)
        .build()?;
    pool.install(|| {
        records.par_iter_mut().for_each(|(id, record)| {
            if let Err(err) = process_record(id, record, &images, &writer, models_dir) {
                output::warn_record_failed(id, &err);
                failed.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    sync.update()?;

    let stats = RunStats {
        records: records.len(),
        failed_records: failed.into_inner(),
        dropped_urls: dropped,
    };
    output::print_summary(&stats, start.elapsed());
    Ok(stats)
}
