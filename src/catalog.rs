//! Model record catalog store.
//!
//! The catalog is a directory of JSON files, one per model record, with
//! the filename stem as the record id. Records are loaded at the start of
//! a run, mutated in place by the orchestrator (only the thumbnail
//! fields), and written back to their source files.
//!
//! ## Verbatim persistence
//!
//! Record files carry many fields this pipeline never looks at (authors,
//! license, tags, ...), and they live in version control — a rewrite that
//! churns key order shows up as a diff on every record. [`save_record`]
//! therefore re-reads the source file as a raw `serde_json::Value`
//! (`preserve_order` keeps object keys in file order) and patches only
//! the thumbnail fields in place; everything else round-trips untouched,
//! key order included. The typed structs keep a flattened map of leftover
//! fields too, for in-memory completeness. Records are written with
//! 4-space indentation, matching how the catalog files are formatted by
//! the rest of the tooling.
//!
//! ## Image and thumbnail variants
//!
//! [`ImageRef`] and [`Thumbnail`] are tagged sum types
//! (`"type": "paired" | "standalone"`). A paired image is an LR/SR pair
//! demonstrating an upscaling model; a standalone image is a single
//! representative image. The thumbnail mirrors the shape of the record's
//! first image and, for pairs, carries the resolved pixel size of each
//! side so the site can co-register them without probing.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in {file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
}

/// Record identifier, derived from the catalog filename stem.
pub type ModelId = String;

/// Pixel dimensions of an image or thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A single model record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub name: String,
    /// Declared upscaling factor. Pairs do not always honor it; the
    /// orchestrator computes the real pair scale from resolved sizes.
    pub scale: u32,
    pub images: Vec<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    /// Fields this pipeline does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A source image reference. Identity is the URL string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageRef {
    Paired(PairedImage),
    Standalone(StandaloneImage),
}

/// An LR/SR pair demonstrating a model's upscaling effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedImage {
    #[serde(rename = "LR")]
    pub lr: String,
    #[serde(rename = "SR")]
    pub sr: String,
    /// Small gallery thumbnail path, populated by the orchestrator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A single representative image with no paired counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandaloneImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ImageRef {
    /// URL used for the small gallery thumbnail: the LR side of a pair,
    /// or the sole URL of a standalone image.
    pub fn small_url(&self) -> &str {
        match self {
            ImageRef::Paired(pair) => &pair.lr,
            ImageRef::Standalone(image) => &image.url,
        }
    }

    pub fn set_thumbnail(&mut self, path: String) {
        match self {
            ImageRef::Paired(pair) => pair.thumbnail = Some(path),
            ImageRef::Standalone(image) => image.thumbnail = Some(path),
        }
    }
}

/// Derived main thumbnail, mirroring the record's first [`ImageRef`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Thumbnail {
    Paired(PairedThumbnail),
    Standalone(StandaloneThumbnail),
}

/// Paired main thumbnail: resolved paths plus the pixel size of each
/// side, so the site can co-register LR over SR without probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedThumbnail {
    #[serde(rename = "LR")]
    pub lr: String,
    #[serde(rename = "SR")]
    pub sr: String,
    #[serde(rename = "LRSize", skip_serializing_if = "Option::is_none")]
    pub lr_size: Option<ImageSize>,
    #[serde(rename = "SRSize", skip_serializing_if = "Option::is_none")]
    pub sr_size: Option<ImageSize>,
}

/// Standalone main thumbnail: a single cover image path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandaloneThumbnail {
    pub url: String,
}

/// Load every record in the catalog directory, keyed and ordered by id.
pub fn load_catalog(models_dir: &Path) -> Result<BTreeMap<ModelId, ModelRecord>, CatalogError> {
    let mut records = BTreeMap::new();
    for entry in fs::read_dir(models_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path)?;
        let record: ModelRecord =
            serde_json::from_str(&content).map_err(|source| CatalogError::Json {
                file: path.display().to_string(),
                source,
            })?;
        records.insert(stem.to_string(), record);
    }
    Ok(records)
}

/// Write a record back to its source file with 4-space indentation.
///
/// The file is re-read as a raw JSON value and only the thumbnail fields
/// are patched in, so key order and unrecognized content come back
/// verbatim. A pre-existing `thumbnail` key is replaced in place; a new
/// one lands at the end of its object.
pub fn save_record(
    models_dir: &Path,
    id: &ModelId,
    record: &ModelRecord,
) -> Result<(), CatalogError> {
    let path = models_dir.join(format!("{id}.json"));
    let json_err = |source| CatalogError::Json {
        file: path.display().to_string(),
        source,
    };

    let content = fs::read_to_string(&path)?;
    let mut value: serde_json::Value = serde_json::from_str(&content).map_err(json_err)?;
    patch_thumbnails(&mut value, record).map_err(json_err)?;

    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer).map_err(json_err)?;
    buffer.push(b'\n');
    fs::write(&path, buffer)?;
    Ok(())
}

/// Copy the record's thumbnail fields onto the raw JSON value, leaving
/// every other key untouched.
fn patch_thumbnails(
    value: &mut serde_json::Value,
    record: &ModelRecord,
) -> Result<(), serde_json::Error> {
    if let (Some(obj), Some(thumb)) = (value.as_object_mut(), &record.thumbnail) {
        obj.insert("thumbnail".to_string(), serde_json::to_value(thumb)?);
    }
    let images = value
        .get_mut("images")
        .and_then(|v| v.as_array_mut())
        .into_iter()
        .flatten();
    for (image_value, image) in images.zip(&record.images) {
        let thumb = match image {
            ImageRef::Paired(pair) => &pair.thumbnail,
            ImageRef::Standalone(standalone) => &standalone.thumbnail,
        };
        if let (Some(obj), Some(path)) = (image_value.as_object_mut(), thumb) {
            obj.insert(
                "thumbnail".to_string(),
                serde_json::Value::String(path.clone()),
            );
        }
    }
    Ok(())
}
