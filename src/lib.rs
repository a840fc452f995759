//! # Model Thumbs
//!
//! Derives, caches, and publishes fixed-size preview thumbnails for a
//! catalog of model records. Each record references one or more
//! full-resolution source images — either a low-resolution/super-resolution
//! pair demonstrating an upscaling model, or a standalone representative
//! image — and the pipeline produces a prominent main thumbnail plus a
//! compact gallery thumbnail per image.
//!
//! # Architecture: Generate Pipeline
//!
//! A single run moves through five phases:
//!
//! ```text
//! 1. Restore   fetch + unpack the archived thumbnail cache (if absent)
//! 2. Load      data/models/*.json  →  catalog records
//! 3. Resolve   every distinct image URL → pixel dimensions
//! 4. Fan-out   worker pool derives thumbnails per record, writes records back
//! 5. Update    fold new output into the persisted cache, merge size metadata
//! ```
//!
//! Phases 1–3 and 5 are single-threaded; phase 4 runs on a fixed-size
//! rayon pool over an immutable URL→metadata snapshot, so no locking is
//! needed anywhere.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `thumbs.toml` loading — paths, display-box constants, quality, remote endpoints |
//! | [`catalog`] | Model record JSON store — tagged image/thumbnail types, unknown-field-preserving persistence |
//! | [`imaging`] | Pure crop/resize geometry and the normalizing 8-bit codec |
//! | [`naming`] | Content-addressed thumbnail names (SHA-256 of operation + parameters + URL) |
//! | [`fetch`] | Blocking HTTP access behind the [`fetch::Remote`] trait |
//! | [`cache`] | Three-tier thumbnail resolution and start/end cache synchronization |
//! | [`metadata`] | URL→size resolution with a layered size cache and download probe fallback |
//! | [`process`] | Per-record orchestration and the parallel batch executor |
//! | [`output`] | CLI output formatting — progress, warnings, summary |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Output
//!
//! Every thumbnail filename is a pure function of the operation kind, its
//! geometric parameters, and the source URL ([`naming`]). Identical
//! requests always map to the same name, which makes output idempotent
//! and lets three storage tiers — local output, the persisted local
//! cache, and the published remote cache — share files by name alone.
//!
//! ## Three-Tier Reuse Before Generation
//!
//! Decoding and re-encoding images is the expensive part of a run, and
//! most thumbnails were already produced by an earlier run somewhere.
//! [`cache::ThumbStore::resolve`] checks local output, then the persisted
//! cache directory, then the published remote cache; only a miss on all
//! three reaches the codec. Errors in the lower tiers are misses, never
//! failures.
//!
//! ## Drop-and-Warn Error Discipline
//!
//! A catalog references images on third-party hosts, so individual
//! sources disappear or serve corrupt bytes routinely. A URL that cannot
//! be fetched or decoded is dropped from the working set with a warning
//! and every thumbnail field depending on it is skipped; a failure inside
//! one record's orchestration is caught, warned, and counted without
//! aborting the batch. Only setup failures (unreadable catalog, broken
//! output directory) end the run.
//!
//! ## Explicit Configuration, No Globals
//!
//! Filesystem layout, display-box constants, DPI factor, and quality
//! settings all live in [`config::PipelineConfig`] and are passed into
//! every component. The display constants are measured from the website's
//! model card, so they are data, not code.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod imaging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod process;
