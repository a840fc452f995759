//! Image processing — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** (JPEG, PNG, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | **Normalize** (bit depth, alpha, gray) | [`codec::normalize`] |
//! | **Crop / Resize** | `imageops::crop_imm` + Lanczos3 |
//! | **Encode** | PNG max compression / JPEG quality 90 (60 small) |
//!
//! The module is split into:
//! - **Geometry**: pure functions for crop/resize math (unit testable)
//! - **Codec**: normalization, pixel work, and byte-level encoding

pub mod codec;
pub mod geometry;

pub use codec::{CodecError, Raster, decode};
pub use geometry::{DisplayGeometry, Region, cover_crop, lr_crop, small_crop, sr_crop};
