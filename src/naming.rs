//! Content-addressed thumbnail naming.
//!
//! Every output filename is `sha256("{kind}:{params}:{url}")` truncated
//! to 24 hex characters plus the output extension. Small gallery
//! thumbnails additionally live under a `small/` namespace prefix.
//!
//! The payload strings are **frozen**: the published remote cache and the
//! persisted local cache both key files by these names, so any change to
//! the canonical parameter forms (see [`Region`]'s `Display` and
//! [`size_key`]) silently orphans every previously generated thumbnail.
//!
//! Reproducibility is total — same inputs, same name, forever. Uniqueness
//! is probabilistic; at 24 hex characters (96 bits) collisions are
//! negligible at catalog scale.

use crate::imaging::Region;
use sha2::{Digest, Sha256};

/// Truncation length of the hex digest in generated names.
const NAME_LEN: usize = 24;

/// SHA-256 of a string, as lowercase hex.
pub fn sha256_hex(s: &str) -> String {
    format!("{:x}", Sha256::digest(s.as_bytes()))
}

/// Canonical string form of a size tuple, e.g. `(357, 100)`.
pub fn size_key(size: (u32, u32)) -> String {
    format!("({}, {})", size.0, size.1)
}

/// Name for a plain crop thumbnail. `ext` is `"jpg"` or `"png"`.
pub fn crop_name(region: &Region, url: &str, ext: &str) -> String {
    let digest = sha256_hex(&format!("crop:{region}:{url}"));
    format!("{}.{}", &digest[..NAME_LEN], ext)
}

/// Name for a crop-then-resize thumbnail (always JPEG).
pub fn resize_name(crop_size: (u32, u32), resize_size: (u32, u32), url: &str) -> String {
    let digest = sha256_hex(&format!(
        "resize:{}:{}:{}",
        size_key(crop_size),
        size_key(resize_size),
        url
    ));
    format!("{}.jpg", &digest[..NAME_LEN])
}

/// Name for a small gallery thumbnail (always JPEG, `small/` namespace).
pub fn small_name(resize_size: (u32, u32), url: &str) -> String {
    let digest = sha256_hex(&format!("small:{}:{}", size_key(resize_size), url));
    format!("small/{}.jpg", &digest[..NAME_LEN])
}

/// Normalized file extension of a URL: the last dot segment, lowercased,
/// with `jpeg` folded into `jpg`.
pub fn url_ext(url: &str) -> String {
    url.rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
        .replace("jpeg", "jpg")
}

/// Stable local cache filename for a downloaded source image.
pub fn source_cache_name(url: &str) -> String {
    format!("{}.{}", &sha256_hex(url)[..16], url_ext(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region {
            x: 317,
            y: 252,
            w: 366,
            h: 296,
        }
    }

    #[test]
    fn names_are_deterministic() {
        let url = "https://example.org/image.png";
        assert_eq!(
            crop_name(&region(), url, "png"),
            crop_name(&region(), url, "png")
        );
        assert_eq!(
            resize_name((357, 100), (357, 100), url),
            resize_name((357, 100), (357, 100), url)
        );
        assert_eq!(small_name((72, 36), url), small_name((72, 36), url));
    }

    #[test]
    fn distinct_inputs_give_distinct_names() {
        let url = "https://example.org/image.png";
        let other = Region {
            x: 318,
            ..region()
        };
        assert_ne!(
            crop_name(&region(), url, "png"),
            crop_name(&other, url, "png")
        );
        assert_ne!(
            crop_name(&region(), url, "png"),
            crop_name(&region(), "https://example.org/b.png", "png")
        );
        assert_ne!(
            resize_name((100, 100), (72, 72), url),
            small_name((72, 72), url)
        );
    }

    #[test]
    fn crop_name_shape() {
        let name = crop_name(&region(), "https://example.org/a.png", "png");
        assert_eq!(name.len(), 24 + 4);
        assert!(name.ends_with(".png"));
        assert!(name[..24].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn small_name_lives_under_namespace() {
        let name = small_name((72, 36), "https://example.org/a.png");
        assert!(name.starts_with("small/"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 6 + 24 + 4);
    }

    #[test]
    fn crop_payload_uses_canonical_region_form() {
        // Pin the exact payload format the published cache was built with.
        let url = "https://example.org/a.png";
        let expected =
            sha256_hex(&format!("crop:Region(x=317, y=252, w=366, h=296):{url}"));
        let name = crop_name(&region(), url, "png");
        assert_eq!(&name[..24], &expected[..24]);
    }

    #[test]
    fn resize_payload_uses_tuple_form() {
        let url = "https://example.org/a.jpg";
        let expected = sha256_hex(&format!("resize:(549, 222):(357, 100):{url}"));
        let name = resize_name((549, 222), (357, 100), url);
        assert_eq!(&name[..24], &expected[..24]);
    }

    #[test]
    fn small_payload_uses_tuple_form() {
        let url = "https://example.org/a.png";
        let expected = sha256_hex(&format!("small:(72, 36):{url}"));
        let name = small_name((72, 36), url);
        assert_eq!(&name["small/".len()..name.len() - 4], &expected[..24]);
    }

    #[test]
    fn url_ext_normalizes_jpeg() {
        assert_eq!(url_ext("https://example.org/photo.JPEG"), "jpg");
        assert_eq!(url_ext("https://example.org/photo.jpg"), "jpg");
        assert_eq!(url_ext("https://example.org/photo.PNG"), "png");
        assert_eq!(url_ext("https://example.org/archive.tar.webp"), "webp");
    }

    #[test]
    fn source_cache_name_is_short_hash_plus_ext() {
        let name = source_cache_name("https://example.org/image.png");
        assert_eq!(name.len(), 16 + 4);
        assert!(name.ends_with(".png"));
        assert_eq!(name, source_cache_name("https://example.org/image.png"));
    }
}
