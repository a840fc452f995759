//! Blocking HTTP access behind the [`Remote`] trait.
//!
//! Every download in the pipeline — source images, published size
//! metadata, remote-cached thumbnails, the archived cache snapshot —
//! goes through [`Remote::fetch_bytes`]. The production implementation
//! is [`HttpRemote`] over `reqwest::blocking`; tests substitute
//! [`tests::MockRemote`] to run the whole pipeline offline.
//!
//! Workers block on these calls; concurrency comes from the rayon pool,
//! not from the HTTP client.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        source: serde_json::Error,
    },
}

/// Remote byte source. `Sync` so a single instance is shared across the
/// worker pool.
pub trait Remote: Sync {
    /// Fetch a URL's body. Non-success statuses are errors.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Production remote over a shared blocking reqwest client.
pub struct HttpRemote {
    client: reqwest::blocking::Client,
}

impl HttpRemote {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl Remote for HttpRemote {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Suffix counter making concurrent part files distinct within a run.
static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Download a URL into a file, creating parent directories.
///
/// The bytes land in a uniquely named part file first and are renamed
/// into place, so a concurrent reader of the target path never sees a
/// partial download — workers sharing a source URL may download it
/// twice, but both end up with complete identical files.
pub fn download_file(remote: &dyn Remote, url: &str, file: &Path) -> Result<(), FetchError> {
    let bytes = remote.fetch_bytes(url)?;
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    let part = file.with_extension(format!("part{}", PART_COUNTER.fetch_add(1, Ordering::Relaxed)));
    fs::write(&part, bytes)?;
    fs::rename(&part, file)?;
    Ok(())
}

/// Fetch and deserialize a JSON document.
pub fn fetch_json<T: serde::de::DeserializeOwned>(
    remote: &dyn Remote,
    url: &str,
) -> Result<T, FetchError> {
    let bytes = remote.fetch_bytes(url)?;
    serde_json::from_slice(&bytes).map_err(|source| FetchError::Json {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mock remote serving a fixed URL→bytes map and recording every
    /// request. Uses Mutex (not RefCell) so it is Sync and works across
    /// the rayon pool.
    #[derive(Default)]
    pub struct MockRemote {
        responses: Mutex<HashMap<String, Vec<u8>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockRemote {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, url: &str, bytes: Vec<u8>) {
            self.responses.lock().unwrap().insert(url.to_string(), bytes);
        }

        /// Every URL requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Remote for MockRemote {
        fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    #[test]
    fn mock_serves_inserted_bytes() {
        let remote = MockRemote::new();
        remote.insert("https://example.org/a", b"hello".to_vec());
        assert_eq!(
            remote.fetch_bytes("https://example.org/a").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn mock_misses_are_404() {
        let remote = MockRemote::new();
        match remote.fetch_bytes("https://example.org/missing") {
            Err(FetchError::Status { status: 404, .. }) => {}
            other => panic!("expected 404, got {other:?}"),
        }
        assert_eq!(remote.requests(), vec!["https://example.org/missing"]);
    }

    #[test]
    fn download_file_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let remote = MockRemote::new();
        remote.insert("https://example.org/x.bin", vec![1, 2, 3]);

        let target = tmp.path().join("nested/dir/x.bin");
        download_file(&remote, "https://example.org/x.bin", &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn download_file_leaves_no_part_files() {
        let tmp = TempDir::new().unwrap();
        let remote = MockRemote::new();
        remote.insert("https://example.org/x.png", vec![9; 64]);

        let target = tmp.path().join("x.png");
        download_file(&remote, "https://example.org/x.png", &target).unwrap();
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.png"]);
    }

    #[test]
    fn concurrent_downloads_of_one_url_both_complete() {
        let tmp = TempDir::new().unwrap();
        let remote = MockRemote::new();
        let body = vec![7u8; 4096];
        remote.insert("https://example.org/shared.png", body.clone());
        let target = tmp.path().join("images/shared.png");

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    download_file(&remote, "https://example.org/shared.png", &target).unwrap();
                });
            }
        });

        // Whichever rename lands last, the target is a complete file and
        // no part files survive.
        assert_eq!(fs::read(&target).unwrap(), body);
        let leftovers = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains("part")
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn fetch_json_deserializes() {
        let remote = MockRemote::new();
        remote.insert(
            "https://example.org/meta.json",
            br#"{"a": {"width": 10, "height": 20}}"#.to_vec(),
        );

        let parsed: HashMap<String, crate::catalog::ImageSize> =
            fetch_json(&remote, "https://example.org/meta.json").unwrap();
        assert_eq!(parsed["a"].width, 10);
        assert_eq!(parsed["a"].height, 20);
    }

    #[test]
    fn fetch_json_rejects_bad_payload() {
        let remote = MockRemote::new();
        remote.insert("https://example.org/meta.json", b"not json".to_vec());

        let parsed: Result<HashMap<String, u32>, _> =
            fetch_json(&remote, "https://example.org/meta.json");
        assert!(matches!(parsed, Err(FetchError::Json { .. })));
    }
}
