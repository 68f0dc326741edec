//! Content-addressed log cache.
//!
//! Logs are keyed by a hash of their URL, not of their content: the
//! fetch cost is what is amortized, and CI logs are immutable once
//! written, so a cached entry is never re-validated. Entries are
//! written under a temporary name and renamed once complete, so a
//! partially written log is never served.

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct LogCache {
    dir: PathBuf,
    client: reqwest::Client,
}

impl LogCache {
    pub fn new(dir: PathBuf) -> Self {
        LogCache {
            dir,
            client: reqwest::Client::new(),
        }
    }

    /// Cache identity of a log URL (SHA-256 hex of the URL string).
    pub fn log_id(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Path a given URL's entry would live at.
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(Self::log_id(url))
    }

    /// Return the local path for a log, fetching it if absent.
    ///
    /// A non-200 response or network failure leaves no cache entry, so
    /// the next cycle retries the fetch.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let path = self.entry_path(url);
        if tokio::fs::try_exists(&path).await? {
            debug!(url, path = %path.display(), "log served from cache");
            return Ok(path);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching log {}", url))?;
        if !response.status().is_success() {
            bail!("fetching log {}: HTTP {}", url, response.status());
        }
        let body = response
            .bytes()
            .await
            .with_context(|| format!("reading log body {}", url))?;

        // Decompress before finalizing so the cached artifact is always
        // plain text.
        let content = decode_body(url, &body)?;

        let temp = path.with_extension("part");
        tokio::fs::write(&temp, &content)
            .await
            .with_context(|| format!("writing cache entry {}", temp.display()))?;
        tokio::fs::rename(&temp, &path)
            .await
            .with_context(|| format!("finalizing cache entry {}", path.display()))?;

        info!(url, path = %path.display(), bytes = content.len(), "log fetched into cache");
        Ok(path)
    }

    /// Read a cached log as text.
    pub async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading cached log {}", path.display()))
    }
}

/// Transparently decompress recognized compressed-log suffixes.
fn decode_body(url: &str, body: &[u8]) -> Result<Vec<u8>> {
    if url.ends_with(".gz") {
        let mut decoder = GzDecoder::new(body);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .with_context(|| format!("decompressing log {}", url))?;
        Ok(decompressed)
    } else {
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_log_id_is_stable_url_hash() {
        let a = LogCache::log_id("https://ci.example.org/log.txt");
        let b = LogCache::log_id("https://ci.example.org/log.txt");
        let c = LogCache::log_id("https://ci.example.org/other.txt");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_decode_body_passthrough() {
        let body = b"plain log text";
        let decoded = decode_body("https://x/log.txt", body).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn test_decode_body_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed log text").unwrap();
        let gz = encoder.finish().unwrap();

        let decoded = decode_body("https://x/log.txt.gz", &gz).unwrap();
        assert_eq!(decoded, b"compressed log text");
    }

    #[test]
    fn test_decode_body_bad_gzip_fails() {
        assert!(decode_body("https://x/log.txt.gz", b"not gzip").is_err());
    }

    #[tokio::test]
    async fn test_existing_entry_served_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LogCache::new(dir.path().to_path_buf());
        let url = "https://ci.example.org/seeded.txt";

        // Seed the entry; an unreachable URL proves no fetch happens.
        std::fs::write(cache.entry_path(url), "seeded content").unwrap();

        let path = cache.fetch(url).await.unwrap();
        assert_eq!(cache.read(&path).await.unwrap(), "seeded content");
    }

    #[tokio::test]
    async fn test_partial_entries_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LogCache::new(dir.path().to_path_buf());
        let url = "https://ci.invalid/never-fetched.txt";

        // A leftover temp file from a crashed write must not satisfy a
        // lookup under the final name.
        let temp = cache.entry_path(url).with_extension("part");
        std::fs::write(&temp, "partial").unwrap();

        // The entry is absent, so fetch attempts the (unreachable) URL
        // and fails rather than serving the partial file.
        assert!(cache.fetch(url).await.is_err());
        assert!(!cache.entry_path(url).exists());
    }
}
