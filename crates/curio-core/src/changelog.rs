//! Release changelog cache
//!
//! Fetches the remote release list, compares it with the locally cached copy
//! to detect a new release, and stores the fetched list as the new cache.
//! When the fetch fails the cached list is served instead.
//!
//! The remote ordering (newest first) is trusted as-is: only element 0 of
//! each list is compared.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::ChangelogEntry;
use crate::storage::persistence::{read_json, write_json};
use crate::storage::{PathLocks, StoreError, StoreResult};

/// User agent sent with the release request
const USER_AGENT: &str = concat!("curio/", env!("CARGO_PKG_VERSION"));

/// Where release listings come from
pub trait ReleaseSource: Send + Sync {
    /// Human-readable location, for logs and errors
    fn location(&self) -> String;

    /// Fetch the current release list, newest first
    fn fetch(&self) -> StoreResult<Vec<ChangelogEntry>>;
}

/// Release listing served over HTTP as a JSON array
pub struct HttpReleaseSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpReleaseSource {
    /// Create a source for `url`; every request gives up after `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> StoreResult<Self> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Remote {
                url: url.clone(),
                details: e.to_string(),
            })?;
        Ok(Self { url, client })
    }

    fn remote_error(&self, details: impl Into<String>) -> StoreError {
        StoreError::Remote {
            url: self.url.clone(),
            details: details.into(),
        }
    }
}

impl ReleaseSource for HttpReleaseSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> StoreResult<Vec<ChangelogEntry>> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| self.remote_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.remote_error(format!("unexpected status {}", status)));
        }

        let body = response
            .text()
            .map_err(|e| self.remote_error(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| self.remote_error(format!("invalid release listing: {}", e)))
    }
}

/// Stand-in used when no `changelog_url` is configured; every fetch fails
#[derive(Debug, Default)]
pub struct UnconfiguredSource;

impl ReleaseSource for UnconfiguredSource {
    fn location(&self) -> String {
        "(no changelog_url configured)".to_string()
    }

    fn fetch(&self) -> StoreResult<Vec<ChangelogEntry>> {
        Err(StoreError::Remote {
            url: self.location(),
            details: "set changelog_url to enable release checks".to_string(),
        })
    }
}

/// Result of a refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangelogRefresh {
    pub entries: Vec<ChangelogEntry>,
    pub new_release: bool,
}

/// Decide whether `fresh` announces a release `previous` did not have
///
/// With a non-empty previous list, the newest `published_at` values are
/// compared. With an empty previous list, any non-empty fetch is new. An
/// empty fetch never announces anything.
pub fn is_new_release(previous: &[ChangelogEntry], fresh: &[ChangelogEntry]) -> bool {
    let Some(newest) = fresh.first() else {
        return false;
    };
    match previous.first() {
        Some(last_known) => newest.published_at() != last_known.published_at(),
        None => true,
    }
}

/// Cached release list backed by a remote source
pub struct ChangelogCache {
    path: PathBuf,
    source: Box<dyn ReleaseSource>,
    locks: Arc<PathLocks>,
}

impl ChangelogCache {
    pub fn new(
        path: impl Into<PathBuf>,
        source: Box<dyn ReleaseSource>,
        locks: Arc<PathLocks>,
    ) -> Self {
        Self {
            path: path.into(),
            source,
            locks,
        }
    }

    /// Create a cache at the configured path, fetching from `changelog_url`
    pub fn from_config(config: &Config, locks: Arc<PathLocks>) -> StoreResult<Self> {
        let source: Box<dyn ReleaseSource> = match &config.changelog_url {
            Some(url) => Box::new(HttpReleaseSource::new(url.clone(), config.fetch_timeout())?),
            None => Box::new(UnconfiguredSource),
        };
        Ok(Self::new(config.changelog_path(), source, locks))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source_location(&self) -> String {
        self.source.location()
    }

    /// Read the cached list without contacting the remote
    pub fn cached(&self) -> StoreResult<Vec<ChangelogEntry>> {
        read_json(&self.path)
    }

    /// Fetch the remote list, update the cache and flag new releases
    ///
    /// A fetched list is returned even when the cache cannot be written.
    ///
    /// On a failed fetch the cached list is returned with `new_release`
    /// false and the cache file is left alone. Only when that cache cannot
    /// be read either is the fetch error returned.
    pub fn refresh(&self) -> StoreResult<ChangelogRefresh> {
        let previous = match self.cached() {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "no usable changelog cache");
                Vec::new()
            }
        };

        match self.source.fetch() {
            Ok(fresh) => {
                let new_release = is_new_release(&previous, &fresh);
                if let Err(err) = self
                    .locks
                    .with_lock(&self.path, || write_json(&self.path, &fresh))
                {
                    warn!(
                        path = %self.path.display(),
                        error = %err,
                        "could not update changelog cache"
                    );
                }
                if new_release {
                    info!(
                        published_at = ?fresh.first().and_then(|e| e.published_at()),
                        "new release available"
                    );
                }
                debug!(entries = fresh.len(), "changelog cache updated");
                Ok(ChangelogRefresh {
                    entries: fresh,
                    new_release,
                })
            }
            Err(fetch_err) => {
                warn!(
                    source = %self.source.location(),
                    error = %fetch_err,
                    "changelog fetch failed, serving cache"
                );
                match self.cached() {
                    Ok(entries) => Ok(ChangelogRefresh {
                        entries,
                        new_release: false,
                    }),
                    Err(cache_err) => {
                        debug!(error = %cache_err, "changelog cache unavailable");
                        Err(fetch_err)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ErrorKind;
    use serde_json::json;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Canned source that counts its calls
    struct FakeSource {
        result: Result<Vec<ChangelogEntry>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl ReleaseSource for FakeSource {
        fn location(&self) -> String {
            "fake://releases".to_string()
        }

        fn fetch(&self) -> StoreResult<Vec<ChangelogEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(|details| StoreError::Remote {
                url: self.location(),
                details,
            })
        }
    }

    fn release(tag: &str, published_at: &str) -> ChangelogEntry {
        ChangelogEntry(json!({"tag_name": tag, "published_at": published_at, "body": "notes"}))
    }

    fn cache_with(
        temp_dir: &TempDir,
        result: Result<Vec<ChangelogEntry>, String>,
    ) -> (ChangelogCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = FakeSource {
            result,
            calls: calls.clone(),
        };
        let cache = ChangelogCache::new(
            temp_dir.path().join("changelog_cache.json"),
            Box::new(source),
            Arc::new(PathLocks::new()),
        );
        (cache, calls)
    }

    fn seed(cache: &ChangelogCache, entries: &[ChangelogEntry]) {
        fs::write(cache.path(), serde_json::to_vec(entries).unwrap()).unwrap();
    }

    #[test]
    fn test_is_new_release_rules() {
        let t0 = vec![release("v1", "2024-01-01T00:00:00Z")];
        let t1 = vec![
            release("v2", "2024-02-01T00:00:00Z"),
            release("v1", "2024-01-01T00:00:00Z"),
        ];

        assert!(is_new_release(&t0, &t1));
        assert!(!is_new_release(&t0, &t0));
        assert!(is_new_release(&[], &t0));
        assert!(!is_new_release(&[], &[]));
        assert!(!is_new_release(&t0, &[]));
    }

    #[test]
    fn test_refresh_detects_new_release_and_overwrites_cache() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = vec![
            release("v2", "2024-02-01T00:00:00Z"),
            release("v1", "2024-01-01T00:00:00Z"),
        ];
        let (cache, calls) = cache_with(&temp_dir, Ok(fresh.clone()));
        seed(&cache, &[release("v1", "2024-01-01T00:00:00Z")]);

        let result = cache.refresh().unwrap();

        assert!(result.new_release);
        assert_eq!(result.entries, fresh);
        assert_eq!(cache.cached().unwrap(), fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_same_release_still_rewrites_cache() {
        let temp_dir = TempDir::new().unwrap();
        let mut fresh_first = release("v1", "2024-01-01T00:00:00Z");
        fresh_first.0["body"] = json!("edited notes");
        let fresh = vec![fresh_first];
        let (cache, _) = cache_with(&temp_dir, Ok(fresh.clone()));
        seed(&cache, &[release("v1", "2024-01-01T00:00:00Z")]);

        let result = cache.refresh().unwrap();

        assert!(!result.new_release);
        assert_eq!(cache.cached().unwrap(), fresh);
    }

    #[test]
    fn test_refresh_without_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Ok(vec![release("v1", "2024-01-01T00:00:00Z")]));

        let result = cache.refresh().unwrap();
        assert!(result.new_release);
        assert!(cache.path().exists());
    }

    #[test]
    fn test_refresh_empty_everything_is_not_new() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Ok(Vec::new()));

        let result = cache.refresh().unwrap();
        assert!(!result.new_release);
        assert!(result.entries.is_empty());
        assert_eq!(cache.cached().unwrap(), Vec::<ChangelogEntry>::new());
    }

    #[test]
    fn test_corrupt_cache_counts_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Ok(vec![release("v1", "2024-01-01T00:00:00Z")]));
        fs::write(cache.path(), "[{\"published_at\":").unwrap();

        let result = cache.refresh().unwrap();
        assert!(result.new_release);
        assert_eq!(cache.cached().unwrap().len(), 1);
    }

    #[test]
    fn test_unwritable_cache_still_returns_fresh_entries() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = vec![release("v2", "2024-02-01T00:00:00Z")];
        let (cache, _) = cache_with(&temp_dir, Ok(fresh.clone()));
        fs::create_dir(cache.path()).unwrap();
        fs::write(cache.path().join("keep"), "x").unwrap();

        let result = cache.refresh().unwrap();

        assert!(result.new_release);
        assert_eq!(result.entries, fresh);
        assert!(cache.path().is_dir());
    }

    #[test]
    fn test_failed_fetch_serves_cache_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Err("connection refused".to_string()));
        let cached = vec![release("v1", "2024-01-01T00:00:00Z")];
        seed(&cache, &cached);
        let before = fs::read(cache.path()).unwrap();

        let result = cache.refresh().unwrap();

        assert!(!result.new_release);
        assert_eq!(result.entries, cached);
        assert_eq!(fs::read(cache.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_fetch_without_cache_surfaces_fetch_error() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Err("timed out".to_string()));

        let err = cache.refresh().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(err.to_string().contains("timed out"));
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_failed_fetch_with_corrupt_cache_surfaces_fetch_error() {
        let temp_dir = TempDir::new().unwrap();
        let (cache, _) = cache_with(&temp_dir, Err("503".to_string()));
        fs::write(cache.path(), "garbage").unwrap();

        let err = cache.refresh().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
    }

    #[test]
    fn test_unconfigured_source_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path());
        let cache = ChangelogCache::from_config(&config, Arc::new(PathLocks::new())).unwrap();

        assert_eq!(cache.refresh().unwrap_err().kind(), ErrorKind::RemoteFailure);

        seed(&cache, &[release("v1", "2024-01-01T00:00:00Z")]);
        let result = cache.refresh().unwrap();
        assert_eq!(result.entries.len(), 1);
        assert!(!result.new_release);
    }

    /// Serve one canned HTTP response on a local port
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/releases", addr)
    }

    #[test]
    fn test_http_source_success() {
        let url = serve_once(
            "200 OK",
            r#"[{"tag_name":"v3","published_at":"2024-03-01T00:00:00Z"}]"#,
        );
        let source = HttpReleaseSource::new(url, Duration::from_secs(5)).unwrap();

        let entries = source.fetch().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title(), Some("v3"));
    }

    #[test]
    fn test_http_source_error_status() {
        let url = serve_once("500 Internal Server Error", r#"{"message":"boom"}"#);
        let source = HttpReleaseSource::new(url, Duration::from_secs(5)).unwrap();

        let err = source.fetch().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_http_source_unexpected_body() {
        let url = serve_once("200 OK", r#"{"message":"rate limited"}"#);
        let source = HttpReleaseSource::new(url, Duration::from_secs(5)).unwrap();

        let err = source.fetch().unwrap_err();
        assert!(err.to_string().contains("invalid release listing"));
    }
}
