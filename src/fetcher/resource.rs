//! Idempotent, cache-aware resource retrieval
//!
//! # Request Flow
//!
//! 1. Derive the cache filename from the reference
//! 2. Take the per-filename lock
//! 3. If the file exists, return it (cache hit, no network call)
//! 4. Otherwise GET the reference and stream the body into `.<name>.part`
//! 5. Rename the temp file into place and return the cached path
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 5xx, 408, 429 | Retry with backoff |
//! | Timeout, connection failure, broken body | Retry with backoff |
//! | Other HTTP errors | Fail immediately |
//! | Local write failure | Fail immediately, temp file removed |
//! | Attempts exhausted | Last error returned |

use crate::fetcher::filename::derive_filename;
use crate::fetcher::retry::RetryPolicy;
use crate::records::FetchedArtifact;
use crate::{FetchError, FetchResult};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Fetches resource references into an on-disk artifact cache
pub struct ResourceFetcher {
    client: Client,
    cache_dir: PathBuf,
    policy: RetryPolicy,
    deadline: Option<Duration>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ResourceFetcher {
    /// Creates a fetcher writing into `cache_dir`
    ///
    /// The directory is created if missing.
    pub fn new(
        client: Client,
        cache_dir: impl Into<PathBuf>,
        policy: RetryPolicy,
    ) -> std::io::Result<Self> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            client,
            cache_dir,
            policy,
            deadline: None,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Bounds the total time of one fetch, including backoff sleeps
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path a reference is cached at, if it yields a usable filename
    pub fn cache_path(&self, reference: &str) -> Option<PathBuf> {
        derive_filename(reference).map(|name| self.cache_dir.join(name))
    }

    /// Returns the local artifact for `reference`, retrieving it at most once
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedArtifact)` - `cached` is true when no network call was made
    /// * `Err(FetchError)` - The reference is unusable or retrieval failed
    pub async fn fetch(&self, reference: &str) -> FetchResult<FetchedArtifact> {
        let filename = derive_filename(reference)
            .ok_or_else(|| FetchError::InvalidReference(reference.to_string()))?;
        let path = self.cache_dir.join(&filename);

        let lock = self.lock_for(&filename);
        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(reference, path).await
        };
        self.release_lock(&filename, &lock);

        result
    }

    async fn fetch_locked(&self, reference: &str, path: PathBuf) -> FetchResult<FetchedArtifact> {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::trace!(url = reference, path = %path.display(), "Artifact cache hit");
            return Ok(FetchedArtifact {
                source_ref: reference.to_string(),
                local_path: path,
                cached: true,
                attempts: 0,
            });
        }

        let attempts = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.fetch_with_retry(reference, &path))
                .await
                .map_err(|_| FetchError::DeadlineExceeded {
                    url: reference.to_string(),
                })??,
            None => self.fetch_with_retry(reference, &path).await?,
        };

        tracing::debug!(url = reference, attempts, path = %path.display(), "Artifact stored");
        Ok(FetchedArtifact {
            source_ref: reference.to_string(),
            local_path: path,
            cached: false,
            attempts,
        })
    }

    fn lock_for(&self, filename: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(filename.to_string()).or_default().clone()
    }

    /// Drops the map entry once no other fetch holds the lock
    fn release_lock(&self, filename: &str, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by the caller
        if Arc::strong_count(lock) <= 2 {
            locks.remove(filename);
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    /// Returns the number of attempts used on success
    async fn fetch_with_retry(&self, url: &str, path: &Path) -> FetchResult<u32> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.download(url, path).await {
                Ok(()) => return Ok(attempt),
                Err(e) if e.is_transient() && self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient fetch failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::warn!(url, attempt, "Fetch failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// One streamed GET into the cache path
    async fn download(&self, url: &str, path: &Path) -> FetchResult<()> {
        let network = |source: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let partial = PartialFile::new(temp_path_for(path));
        let io_error = |source: std::io::Error| FetchError::Io {
            path: partial.path().display().to_string(),
            source,
        };

        let mut file = tokio::fs::File::create(partial.path())
            .await
            .map_err(io_error)?;

        while let Some(chunk) = response.chunk().await.map_err(network)? {
            file.write_all(&chunk).await.map_err(io_error)?;
        }
        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        tokio::fs::rename(partial.path(), path)
            .await
            .map_err(io_error)?;
        partial.commit();

        Ok(())
    }
}

/// `.<name>.part` beside the final path
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.part", name))
}

/// A file being written that is deleted unless committed
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "Failed to remove partial file: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/cache/images/adams.jpg"));
        assert_eq!(temp, PathBuf::from("/cache/images/.adams.jpg.part"));
    }

    #[test]
    fn test_partial_file_removed_unless_committed() {
        let dir = TempDir::new().unwrap();

        let dropped = dir.path().join("dropped.part");
        std::fs::write(&dropped, b"half").unwrap();
        drop(PartialFile::new(dropped.clone()));
        assert!(!dropped.exists());

        let kept = dir.path().join("kept.part");
        std::fs::write(&kept, b"whole").unwrap();
        PartialFile::new(kept.clone()).commit();
        assert!(kept.exists());
    }

    #[tokio::test]
    async fn test_invalid_reference_makes_no_request() {
        let dir = TempDir::new().unwrap();
        let fetcher =
            ResourceFetcher::new(Client::new(), dir.path(), RetryPolicy::default()).unwrap();

        let result = fetcher.fetch("https://img.example.edu/photos/").await;
        assert!(matches!(result, Err(FetchError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn test_existing_file_is_cache_hit() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("adams.jpg"), b"jpeg").unwrap();
        let fetcher =
            ResourceFetcher::new(Client::new(), dir.path(), RetryPolicy::default()).unwrap();

        // Unroutable host: a network call would fail
        let artifact = fetcher.fetch("http://127.0.0.1:9/adams.jpg").await.unwrap();
        assert!(artifact.cached);
        assert_eq!(artifact.attempts, 0);
        assert_eq!(artifact.local_path, dir.path().join("adams.jpg"));
        assert_eq!(fetcher.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_lock_kept_while_another_fetch_waits() {
        let dir = TempDir::new().unwrap();
        let fetcher =
            ResourceFetcher::new(Client::new(), dir.path(), RetryPolicy::default()).unwrap();

        let waiting = fetcher.lock_for("adams.jpg");
        let ours = fetcher.lock_for("adams.jpg");
        fetcher.release_lock("adams.jpg", &ours);
        assert_eq!(fetcher.pending_locks(), 1);

        drop(ours);
        fetcher.release_lock("adams.jpg", &waiting);
        assert_eq!(fetcher.pending_locks(), 0);
    }
}
