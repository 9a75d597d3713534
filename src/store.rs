use crate::ports::{self, TimeProvider};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use std::collections::HashMap;
use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl Entry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at
            .is_none_or(|expires_at| expires_at > now.unix_timestamp())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Entries(HashMap<String, Entry>);

impl Entries {
    fn get(&self, key: &str, now: OffsetDateTime) -> Option<String> {
        self.0
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn put(&mut self, key: &str, value: String, ttl: Option<Duration>, now: OffsetDateTime) {
        let expires_at = ttl.map(|ttl| {
            let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            now.unix_timestamp().saturating_add(seconds)
        });
        self.0.insert(key.to_string(), Entry { value, expires_at });
    }

    fn delete(&mut self, key: &str, now: OffsetDateTime) -> bool {
        self.0
            .remove(key)
            .is_some_and(|entry| entry.is_live(now))
    }

    fn purge_expired(&mut self, now: OffsetDateTime) {
        self.0.retain(|_, entry| entry.is_live(now));
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Clone)]
pub struct MemoryStore<T> {
    entries: Arc<std::sync::Mutex<Entries>>,
    time: T,
}

impl<T: TimeProvider> MemoryStore<T> {
    pub fn new(time: T) -> Self {
        Self {
            entries: Arc::new(std::sync::Mutex::new(Entries::default())),
            time,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: TimeProvider> ports::KeyValueStore for MemoryStore<T> {
    type GetFut<'a>
        = std::future::Ready<Result<Option<String>, StoreError>>
    where
        Self: 'a;
    type PutFut<'a>
        = std::future::Ready<Result<(), StoreError>>
    where
        Self: 'a;
    type DeleteFut<'a>
        = std::future::Ready<Result<bool, StoreError>>
    where
        Self: 'a;

    fn get<'a>(&'a self, key: &'a str) -> Self::GetFut<'a> {
        let now = self.time.now();
        std::future::ready(Ok(self.lock().get(key, now)))
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> Self::PutFut<'a> {
        let now = self.time.now();
        self.lock().put(key, value, ttl, now);
        std::future::ready(Ok(()))
    }

    fn delete<'a>(&'a self, key: &'a str) -> Self::DeleteFut<'a> {
        let now = self.time.now();
        std::future::ready(Ok(self.lock().delete(key, now)))
    }
}

/// Store persisted as a single JSON document.
///
/// Every mutation re-reads the file, applies the change to that copy and
/// rewrites the whole file through a temporary sibling and a rename. The
/// in-memory view only changes once the write succeeded. Mutations are
/// serialized within the process. Separate processes sharing one file can
/// still interleave between read and rename, losing one of two concurrent
/// writes; reads serve the snapshot from the last open or mutation.
#[derive(Clone)]
pub struct FileStore<T> {
    path: Arc<PathBuf>,
    entries: Arc<tokio::sync::Mutex<Entries>>,
    time: T,
}

impl<T: TimeProvider> FileStore<T> {
    pub async fn open(path: impl Into<PathBuf>, time: T) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = read_entries(&path).await?;
        tracing::debug!(path = %path.display(), entries = entries.0.len(), "store opened");

        Ok(Self {
            path: Arc::new(path),
            entries: Arc::new(tokio::sync::Mutex::new(entries)),
            time,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entries)?;
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.path.as_path()).await?;
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<Entries, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(Entries::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Entries::default()),
        Err(err) => Err(err.into()),
    }
}

impl<T: TimeProvider> ports::KeyValueStore for FileStore<T> {
    type GetFut<'a>
        = StoreFuture<'a, Option<String>>
    where
        Self: 'a;
    type PutFut<'a>
        = StoreFuture<'a, ()>
    where
        Self: 'a;
    type DeleteFut<'a>
        = StoreFuture<'a, bool>
    where
        Self: 'a;

    fn get<'a>(&'a self, key: &'a str) -> Self::GetFut<'a> {
        Box::pin(async move {
            let now = self.time.now();
            Ok(self.entries.lock().await.get(key, now))
        })
    }

    fn put<'a>(
        &'a self,
        key: &'a str,
        value: String,
        ttl: Option<Duration>,
    ) -> Self::PutFut<'a> {
        Box::pin(async move {
            let now = self.time.now();
            let mut entries = self.entries.lock().await;
            let mut next = read_entries(&self.path).await?;
            next.purge_expired(now);
            next.put(key, value, ttl, now);
            self.persist(&next).await?;
            *entries = next;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> Self::DeleteFut<'a> {
        Box::pin(async move {
            let now = self.time.now();
            let mut entries = self.entries.lock().await;
            let mut next = read_entries(&self.path).await?;
            let removed = next.delete(key, now);
            if removed {
                next.purge_expired(now);
                self.persist(&next).await?;
            }
            *entries = next;
            Ok(removed)
        })
    }
}
