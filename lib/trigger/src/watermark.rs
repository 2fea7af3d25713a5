//! Per-trigger watermark persistence.
//!
//! A watermark is the greatest effective timestamp a trigger has seen. The
//! detector is its only writer, and it only ever moves forward.

use crate::error::WatermarkError;
use async_trait::async_trait;
use openmic_core::TriggerId;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Last-seen effective timestamp in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(i64);

impl Watermark {
    #[must_use]
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Returns the later of this watermark and `millis`.
    #[must_use]
    pub fn advance(self, millis: i64) -> Self {
        Self(self.0.max(millis))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage for trigger watermarks.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Loads the watermark for a trigger; `None` before its first poll.
    async fn load(&self, trigger_id: TriggerId) -> Result<Option<Watermark>, Report<WatermarkError>>;

    /// Stores the watermark for a trigger.
    async fn save(
        &self,
        trigger_id: TriggerId,
        watermark: Watermark,
    ) -> Result<(), Report<WatermarkError>>;
}

#[async_trait]
impl<T: WatermarkStore + ?Sized> WatermarkStore for Arc<T> {
    async fn load(&self, trigger_id: TriggerId) -> Result<Option<Watermark>, Report<WatermarkError>> {
        (**self).load(trigger_id).await
    }

    async fn save(
        &self,
        trigger_id: TriggerId,
        watermark: Watermark,
    ) -> Result<(), Report<WatermarkError>> {
        (**self).save(trigger_id, watermark).await
    }
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWatermarkStore {
    watermarks: Arc<RwLock<HashMap<TriggerId, Watermark>>>,
}

impl InMemoryWatermarkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for InMemoryWatermarkStore {
    async fn load(&self, trigger_id: TriggerId) -> Result<Option<Watermark>, Report<WatermarkError>> {
        Ok(self.watermarks.read().await.get(&trigger_id).copied())
    }

    async fn save(
        &self,
        trigger_id: TriggerId,
        watermark: Watermark,
    ) -> Result<(), Report<WatermarkError>> {
        self.watermarks.write().await.insert(trigger_id, watermark);
        Ok(())
    }
}

/// Store backed by one JSON file mapping trigger ids to watermarks.
///
/// Writes go to a uniquely named sibling temporary file that is renamed over
/// the original, so a crash mid-write leaves the previous state readable.
///
/// Saves are read-modify-write and serialized only within this instance:
/// share one store between the pollers of a process, and give each process
/// its own file.
#[derive(Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Watermark>, Report<WatermarkError>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(WatermarkError::StorageFailed {
                    reason: format!("reading {}: {e}", self.path.display()),
                }
                .into());
            }
        };

        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        serde_json::from_slice(&contents).map_err(|e| {
            WatermarkError::Corrupt {
                reason: format!("{}: {e}", self.path.display()),
            }
            .into()
        })
    }

    async fn write_all(
        &self,
        watermarks: &BTreeMap<String, Watermark>,
    ) -> Result<(), Report<WatermarkError>> {
        let json = serde_json::to_vec_pretty(watermarks).map_err(|e| {
            WatermarkError::StorageFailed {
                reason: e.to_string(),
            }
        })?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &json))
            .await
            .map_err(|e| WatermarkError::StorageFailed {
                reason: e.to_string(),
            })?
            .map_err(|e| WatermarkError::StorageFailed {
                reason: format!("writing {}: {e}", self.path.display()),
            })?;
        Ok(())
    }
}

/// Atomically replaces `path` with `contents` via a temp file in the same
/// directory.
fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self, trigger_id: TriggerId) -> Result<Option<Watermark>, Report<WatermarkError>> {
        let watermarks = self.read_all().await?;
        Ok(watermarks.get(&trigger_id.to_string()).copied())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn save(
        &self,
        trigger_id: TriggerId,
        watermark: Watermark,
    ) -> Result<(), Report<WatermarkError>> {
        let _guard = self.write_lock.lock().await;
        let mut watermarks = self.read_all().await?;
        watermarks.insert(trigger_id.to_string(), watermark);
        self.write_all(&watermarks).await
    }
}
