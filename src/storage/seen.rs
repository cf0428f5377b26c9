//! Seen-identity persistence.
//!
//! The store is a pretty-printed JSON array of identity strings, oldest
//! first:
//!
//! ```text
//! [
//!   "정기 회의록|2025-02-01",
//!   "웹툰 IP 공모전 안내|2025-03-02"
//! ]
//! ```
//!
//! Writes go to a sibling `.tmp` file that is renamed over the store, so a
//! crash mid-write leaves the previous contents intact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};

/// Identities in arrival order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SeenSet {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Mark an identity as seen now, moving it to the newest position.
    pub fn touch(&mut self, identity: impl Into<String>) {
        let identity = identity.into();
        if !self.index.insert(identity.clone()) {
            self.order.retain(|id| *id != identity);
        }
        self.order.push(identity);
    }

    /// Drop the oldest identities until at most `capacity` remain.
    pub fn truncate_oldest(&mut self, capacity: usize) {
        if self.order.len() <= capacity {
            return;
        }
        let excess = self.order.len() - capacity;
        for id in self.order.drain(..excess) {
            self.index.remove(&id);
        }
    }
}

impl From<Vec<String>> for SeenSet {
    fn from(ids: Vec<String>) -> Self {
        let mut set = SeenSet::new();
        for id in ids {
            if set.index.insert(id.clone()) {
                set.order.push(id);
            }
        }
        set
    }
}

impl From<SeenSet> for Vec<String> {
    fn from(set: SeenSet) -> Self {
        set.order
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SeenSet::from(iter.into_iter().map(Into::into).collect::<Vec<String>>())
    }
}

/// JSON file holding previously seen identities.
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
    capacity: usize,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Load stored identities.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty.
    pub async fn load(&self) -> SeenSet {
        match self.try_load().await {
            Ok(Some(set)) => set,
            Ok(None) => {
                log::info!("No seen store at {}; starting fresh", self.path.display());
                SeenSet::new()
            }
            Err(e) => {
                log::warn!(
                    "Seen store at {} is unreadable ({}); treating as empty",
                    self.path.display(),
                    e
                );
                SeenSet::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<SeenSet>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Persist the newest `capacity` identities, replacing the file.
    ///
    /// Returns the number of identities written.
    pub async fn save(&self, seen: &SeenSet) -> Result<usize> {
        let mut kept = seen.clone();
        kept.truncate_oldest(self.capacity);

        let bytes = serde_json::to_vec_pretty(&kept)?;
        self.write_bytes(&bytes).await?;
        Ok(kept.len())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        if let Err(e) = Self::replace_via(&tmp, &self.path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn replace_via(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(tmp, path).await
    }
}
