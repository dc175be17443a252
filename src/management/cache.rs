use std::{io::Error, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{ListenRecord, TrackMetadata};

#[derive(Debug)]
pub enum CacheError {
    IoError(Error),
    SerdeError(serde_json::Error),
}

impl From<Error> for CacheError {
    fn from(err: Error) -> Self {
        CacheError::IoError(err)
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::IoError(e) => write!(f, "io error: {}", e),
            CacheError::SerdeError(e) => write!(f, "serde error: {}", e),
        }
    }
}

/// On-disk shape of the queue file. `next_id` is the id high-water mark, so
/// record identifiers stay monotonic even after delivered records are
/// flushed and the queue reloaded.
#[derive(Deserialize)]
struct CacheFile {
    next_id: u64,
    records: Vec<ListenRecord>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    next_id: u64,
    records: &'a [ListenRecord],
}

/// Durable queue of pending listens.
///
/// The cache is the single source of truth for unsubmitted listens. Records
/// are kept in insertion order (oldest first) and the whole queue file is
/// rewritten after every structural change. Storage cost is O(queue size)
/// per mutation, which is fine because the queue is bounded by the user's
/// listening rate.
pub struct ScrobbleCache {
    path: PathBuf,
    next_id: u64,
    records: Vec<ListenRecord>,
}

impl ScrobbleCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            next_id: 1,
            records: Vec::new(),
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("scroblcli/cache/listens.json");
        path
    }

    /// Loads the queue from disk. A missing file yields an empty queue.
    /// The `sent` flag is not serialized, so every reloaded record is
    /// eligible for re-submission.
    pub async fn load(path: PathBuf) -> Result<Self, CacheError> {
        let (next_id, records) = match async_fs::read_to_string(&path).await {
            Ok(json) => {
                let file: CacheFile =
                    serde_json::from_str(&json).map_err(CacheError::SerdeError)?;
                // Guard against a hand-edited file whose counter lags the
                // records it holds.
                let max_id = file.records.iter().map(|r| r.id).max().unwrap_or(0);
                (file.next_id.max(max_id + 1), file.records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (1, Vec::new()),
            Err(e) => return Err(CacheError::IoError(e)),
        };
        Ok(Self {
            path,
            next_id,
            records,
        })
    }

    /// Appends a new unsent record and persists immediately so a crash
    /// cannot lose a play event already enqueued.
    pub async fn add(&mut self, metadata: TrackMetadata, timestamp: i64) -> Result<u64, CacheError> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(ListenRecord {
            id,
            metadata,
            timestamp,
            sent: false,
            error: false,
        });
        self.persist().await?;
        Ok(id)
    }

    /// All records in insertion order, including already-sent ones still
    /// awaiting confirmation.
    pub fn list(&self) -> &[ListenRecord] {
        &self.records
    }

    /// Count of records not yet confirmed delivered.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Permanently removes the given records: confirmed delivery, or an
    /// unrecoverable per-item rejection.
    pub async fn flush(&mut self, ids: &[u64]) -> Result<(), CacheError> {
        self.records.retain(|r| !ids.contains(&r.id));
        self.persist().await
    }

    /// Marks the given records as rejected by the API so the next batch
    /// assembly isolates them one at a time.
    pub async fn set_error(&mut self, ids: &[u64]) -> Result<(), CacheError> {
        for record in self.records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.error = true;
        }
        self.persist().await
    }

    /// Resets `sent` on the given records, making them eligible for
    /// re-submission after a transport-level failure.
    pub fn clear_sent(&mut self, ids: &[u64]) {
        for record in self.records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.sent = false;
        }
    }

    pub fn mark_sent(&mut self, ids: &[u64]) {
        for record in self.records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.sent = true;
        }
    }

    /// Drops the whole queue (manual cache clear).
    pub async fn clear(&mut self) -> Result<(), CacheError> {
        self.records.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(CacheError::IoError)?;
        }

        let file = CacheFileRef {
            next_id: self.next_id,
            records: &self.records,
        };
        let json = serde_json::to_string_pretty(&file).map_err(CacheError::SerdeError)?;
        async_fs::write(&self.path, json)
            .await
            .map_err(CacheError::IoError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn track(artist: &str, title: &str) -> TrackMetadata {
        TrackMetadata {
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            album_artist: None,
            track: None,
            duration_secs: Some(180),
            musicbrainz_artist_id: None,
            musicbrainz_album_id: None,
            musicbrainz_recording_id: None,
            musicbrainz_track_id: None,
            radio: false,
        }
    }

    #[tokio::test]
    async fn add_persists_and_reload_clears_sent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listens.json");

        let mut cache = ScrobbleCache::new(path.clone());
        let id_a = cache.add(track("Low", "Monkey"), 100).await.unwrap();
        let id_b = cache.add(track("Low", "Silver Rider"), 200).await.unwrap();
        assert_ne!(id_a, id_b);
        cache.mark_sent(&[id_a]);

        let reloaded = ScrobbleCache::load(path).await.unwrap();
        assert_eq!(reloaded.count(), 2);
        // In-flight markers do not survive a restart.
        assert!(reloaded.list().iter().all(|r| !r.sent));
        assert_eq!(reloaded.list()[0].timestamp, 100);
    }

    #[tokio::test]
    async fn flush_removes_only_given_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listens.json");

        let mut cache = ScrobbleCache::new(path.clone());
        let id_a = cache.add(track("A", "one"), 1).await.unwrap();
        let _id_b = cache.add(track("B", "two"), 2).await.unwrap();
        let id_c = cache.add(track("C", "three"), 3).await.unwrap();

        cache.flush(&[id_a, id_c]).await.unwrap();
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.list()[0].metadata.artist, "B");

        // New ids keep increasing after a reload.
        let mut reloaded = ScrobbleCache::load(path).await.unwrap();
        let id_d = reloaded.add(track("D", "four"), 4).await.unwrap();
        assert!(id_d > id_c);
    }

    #[tokio::test]
    async fn ids_stay_monotonic_after_full_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listens.json");

        let mut cache = ScrobbleCache::new(path.clone());
        let id_a = cache.add(track("A", "one"), 1).await.unwrap();
        let id_b = cache.add(track("B", "two"), 2).await.unwrap();
        cache.flush(&[id_a, id_b]).await.unwrap();

        // Even with no surviving records, a reload never reuses an id.
        let mut reloaded = ScrobbleCache::load(path).await.unwrap();
        let id_c = reloaded.add(track("C", "three"), 3).await.unwrap();
        assert!(id_c > id_b);
    }

    #[tokio::test]
    async fn error_flag_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listens.json");

        let mut cache = ScrobbleCache::new(path.clone());
        let id = cache.add(track("A", "one"), 1).await.unwrap();
        cache.set_error(&[id]).await.unwrap();

        let reloaded = ScrobbleCache::load(path).await.unwrap();
        assert!(reloaded.list()[0].error);
    }

    #[tokio::test]
    async fn load_missing_file_yields_empty_queue() {
        let dir = tempdir().unwrap();
        let cache = ScrobbleCache::load(dir.path().join("nope.json")).await.unwrap();
        assert_eq!(cache.count(), 0);
    }
}
