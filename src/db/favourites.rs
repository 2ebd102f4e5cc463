use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::MovieRecord,
};

/// Current version of the persisted favourites document
pub const DOCUMENT_VERSION: u32 = 1;

/// Persistent, ordered list of rated movies
///
/// Implementations serialize every read-modify-write of the full list, so
/// concurrent rate/delete calls cannot lose each other's updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavouritesStore: Send + Sync {
    /// Returns the persisted favourites in insertion order
    ///
    /// On first use the store is initialized with an empty list.
    async fn load(&self) -> AppResult<Vec<MovieRecord>>;

    /// Replaces the full persisted list
    async fn save(&self, records: Vec<MovieRecord>) -> AppResult<()>;

    /// Removes the record with this movie id; absent ids are a no-op
    async fn remove(&self, movie_id: i64) -> AppResult<()>;

    /// Replaces the record with the same movie id in place, or appends it
    async fn upsert(&self, record: MovieRecord) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

// ============================================================================
// Document Schema
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavouritesDocument {
    version: u32,
    updated_at: DateTime<Utc>,
    records: Vec<MovieRecord>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

/// Serializes favourites into the versioned storage document
pub fn encode_document(records: &[MovieRecord]) -> AppResult<String> {
    let document = FavouritesDocument {
        version: DOCUMENT_VERSION,
        updated_at: Utc::now(),
        records: records.to_vec(),
    };
    Ok(serde_json::to_string(&document)?)
}

/// Parses a storage document, rejecting unknown versions
pub fn decode_document(raw: &str) -> AppResult<Vec<MovieRecord>> {
    let probe: VersionProbe = serde_json::from_str(raw)
        .map_err(|e| AppError::CorruptDocument(format!("missing version: {}", e)))?;

    if probe.version != DOCUMENT_VERSION {
        return Err(AppError::CorruptDocument(format!(
            "unsupported document version {}",
            probe.version
        )));
    }

    let document: FavouritesDocument =
        serde_json::from_str(raw).map_err(|e| AppError::CorruptDocument(e.to_string()))?;
    Ok(document.records)
}

fn ensure_unique(records: &[MovieRecord]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.movie_id) {
            return Err(AppError::InvalidInput(format!(
                "Duplicate movie id {} in favourites",
                record.movie_id
            )));
        }
    }
    Ok(())
}

fn apply_upsert(records: &mut Vec<MovieRecord>, record: MovieRecord) {
    match records.iter_mut().find(|r| r.movie_id == record.movie_id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Returns false when nothing was removed
fn apply_remove(records: &mut Vec<MovieRecord>, movie_id: i64) -> bool {
    let before = records.len();
    records.retain(|r| r.movie_id != movie_id);
    records.len() != before
}

// ============================================================================
// Redis Backend
// ============================================================================

/// Favourites persisted as a single JSON document under one Redis key
///
/// Every write is one `SET` of the whole document, so readers never observe a
/// partially written list.
pub struct RedisFavouritesStore {
    conn: ConnectionManager,
    key: String,
    write_lock: Mutex<()>,
}

impl RedisFavouritesStore {
    pub async fn new(client: redis::Client, key: impl Into<String>) -> AppResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key: key.into(),
            write_lock: Mutex::new(()),
        })
    }

    async fn read(&self) -> AppResult<Option<Vec<MovieRecord>>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&self.key).await?;
        raw.as_deref().map(decode_document).transpose()
    }

    async fn write(&self, records: &[MovieRecord]) -> AppResult<()> {
        let document = encode_document(records)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(&self.key, document).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FavouritesStore for RedisFavouritesStore {
    async fn load(&self) -> AppResult<Vec<MovieRecord>> {
        if let Some(records) = self.read().await? {
            return Ok(records);
        }

        // NX so a writer that got there first is never clobbered
        let document = encode_document(&[])?;
        let mut conn = self.conn.clone();
        let created: bool = conn.set_nx(&self.key, document).await?;
        if created {
            tracing::info!(key = %self.key, "Initialized empty favourites list");
            return Ok(Vec::new());
        }

        Ok(self.read().await?.unwrap_or_default())
    }

    async fn save(&self, records: Vec<MovieRecord>) -> AppResult<()> {
        ensure_unique(&records)?;
        let _guard = self.write_lock.lock().await;
        self.write(&records).await?;
        tracing::debug!(key = %self.key, count = records.len(), "Saved favourites");
        Ok(())
    }

    async fn remove(&self, movie_id: i64) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await?.unwrap_or_default();

        if apply_remove(&mut records, movie_id) {
            self.write(&records).await?;
            tracing::debug!(key = %self.key, movie_id, "Removed favourite");
        }

        Ok(())
    }

    async fn upsert(&self, record: MovieRecord) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await?.unwrap_or_default();
        apply_upsert(&mut records, record);
        self.write(&records).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// ============================================================================
// In-Memory Backend
// ============================================================================

/// Favourites held in process memory, encoded with the same document schema
/// as the Redis backend
#[derive(Default)]
pub struct InMemoryFavouritesStore {
    document: Mutex<Option<String>>,
}

impl InMemoryFavouritesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw persisted document, `None` until first written
    pub async fn persisted_document(&self) -> Option<String> {
        self.document.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl FavouritesStore for InMemoryFavouritesStore {
    async fn load(&self) -> AppResult<Vec<MovieRecord>> {
        let mut document = self.document.lock().await;
        match document.as_deref() {
            Some(raw) => decode_document(raw),
            None => {
                *document = Some(encode_document(&[])?);
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, records: Vec<MovieRecord>) -> AppResult<()> {
        ensure_unique(&records)?;
        let encoded = encode_document(&records)?;
        *self.document.lock().await = Some(encoded);
        Ok(())
    }

    async fn remove(&self, movie_id: i64) -> AppResult<()> {
        let mut document = self.document.lock().await;
        let mut records = match document.as_deref() {
            Some(raw) => decode_document(raw)?,
            None => return Ok(()),
        };

        if apply_remove(&mut records, movie_id) {
            *document = Some(encode_document(&records)?);
        }
        Ok(())
    }

    async fn upsert(&self, record: MovieRecord) -> AppResult<()> {
        let mut document = self.document.lock().await;
        let mut records = match document.as_deref() {
            Some(raw) => decode_document(raw)?,
            None => Vec::new(),
        };

        apply_upsert(&mut records, record);
        *document = Some(encode_document(&records)?);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
