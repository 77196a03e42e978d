use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use shared::domain::{RowSet, SheetId, WorksheetName};
use tokio::sync::Mutex;
use tracing::debug;

/// How long a worksheet snapshot is served without re-reading the sheet.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

struct CacheEntry {
    rows: Arc<RowSet>,
    fetched_at: Instant,
}

/// A TTL read-cache of worksheet snapshots, keyed by spreadsheet and tab.
/// Entries expire passively; a successful sheet write or an explicit refresh
/// drops the affected entry early.
pub struct RowCache {
    ttl: Duration,
    entries: Mutex<HashMap<(SheetId, WorksheetName), CacheEntry>>,
}

impl RowCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, sheet_id: &SheetId, worksheet: &WorksheetName) -> Option<Arc<RowSet>> {
        let mut entries = self.entries.lock().await;
        let key = (sheet_id.clone(), worksheet.clone());
        match entries.get(&key) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => Some(Arc::clone(&entry.rows)),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, sheet_id: &SheetId, worksheet: &WorksheetName, rows: Arc<RowSet>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            (sheet_id.clone(), worksheet.clone()),
            CacheEntry {
                rows,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, sheet_id: &SheetId, worksheet: &WorksheetName) {
        let mut entries = self.entries.lock().await;
        if entries
            .remove(&(sheet_id.clone(), worksheet.clone()))
            .is_some()
        {
            debug!(sheet_id = %sheet_id, worksheet = %worksheet, "dropped cached snapshot");
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for RowCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> (SheetId, WorksheetName) {
        (SheetId::new("sheet-1"), WorksheetName::new("Tab"))
    }

    #[tokio::test]
    async fn serves_a_fresh_entry_until_invalidated() {
        let cache = RowCache::default();
        let (sheet, tab) = key();
        let rows = Arc::new(RowSet::new(vec!["Title".to_string()]));

        cache.insert(&sheet, &tab, Arc::clone(&rows)).await;
        assert_eq!(cache.get(&sheet, &tab).await, Some(rows));

        cache.invalidate(&sheet, &tab).await;
        assert_eq!(cache.get(&sheet, &tab).await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let cache = RowCache::new(Duration::ZERO);
        let (sheet, tab) = key();

        cache
            .insert(&sheet, &tab, Arc::new(RowSet::default()))
            .await;
        assert_eq!(cache.get(&sheet, &tab).await, None);
    }

    #[tokio::test]
    async fn entries_are_keyed_per_worksheet() {
        let cache = RowCache::default();
        let sheet = SheetId::new("sheet-1");

        cache
            .insert(
                &sheet,
                &WorksheetName::new("A"),
                Arc::new(RowSet::default()),
            )
            .await;
        assert!(cache.get(&sheet, &WorksheetName::new("B")).await.is_none());
        assert!(cache.get(&sheet, &WorksheetName::new("A")).await.is_some());
    }
}
