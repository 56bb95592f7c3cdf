//! The in-memory copy of every record of one kind.

use crate::error::Res;
use crate::model::Record;
use crate::store::{bounded, RecordStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Holds the entire history of one record kind, most recent first.
///
/// The cache is loaded from the store once and afterwards only grows through `append`, which the
/// repository calls after the store has accepted an insert. Several records may share a month.
#[derive(Debug)]
pub struct RecordCache<R> {
    records: RwLock<Vec<R>>,
    skipped: AtomicUsize,
}

impl<R: Record> RecordCache<R> {
    /// Creates an empty cache.
    pub fn empty() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            skipped: AtomicUsize::new(0),
        }
    }

    /// Loads the full history from `store`, giving up after `timeout`. If the store cannot be read
    /// in time, the failure is logged and the cache starts out empty.
    pub async fn load(store: &dyn RecordStore<R>, timeout: Duration) -> Self {
        let cache = Self::empty();
        if let Err(e) = cache.refresh(store, timeout).await {
            error!("Could not load {} records from storage: {e:#}", R::KIND);
        }
        cache
    }

    /// Replaces the contents with the full history from `store` and returns the number of stored
    /// rows that could not be read. If the store fails or does not answer within `timeout`, the
    /// current contents are kept.
    pub async fn refresh(&self, store: &dyn RecordStore<R>, timeout: Duration) -> Res<usize> {
        let fetched = bounded(R::KIND, timeout, store.fetch_all()).await?;
        let skipped = fetched.skipped();
        let mut records = fetched.into_records();
        crate::model::sort_newest_first(&mut records);
        debug!(
            "Loaded {} {} record(s) into the cache, {skipped} unreadable row(s) left out",
            records.len(),
            R::KIND
        );
        let mut guard = self.records.write().await;
        *guard = records;
        self.skipped.store(skipped, Ordering::SeqCst);
        Ok(skipped)
    }

    /// Stored rows left out by the last successful load or refresh because they could not be read.
    pub fn skipped_rows(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// A snapshot of every record, most recent first.
    pub async fn get(&self) -> Vec<R> {
        self.records.read().await.clone()
    }

    /// Adds `record` without consulting the store. It is placed after any records of the same
    /// month so that same-month records stay in insertion order.
    pub async fn append(&self, record: R) {
        let mut records = self.records.write().await;
        let ix = records.partition_point(|r| r.date() >= record.date());
        records.insert(ix, record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<R: Record> Default for RecordCache<R> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Income, IncomeSources, Month};
    use crate::repository::DEFAULT_STORAGE_TIMEOUT;
    use crate::store::MemoryStore;
    use std::str::FromStr;
    use tokio::time::Instant;

    fn income(month: &str, salary: u32) -> Income {
        Income::new(
            Month::from_str(month).unwrap().first_day(),
            IncomeSources {
                salary: Amount::from(salary),
                ..IncomeSources::default()
            },
        )
        .unwrap()
    }

    fn salaries(records: &[Income]) -> Vec<Amount> {
        records.iter().map(|r| r.salary()).collect()
    }

    #[tokio::test]
    async fn test_load_sorts_newest_first() {
        let store = MemoryStore::new(vec![
            income("2024-01", 1),
            income("2024-03", 3),
            income("2024-02", 2),
        ]);
        let cache = RecordCache::<Income>::load(&store, DEFAULT_STORAGE_TIMEOUT).await;
        assert_eq!(
            salaries(&cache.get().await),
            vec![Amount::from(3u32), Amount::from(2u32), Amount::from(1u32)]
        );
    }

    #[tokio::test]
    async fn test_load_failure_starts_empty() {
        let store = MemoryStore::new(vec![income("2024-01", 1)]);
        store.fail_fetches(true);
        let cache = RecordCache::<Income>::load(&store, DEFAULT_STORAGE_TIMEOUT).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_contents() {
        let store = MemoryStore::new(vec![income("2024-01", 1)]);
        let cache = RecordCache::<Income>::load(&store, DEFAULT_STORAGE_TIMEOUT).await;
        store.fail_fetches(true);
        assert!(cache.refresh(&store, DEFAULT_STORAGE_TIMEOUT).await.is_err());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_load_from_slow_store_gives_up() {
        let store = MemoryStore::new(vec![income("2024-01", 1)]);
        store.set_latency(Some(Duration::from_secs(5)));
        let started = Instant::now();

        let cache = RecordCache::<Income>::load(&store, Duration::from_millis(20)).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_from_slow_store_keeps_contents() {
        let store = MemoryStore::new(vec![income("2024-01", 1)]);
        let cache = RecordCache::<Income>::load(&store, DEFAULT_STORAGE_TIMEOUT).await;
        store.set_latency(Some(Duration::from_secs(5)));

        let err = cache
            .refresh(&store, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not answer"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_append_keeps_order_and_duplicates() {
        let cache = RecordCache::<Income>::empty();
        cache.append(income("2024-02", 20)).await;
        cache.append(income("2024-04", 40)).await;
        cache.append(income("2024-02", 21)).await;
        cache.append(income("2024-03", 30)).await;
        cache.append(income("2023-12", 12)).await;
        assert_eq!(
            salaries(&cache.get().await),
            vec![
                Amount::from(40u32),
                Amount::from(30u32),
                Amount::from(20u32),
                Amount::from(21u32),
                Amount::from(12u32),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let store = MemoryStore::new(vec![income("2024-01", 1), income("2024-01", 2)]);
        let cache = RecordCache::<Income>::load(&store, DEFAULT_STORAGE_TIMEOUT).await;
        assert_eq!(cache.get().await, cache.get().await);
    }
}
