//! The repository: the only way the rest of the crate reads and writes records.

use crate::cache::RecordCache;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{Month, Record};
use crate::store::{bounded, timed_out, Fetched, RecordStore};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// The storage timeout used when none is configured.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Composes a `RecordStore` and a `RecordCache` for one kind of record.
///
/// - `insert` writes to the store and, only if that succeeds, to the cache. Inserts are serialized
///   so that the cache always reflects the store's successful inserts in order.
/// - `windowed_query` always asks the store.
/// - `all_records` is served from the cache.
///
/// Every store call, including the loads that fill the cache, gives up after `timeout`.
pub struct Repository<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    cache: Arc<RecordCache<R>>,
    insert_lock: Mutex<()>,
    timeout: Duration,
}

impl<R: Record> Repository<R> {
    pub fn new(
        store: Arc<dyn RecordStore<R>>,
        cache: Arc<RecordCache<R>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            insert_lock: Mutex::new(()),
            timeout,
        }
    }

    /// Creates a repository over `store` whose cache is loaded from `store` right away. If the
    /// load fails or takes longer than `timeout`, the cache starts out empty.
    pub async fn open(store: Arc<dyn RecordStore<R>>, timeout: Duration) -> Self {
        let cache = Arc::new(RecordCache::load(store.as_ref(), timeout).await);
        Self::new(store, cache, timeout)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> &Arc<RecordCache<R>> {
        &self.cache
    }

    /// Persists `record` and adds it to the cache.
    ///
    /// If the store does not answer in time it may still have committed the record, so the cache
    /// is reloaded from the store before the timeout is reported.
    ///
    /// # Errors
    /// - `StorageUnavailable` if the store rejects the insert or does not answer in time. The cache
    ///   is left untouched when the store rejects the insert.
    pub async fn insert(&self, record: R) -> Result<()> {
        let _guard = self.insert_lock.lock().await;
        let res = match tokio::time::timeout(self.timeout, self.store.insert(&record)).await {
            Ok(res) => res,
            Err(_) => {
                self.resync().await;
                Err(timed_out(R::KIND, self.timeout))
            }
        };
        res.with_context(|| format!("Could not insert {} for {}", R::KIND, record.month()))
            .pub_result(ErrorType::StorageUnavailable)
            .inspect_err(|e| error!("{e}"))?;
        debug!("Inserted {} for {}", R::KIND, record.month());
        self.cache.append(record).await;
        Ok(())
    }

    /// Returns at most `count` records whose month is `anchor` or earlier, most recent first.
    ///
    /// This always queries the store. If the store fails, the result is empty and carries the
    /// `StorageUnavailable` error; the failure is logged.
    pub async fn windowed_query(&self, anchor: Month, count: u32) -> Fetched<R> {
        let res = bounded(R::KIND, self.timeout, self.store.fetch_window(anchor, count))
            .await
            .with_context(|| {
                format!(
                    "Could not load the last {count} {} record(s) up to {anchor}",
                    R::KIND
                )
            });
        match res {
            Ok(fetched) => fetched,
            Err(e) => {
                let e = Error::new(ErrorType::StorageUnavailable, e);
                error!("{e}");
                Fetched::unavailable(e)
            }
        }
    }

    /// Every record of this kind, most recent first, as currently held by the cache.
    pub async fn all_records(&self) -> Vec<R> {
        self.cache.get().await
    }

    /// Reloads the cache from the store and returns the number of stored rows that could not be
    /// read.
    ///
    /// # Errors
    /// - `StorageUnavailable` if the store cannot be read in time. The cache keeps its contents.
    pub async fn refresh(&self) -> Result<usize> {
        let _guard = self.insert_lock.lock().await;
        self.cache
            .refresh(self.store.as_ref(), self.timeout)
            .await
            .with_context(|| format!("Could not refresh the {} cache", R::KIND))
            .pub_result(ErrorType::StorageUnavailable)
    }

    /// Brings the cache back in line with the store after an insert of unknown outcome. Called
    /// with `insert_lock` held.
    async fn resync(&self) {
        if let Err(e) = self.cache.refresh(self.store.as_ref(), self.timeout).await {
            warn!(
                "The {} cache may be missing a record the store accepted late: {e:#}",
                R::KIND
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Expense, ExpenseBreakdown};
    use crate::store::MemoryStore;
    use crate::test::TestEnv;
    use std::str::FromStr;
    use tokio::time::Instant;

    fn month(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    fn expense(m: &str, travel: u32) -> Expense {
        Expense::new(
            month(m).first_day(),
            ExpenseBreakdown {
                travel: Amount::from(travel),
                ..ExpenseBreakdown::default()
            },
        )
        .unwrap()
    }

    async fn memory_repo(
        records: Vec<Expense>,
    ) -> (Arc<MemoryStore<Expense>>, Repository<Expense>) {
        memory_repo_with_timeout(records, DEFAULT_STORAGE_TIMEOUT).await
    }

    async fn memory_repo_with_timeout(
        records: Vec<Expense>,
        timeout: Duration,
    ) -> (Arc<MemoryStore<Expense>>, Repository<Expense>) {
        let store = Arc::new(MemoryStore::new(records));
        let dyn_store: Arc<dyn RecordStore<Expense>> = store.clone();
        let repo = Repository::open(dyn_store, timeout).await;
        (store, repo)
    }

    #[tokio::test]
    async fn test_insert_reaches_cache_and_window() {
        let (_store, repo) = memory_repo(vec![expense("2024-01", 1)]).await;
        let record = expense("2024-04", 4);
        repo.insert(record.clone()).await.unwrap();

        assert!(repo.all_records().await.contains(&record));
        let window = repo.windowed_query(month("2024-06"), 12).await;
        assert!(window.records().contains(&record));
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_cache_alone() {
        let (store, repo) = memory_repo(vec![expense("2024-01", 1)]).await;
        let before = repo.all_records().await;
        store.fail_inserts(true);

        let err = repo.insert(expense("2024-02", 2)).await.unwrap_err();

        assert_eq!(err.error_type(), ErrorType::StorageUnavailable);
        assert_eq!(repo.all_records().await, before);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_windowed_query_uses_store_not_cache() {
        let (store, repo) = memory_repo(vec![]).await;
        // Written behind the repository's back: only the store knows about it.
        store.insert(&expense("2024-03", 3)).await.unwrap();

        assert!(repo.all_records().await.is_empty());
        assert_eq!(repo.windowed_query(month("2024-03"), 1).await.records().len(), 1);
    }

    #[tokio::test]
    async fn test_windowed_query_bounds() {
        let (_store, repo) = memory_repo(vec![
            expense("2023-11", 11),
            expense("2024-02", 2),
            expense("2024-05", 5),
            expense("2024-05", 6),
            expense("2024-08", 8),
        ])
        .await;
        let anchor = month("2024-05");
        let fetched = repo.windowed_query(anchor, 3).await;
        assert!(fetched.records().len() <= 3);
        assert!(fetched.records().iter().all(|e| e.month() <= anchor));
        assert_eq!(fetched.records()[0].month(), anchor);
    }

    #[tokio::test]
    async fn test_failed_fetch_degrades_to_empty() {
        let (store, repo) = memory_repo(vec![expense("2024-01", 1)]).await;
        store.fail_fetches(true);

        let fetched = repo.windowed_query(month("2024-06"), 12).await;

        assert!(fetched.records().is_empty());
        assert_eq!(
            fetched.failure().map(|e| e.error_type()),
            Some(ErrorType::StorageUnavailable)
        );
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let (store, repo) =
            memory_repo_with_timeout(vec![expense("2024-01", 1)], Duration::from_millis(20)).await;
        store.set_latency(Some(Duration::from_millis(500)));

        let fetched = repo.windowed_query(month("2024-06"), 12).await;
        assert!(fetched.is_unavailable());

        let err = repo.insert(expense("2024-02", 2)).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::StorageUnavailable);
        assert_eq!(repo.all_records().await.len(), 1);
        assert_eq!(store.len(), 1);

        let err = repo.refresh().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::StorageUnavailable);
        assert_eq!(repo.all_records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_open_over_slow_store_does_not_hang() {
        let store = Arc::new(MemoryStore::new(vec![expense("2024-01", 1)]));
        store.set_latency(Some(Duration::from_secs(5)));
        let dyn_store: Arc<dyn RecordStore<Expense>> = store.clone();
        let started = Instant::now();

        let repo = Repository::open(dyn_store, Duration::from_millis(20)).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(repo.all_records().await.is_empty());
        assert_eq!(repo.timeout(), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_late_insert_answer_still_reaches_cache() {
        let (store, repo) = memory_repo_with_timeout(vec![], Duration::from_millis(20)).await;
        store.set_ack_latency(Some(Duration::from_secs(5)));
        let record = expense("2024-02", 2);

        let err = repo.insert(record.clone()).await.unwrap_err();

        assert_eq!(err.error_type(), ErrorType::StorageUnavailable);
        assert_eq!(store.len(), 1);
        assert_eq!(repo.all_records().await, vec![record]);
    }

    #[tokio::test]
    async fn test_all_records_is_stable_without_inserts() {
        let (_store, repo) =
            memory_repo(vec![expense("2024-01", 1), expense("2024-01", 2)]).await;
        assert_eq!(repo.all_records().await, repo.all_records().await);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_all_land() {
        let (store, repo) = memory_repo(vec![]).await;
        let repo = Arc::new(repo);
        let mut handles = Vec::new();
        for i in 1..=12u32 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert(expense(&format!("2024-{i:02}"), i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let all = repo.all_records().await;
        assert_eq!(all.len(), 12);
        assert_eq!(store.len(), 12);
        assert_eq!(all[0].month(), month("2024-12"));
        assert_eq!(all[11].month(), month("2024-01"));
    }

    #[tokio::test]
    async fn test_refresh_picks_up_store_changes() {
        let (store, repo) = memory_repo(vec![]).await;
        store.insert(&expense("2024-03", 3)).await.unwrap();
        assert_eq!(repo.refresh().await.unwrap(), 0);
        assert_eq!(repo.all_records().await.len(), 1);

        store.fail_fetches(true);
        assert!(repo.refresh().await.is_err());
        assert_eq!(repo.all_records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_repository_round_trip() {
        let env = TestEnv::new().await;
        let db: Arc<dyn RecordStore<Expense>> = Arc::new(env.config().db().clone());
        let repo = Repository::open(db, DEFAULT_STORAGE_TIMEOUT).await;
        let record = expense("2024-05", 250);
        repo.insert(record.clone()).await.unwrap();

        assert_eq!(repo.all_records().await, vec![record.clone()]);
        let window = repo.windowed_query(month("2024-05"), 12).await;
        assert_eq!(window.records(), &[record]);
    }
}
