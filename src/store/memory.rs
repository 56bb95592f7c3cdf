//! Implements the `RecordStore` trait using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this crate so that embedders can run
//! the repository and aggregation logic without a database.

use crate::error::Res;
use crate::model::{sort_newest_first, Month, Record};
use crate::store::{Fetched, RecordStore};
use anyhow::bail;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// An implementation of the `RecordStore` trait that holds records in a `Vec`, in insertion order.
///
/// Fetches and inserts can be made to fail, and every call can be delayed, so that callers can
/// observe how they behave when storage misbehaves.
#[derive(Debug)]
pub struct MemoryStore<R> {
    records: Mutex<Vec<R>>,
    fail_fetches: AtomicBool,
    fail_inserts: AtomicBool,
    latency: Mutex<Option<Duration>>,
    ack_latency: Mutex<Option<Duration>>,
}

impl<R: Record> MemoryStore<R> {
    /// Create a new `MemoryStore` seeded with `records`.
    pub fn new(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
            fail_fetches: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            latency: Mutex::new(None),
            ack_latency: Mutex::new(None),
        }
    }

    /// When `fail` is true, subsequent fetches return an error.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// When `fail` is true, subsequent inserts return an error and store nothing.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Delay the answer to every insert by `latency`, after the record has been stored. This is how
    /// a store behaves when it commits a write but answers too late.
    pub fn set_ack_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.ack_latency.lock() {
            *guard = latency;
        }
    }

    /// The number of records held, including those not yet seen by any cache.
    pub fn len(&self) -> usize {
        self.snapshot().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Res<Vec<R>> {
        match self.records.lock() {
            Ok(guard) => Ok(guard.clone()),
            Err(_) => bail!("The in-memory {} store is poisoned", R::KIND),
        }
    }

    async fn wait(&self) {
        sleep_for(&self.latency).await;
    }

    fn push(&self, record: &R) -> Res<()> {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(_) => bail!("The in-memory {} store is poisoned", R::KIND),
        }
        Ok(())
    }

    fn check_fetch(&self) -> Res<()> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            bail!("The in-memory {} store is unavailable", R::KIND)
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for MemoryStore<R> {
    async fn fetch_all(&self) -> Res<Fetched<R>> {
        self.wait().await;
        self.check_fetch()?;
        let mut records = self.snapshot()?;
        sort_newest_first(&mut records);
        Ok(Fetched::new(records, 0))
    }

    async fn fetch_window(&self, anchor: Month, count: u32) -> Res<Fetched<R>> {
        self.wait().await;
        self.check_fetch()?;
        let mut records: Vec<R> = self
            .snapshot()?
            .into_iter()
            .filter(|r| r.month() <= anchor)
            .collect();
        sort_newest_first(&mut records);
        records.truncate(count as usize);
        Ok(Fetched::new(records, 0))
    }

    async fn insert(&self, record: &R) -> Res<()> {
        self.wait().await;
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("The in-memory {} store rejected the insert", R::KIND)
        }
        self.push(record)?;
        sleep_for(&self.ack_latency).await;
        Ok(())
    }
}

async fn sleep_for(latency: &Mutex<Option<Duration>>) {
    let latency = latency.lock().ok().and_then(|guard| *guard);
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Expense, ExpenseBreakdown};
    use std::str::FromStr;

    fn expense(month: &str, housing: u32) -> Expense {
        Expense::new(
            Month::from_str(month).unwrap().first_day(),
            ExpenseBreakdown {
                housing: housing.into(),
                ..ExpenseBreakdown::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_window_filters_sorts_and_limits() {
        let store = MemoryStore::new(vec![
            expense("2024-01", 1),
            expense("2024-07", 7),
            expense("2024-03", 3),
            expense("2024-06", 6),
            expense("2024-05", 5),
        ]);
        let fetched = store
            .fetch_window(Month::from_str("2024-06").unwrap(), 3)
            .await
            .unwrap();
        let housing: Vec<_> = fetched.records().iter().map(|e| e.housing()).collect();
        assert_eq!(
            housing,
            vec![Amount::from(6u32), Amount::from(5u32), Amount::from(3u32)]
        );
        assert_eq!(fetched.skipped(), 0);
    }

    #[tokio::test]
    async fn test_failures() {
        let store = MemoryStore::new(vec![expense("2024-01", 1)]);
        store.fail_fetches(true);
        assert!(store.fetch_all().await.is_err());
        store.fail_inserts(true);
        assert!(store.insert(&expense("2024-02", 2)).await.is_err());
        assert_eq!(store.len(), 1);
        store.fail_fetches(false);
        assert_eq!(store.fetch_all().await.unwrap().records().len(), 1);
    }

    #[tokio::test]
    async fn test_late_ack_stores_before_answering() {
        let store = MemoryStore::new(Vec::<Expense>::new());
        store.set_ack_latency(Some(Duration::from_secs(5)));
        let record = expense("2024-02", 2);
        let insert = store.insert(&record);
        assert!(tokio::time::timeout(Duration::from_millis(20), insert).await.is_err());
        assert_eq!(store.len(), 1);
    }
}
