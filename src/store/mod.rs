//! The narrow interface between records and durable storage.
//!
//! `RecordStore` is the only seam through which the rest of the crate reaches storage. The SQLite
//! implementation lives in `crate::db`; `MemoryStore` keeps records in memory and can be told to
//! fail, which is how the repository's consistency rules are tested.

mod memory;

pub use memory::MemoryStore;

use crate::error::Res;
use crate::model::{Month, Record, RecordKind};
use crate::{Error, Result};
use anyhow::anyhow;
use std::future::Future;
use std::time::Duration;

/// Storage operations for one kind of record.
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Returns every stored record, most recent first. Records sharing a month are returned in the
    /// order they were inserted.
    async fn fetch_all(&self) -> Res<Fetched<R>>;

    /// Returns at most `count` records whose month is `anchor` or earlier, most recent first.
    async fn fetch_window(&self, anchor: Month, count: u32) -> Res<Fetched<R>>;

    /// Persists `record`.
    async fn insert(&self, record: &R) -> Res<()>;
}

/// Runs a storage call against a `kind` store, failing if it takes longer than `timeout`.
pub(crate) async fn bounded<T>(
    kind: RecordKind,
    timeout: Duration,
    call: impl Future<Output = Res<T>>,
) -> Res<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(res) => res,
        Err(_) => Err(timed_out(kind, timeout)),
    }
}

pub(crate) fn timed_out(kind: RecordKind, timeout: Duration) -> anyhow::Error {
    anyhow!("The {kind} store did not answer within {timeout:?}")
}

/// The outcome of a fetch.
///
/// `skipped` counts stored rows that could not be turned into records. `failure` is set when the
/// fetch itself failed; `records` is then empty and should be treated like an empty table.
#[derive(Debug)]
pub struct Fetched<R> {
    records: Vec<R>,
    skipped: usize,
    failure: Option<Error>,
}

impl<R> Fetched<R> {
    pub fn new(records: Vec<R>, skipped: usize) -> Self {
        Self {
            records,
            skipped,
            failure: None,
        }
    }

    /// An empty result standing in for a fetch that failed with `failure`.
    pub fn unavailable(failure: Error) -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            failure: Some(failure),
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Number of rows skipped because they could not be parsed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failure(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    pub fn into_failure(self) -> Option<Error> {
        self.failure
    }

    /// The records, or the error if the fetch failed.
    pub fn into_result(self) -> Result<Vec<R>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.failure.is_some()
    }
}

impl<R> Default for Fetched<R> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}
