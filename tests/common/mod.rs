//! Shared test fixtures: an integer-keyed in-memory table source.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use tailtable::FetchError;
use tailtable::Operator;
use tailtable::SortOrder;
use tailtable::TableSource;

/// A dataset of `u64` keys where each row is its own key. `load` implements
/// canonical keyset semantics over the current dataset.
pub struct MockSource {
    rows: Mutex<Vec<u64>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl MockSource {
    /// Dataset with keys `0..n`.
    pub fn with_rows(n: u64) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new((0..n).collect()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency: None,
        })
    }

    /// Same, but every `load` sleeps first so operations can overlap.
    pub fn with_rows_and_latency(n: u64, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new((0..n).collect()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency: Some(latency),
        })
    }

    /// Appends `n` new rows with the next keys, simulating live growth.
    pub fn grow(&self, n: u64) {
        let mut rows = self.rows.lock().unwrap();
        let next = rows.iter().max().map_or(0, |m| m + 1);
        rows.extend(next..next + n);
    }

    /// Number of `load` calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `load` fail.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TableSource for MockSource {
    type Row = u64;
    type Key = u64;

    fn key_for(&self, row: &u64) -> u64 {
        *row
    }

    fn key_to_string(&self, key: &u64) -> String {
        key.to_string()
    }

    fn key_from_string(&self, raw: &str) -> Option<u64> {
        raw.parse().ok()
    }

    async fn load(
        &self,
        anchor: Option<u64>,
        op: Operator,
        order: SortOrder,
        limit: usize,
    ) -> Result<Option<Vec<u64>>, FetchError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::backend("synthetic failure"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut out: Vec<u64> = {
            let rows = self.rows.lock().unwrap();
            rows.iter()
                .copied()
                .filter(|k| match anchor {
                    None => true,
                    Some(a) => match op {
                        Operator::Gt => *k > a,
                        Operator::Gte => *k >= a,
                        Operator::Lt => *k < a,
                        Operator::Lte => *k <= a,
                    },
                })
                .collect()
        };
        out.sort_unstable();
        if order == SortOrder::Desc {
            out.reverse();
        }
        out.truncate(limit);
        Ok(Some(out))
    }
}
