//! The row buffer: a contiguous cached window over a keyset-paginated
//! dataset, with live-tail refresh and random-access paging.
//!
//! The buffer owns the cache and the two core algorithms. All backend access
//! goes through the injected [`TableSource`]; every request is capped at the
//! configured `max_limit`, and every over-fetched row is retained as a
//! *shadow page* so revisiting it later costs nothing.
//!
//! Concurrency is cooperative abort-by-discard: each mutating entry point
//! bumps a generation counter, which marks any still-pending operation
//! stale. A stale operation stops walking at its next suspension point and
//! never touches the cache, so the window always reflects the last-issued
//! operation.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use log::trace;

use crate::config::TableConfig;
use crate::error::FetchError;
use crate::query::SortOrder;
use crate::query::backward_operator;
use crate::query::forward_operator;
use crate::source::TableSource;

mod window;

pub use window::Span;
pub(crate) use window::clamped_start;
pub(crate) use window::page_of_rank;

/// How many presumed-row-count multiples the live-tail cache may retain
/// before old shadow pages are dropped.
const RETENTION_FACTOR: usize = 4;

/// Outcome of a buffer-mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation completed and its result is installed in the cache.
    Applied,
    /// A newer operation superseded this one; the cache was left exactly as
    /// it was. Not an error.
    Superseded,
}

/// Which kind of operation is currently live, for abort accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Refresh,
    MoveToPage,
}

struct WindowState<R> {
    /// Cached rows, contiguous in display order.
    rows: Vec<R>,
    /// Display rank of `rows[0]`.
    first_rank: usize,
    /// Offset of the displayed page within `rows`.
    start_index: usize,
    /// Total-row estimate; presumed until observed.
    total_rows: usize,
    generation: u64,
    pending: Pending,
    aborted_refresh: u64,
    aborted_move: u64,
    in_flight: usize,
}

fn lock_state<R>(state: &Mutex<WindowState<R>>) -> MutexGuard<'_, WindowState<R>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrements the in-flight count on every exit path of an operation.
struct InFlightGuard<'a, R> {
    state: &'a Mutex<WindowState<R>>,
}

impl<R> Drop for InFlightGuard<'_, R> {
    fn drop(&mut self) {
        let mut st = lock_state(self.state);
        st.in_flight = st.in_flight.saturating_sub(1);
    }
}

/// Cursor-window buffer over a [`TableSource`].
///
/// One buffer per controller; shared mutation is serialized by supersession,
/// not by holding locks across awaits.
pub struct RowBuffer<S: TableSource> {
    source: Arc<S>,
    config: TableConfig,
    state: Mutex<WindowState<S::Row>>,
}

impl<S: TableSource> RowBuffer<S> {
    /// Creates an empty buffer.
    pub fn new(source: Arc<S>, config: TableConfig) -> Self {
        let total_rows = config.presumed_row_count;
        Self {
            source,
            config,
            state: Mutex::new(WindowState {
                rows: Vec::new(),
                first_rank: 0,
                start_index: 0,
                total_rows,
                generation: 0,
                pending: Pending::None,
                aborted_refresh: 0,
                aborted_move: 0,
                in_flight: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, WindowState<S::Row>> {
        lock_state(&self.state)
    }

    /// Starts a mutating operation: supersedes whatever was pending and
    /// returns the generation this operation must hold to apply its result.
    fn begin(&self, kind: Pending) -> u64 {
        let mut st = self.state();
        st.generation += 1;
        match st.pending {
            Pending::Refresh => st.aborted_refresh += 1,
            Pending::MoveToPage => st.aborted_move += 1,
            Pending::None => {}
        }
        st.pending = kind;
        st.in_flight += 1;
        st.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state().generation == generation
    }

    /// Clears the pending marker after a failed operation, so the failure is
    /// not later counted as a supersession.
    fn settle_failure(&self, generation: u64) {
        let mut st = self.state();
        if st.generation == generation {
            st.pending = Pending::None;
        }
    }

    async fn load_chunk(
        &self,
        generation: u64,
        anchor: Option<S::Key>,
        op: crate::query::Operator,
        order: SortOrder,
        limit: usize,
    ) -> Result<Option<Vec<S::Row>>, FetchError> {
        match self.source.load(anchor, op, order, limit).await {
            Ok(rows) => {
                if self.is_current(generation) {
                    Ok(Some(rows.unwrap_or_default()))
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                self.settle_failure(generation);
                Err(e)
            }
        }
    }

    /// Fetches the live tail and reconciles it with the cached head.
    ///
    /// The first call installs the newest `presumed_row_count` rows as the
    /// whole window. Subsequent calls re-fetch the same head chunk: rows
    /// that appeared ahead of the previously-newest cached row are spliced
    /// in and the cache is trimmed to the retention bound, so a live tail
    /// never grows the cache unboundedly even though the total estimate may
    /// grow without bound. A short chunk means the dataset now fits in the
    /// chunk entirely and the total shrinks to the observed count.
    pub async fn refresh(&self) -> Result<Outcome, FetchError> {
        let generation = self.begin(Pending::Refresh);
        let _guard = InFlightGuard { state: &self.state };

        let order = self.config.order;
        let limit = self.config.presumed_row_count.max(1);
        let prev_head = {
            let st = self.state();
            st.rows.first().map(|r| self.source.key_for(r))
        };

        let chunk = match self
            .load_chunk(generation, None, forward_operator(order), order, limit)
            .await?
        {
            Some(chunk) => chunk,
            None => return Ok(Outcome::Superseded),
        };

        let exhausted = chunk.len() < limit;
        let new_ahead = prev_head.as_ref().map(|head| {
            chunk
                .iter()
                .position(|r| self.source.key_for(r) == *head)
        });
        let retention = limit.saturating_mul(RETENTION_FACTOR);

        let mut st = self.state();
        if st.generation != generation {
            return Ok(Outcome::Superseded);
        }
        match new_ahead {
            _ if exhausted => {
                // The whole dataset fits in the head chunk.
                st.total_rows = chunk.len();
                st.rows = chunk;
            }
            None | Some(None) => {
                // First load, or the previous head fell out of the chunk:
                // contiguity with the old cache can no longer be proven.
                if prev_head.is_some() {
                    st.total_rows = st.total_rows.saturating_add(chunk.len());
                } else {
                    st.total_rows = st.total_rows.max(chunk.len());
                }
                st.rows = chunk;
            }
            Some(Some(new_rows)) => {
                // `new_rows` rows appeared ahead of the previous head; the
                // rest of the chunk overlaps the old cache.
                st.total_rows = st.total_rows.saturating_add(new_rows);
                let old = std::mem::take(&mut st.rows);
                let covered = chunk.len() - new_rows;
                let mut rows = chunk;
                if covered < old.len() {
                    rows.extend(old.into_iter().skip(covered));
                }
                rows.truncate(retention);
                st.rows = rows;
            }
        }
        st.first_rank = 0;
        st.start_index = 0;
        st.pending = Pending::None;
        Ok(Outcome::Applied)
    }

    /// Moves the displayed page, fetching only what the cache lacks.
    ///
    /// The target span is `[(page-1)*page_size, page*page_size)` in display
    /// ranks. With an `anchor` (a restored bookmark or a filter change) the
    /// anchor designates the first row of the target page and the window is
    /// rebuilt forward from it. Without one, a span inside the cached window
    /// costs zero fetches; otherwise the cache edges are walked outward in
    /// `max_limit`-sized chunks, all of which are retained.
    pub async fn move_to_page(
        &self,
        page: usize,
        anchor: Option<S::Key>,
    ) -> Result<Outcome, FetchError> {
        let generation = self.begin(Pending::MoveToPage);
        let _guard = InFlightGuard { state: &self.state };

        let page_size = self.config.page_size.max(1);
        let span = Span::for_page(page, page_size);
        let order = self.config.order;
        let max_limit = self.config.max_limit.max(1);

        if let Some(anchor) = anchor {
            return self
                .move_anchored(generation, span, anchor, order, max_limit)
                .await;
        }

        let (mut rows, mut first_rank, prior_total) = {
            let mut st = self.state();
            if st.generation != generation {
                return Ok(Outcome::Superseded);
            }
            if span.covered_by(st.first_rank, st.rows.len()) {
                trace!(
                    "page {page} covered by cached ranks {}..{}",
                    st.first_rank,
                    st.first_rank + st.rows.len()
                );
                st.start_index = span.start - st.first_rank;
                st.pending = Pending::None;
                return Ok(Outcome::Applied);
            }
            (st.rows.clone(), st.first_rank, st.total_rows)
        };

        let mut exhausted_forward = false;

        if rows.is_empty() {
            // Cold jump: walk from the display head (the high-key edge)
            // downward until the span is covered.
            let mut anchor_key: Option<S::Key> = None;
            loop {
                let chunk = match self
                    .load_chunk(
                        generation,
                        anchor_key.clone(),
                        forward_operator(order),
                        order,
                        max_limit,
                    )
                    .await?
                {
                    Some(chunk) => chunk,
                    None => return Ok(Outcome::Superseded),
                };
                let fetched = chunk.len();
                rows.extend(chunk);
                if fetched < max_limit {
                    exhausted_forward = true;
                    break;
                }
                if rows.len() >= span.end {
                    break;
                }
                anchor_key = rows.last().map(|r| self.source.key_for(r));
            }
            first_rank = 0;
        } else {
            // Walk the head edge while the span starts before the window.
            while span.start < first_rank {
                let head = match rows.first() {
                    Some(r) => self.source.key_for(r),
                    None => break,
                };
                let chunk = match self
                    .load_chunk(
                        generation,
                        Some(head),
                        backward_operator(order),
                        order.invert(),
                        max_limit,
                    )
                    .await?
                {
                    Some(chunk) => chunk,
                    None => return Ok(Outcome::Superseded),
                };
                let fetched = chunk.len();
                let mut front = chunk;
                front.reverse();
                front.extend(rows);
                rows = front;
                first_rank = first_rank.saturating_sub(fetched);
                if fetched < max_limit {
                    // Nothing exists above what we just fetched.
                    first_rank = 0;
                    break;
                }
            }
            // Walk the tail edge while the span ends past the window.
            while first_rank + rows.len() < span.end {
                let tail = match rows.last() {
                    Some(r) => self.source.key_for(r),
                    None => break,
                };
                let chunk = match self
                    .load_chunk(
                        generation,
                        Some(tail),
                        forward_operator(order),
                        order,
                        max_limit,
                    )
                    .await?
                {
                    Some(chunk) => chunk,
                    None => return Ok(Outcome::Superseded),
                };
                let fetched = chunk.len();
                rows.extend(chunk);
                if fetched < max_limit {
                    exhausted_forward = true;
                    break;
                }
            }
        }

        let mut st = self.state();
        if st.generation != generation {
            return Ok(Outcome::Superseded);
        }
        let reach = first_rank + rows.len();
        st.total_rows = if exhausted_forward {
            reach
        } else {
            prior_total.max(reach)
        };
        st.start_index = clamped_start(first_rank, rows.len(), span.start, page_size);
        st.first_rank = first_rank;
        st.rows = rows;
        st.pending = Pending::None;
        Ok(Outcome::Applied)
    }

    /// Rebuilds the window forward from an anchor key that designates the
    /// first row of the target span. The first boundary is inclusive.
    async fn move_anchored(
        &self,
        generation: u64,
        span: Span,
        anchor: S::Key,
        order: SortOrder,
        max_limit: usize,
    ) -> Result<Outcome, FetchError> {
        let mut rows: Vec<S::Row> = Vec::new();
        let mut exhausted = false;
        let mut anchor_key = anchor;
        let mut op = forward_operator(order).non_strict();

        while rows.len() < span.len() {
            let chunk = match self
                .load_chunk(
                    generation,
                    Some(anchor_key.clone()),
                    op,
                    order,
                    max_limit,
                )
                .await?
            {
                Some(chunk) => chunk,
                None => return Ok(Outcome::Superseded),
            };
            let fetched = chunk.len();
            rows.extend(chunk);
            if fetched < max_limit {
                exhausted = true;
                break;
            }
            match rows.last() {
                Some(last) => {
                    anchor_key = self.source.key_for(last);
                    op = forward_operator(order);
                }
                None => break,
            }
        }

        let mut st = self.state();
        if st.generation != generation {
            return Ok(Outcome::Superseded);
        }
        let reach = span.start + rows.len();
        st.total_rows = if exhausted {
            reach
        } else {
            st.total_rows.max(reach)
        };
        st.first_rank = span.start;
        st.start_index = 0;
        st.rows = rows;
        st.pending = Pending::None;
        Ok(Outcome::Applied)
    }

    /// Aborts a pending `refresh`, leaving the cache untouched.
    pub fn abort_refresh(&self) {
        let mut st = self.state();
        if st.pending == Pending::Refresh {
            st.generation += 1;
            st.pending = Pending::None;
            st.aborted_refresh += 1;
        }
    }

    /// Aborts a pending `move_to_page`, leaving the cache untouched.
    pub fn abort_move_to_page(&self) {
        let mut st = self.state();
        if st.pending == Pending::MoveToPage {
            st.generation += 1;
            st.pending = Pending::None;
            st.aborted_move += 1;
        }
    }

    /// Empties the cache and resets the total estimate to the presumed
    /// value. Aborts any pending operation first.
    pub fn clear(&self) {
        let mut st = self.state();
        st.generation += 1;
        match st.pending {
            Pending::Refresh => st.aborted_refresh += 1,
            Pending::MoveToPage => st.aborted_move += 1,
            Pending::None => {}
        }
        st.pending = Pending::None;
        st.rows.clear();
        st.first_rank = 0;
        st.start_index = 0;
        st.total_rows = self.config.presumed_row_count;
    }

    /// The 1-based page number currently displayed.
    pub fn page(&self) -> usize {
        let st = self.state();
        page_of_rank(st.first_rank + st.start_index, self.config.page_size)
    }

    /// Key of the first visible row, if any.
    pub fn first_visible_key(&self) -> Option<S::Key> {
        let st = self.state();
        st.rows.get(st.start_index).map(|r| self.source.key_for(r))
    }

    /// The currently visible page of rows.
    pub fn visible_rows(&self) -> Vec<S::Row> {
        let st = self.state();
        let page_size = self.config.page_size.max(1);
        let end = (st.start_index + page_size).min(st.rows.len());
        if st.start_index >= end {
            return Vec::new();
        }
        st.rows[st.start_index..end].to_vec()
    }

    /// Current total-row estimate.
    pub fn total_rows(&self) -> usize {
        self.state().total_rows
    }

    /// Number of cached rows, visible or shadow.
    pub fn cached_len(&self) -> usize {
        self.state().rows.len()
    }

    /// Whether any operation is in flight.
    pub fn is_loading(&self) -> bool {
        self.state().in_flight > 0
    }

    /// How many `refresh` operations were superseded or aborted.
    pub fn aborted_refresh_count(&self) -> u64 {
        self.state().aborted_refresh
    }

    /// How many `move_to_page` operations were superseded or aborted.
    pub fn aborted_move_count(&self) -> u64 {
        self.state().aborted_move
    }
}
