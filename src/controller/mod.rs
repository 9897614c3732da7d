//! The table controller: lifecycle, mode switching, and view persistence.
//!
//! The controller is the public-facing orchestrator around a [`RowBuffer`].
//! It translates lifecycle and user events into buffer operations, runs the
//! auto-refresh loop, reacts to external change signals, and persists the
//! current view (page number + anchor key) into an external binding so a
//! reload can restore it.
//!
//! Fetch failures never escape: they are logged at this boundary and the
//! buffer keeps its last good state.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use log::debug;
use log::warn;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::buffer::RowBuffer;
use crate::config::TableConfig;
use crate::source::TableSource;

mod binding;

pub use binding::MemoryBinding;
pub use binding::ViewBinding;

/// A change-notification channel registered via
/// [`TableController::watch_and_reload`].
pub type ChangeSignal = watch::Receiver<()>;

/// Controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Not mounted; no observation, no fetches.
    Unmounted,
    /// Live tail: a self-rescheduling loop re-fetches the newest rows.
    AutoRefreshing,
    /// Static paging by page number.
    Paged,
}

/// Snapshot of the externally observable table state.
#[derive(Debug, Clone)]
pub struct TableView<R, K> {
    /// The currently visible page of rows.
    pub rows: Vec<R>,
    /// 1-based page number.
    pub page: usize,
    /// Total-row estimate.
    pub total_rows: usize,
    /// Key of the first visible row, if any.
    pub first_visible_key: Option<K>,
    /// Whether a fetch is in flight.
    pub loading: bool,
    /// Whether the live tail is active.
    pub auto_refresh: bool,
}

struct ControllerInner<S: TableSource, B: ViewBinding> {
    source: Arc<S>,
    buffer: RowBuffer<S>,
    binding: B,
    config: TableConfig,
    mode: Mutex<Mode>,
    auto_token: Mutex<Option<CancellationToken>>,
    watch_token: Mutex<Option<CancellationToken>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: TableSource, B: ViewBinding> ControllerInner<S, B> {
    fn mode(&self) -> Mode {
        *lock(&self.mode)
    }

    fn set_mode(&self, mode: Mode) {
        let mut guard = lock(&self.mode);
        if *guard != mode {
            debug!("table mode {:?} -> {:?}", *guard, mode);
            *guard = mode;
        }
    }

    fn cancel_auto(&self) {
        if let Some(token) = lock(&self.auto_token).take() {
            token.cancel();
        }
    }

    fn cancel_watch(&self) {
        if let Some(token) = lock(&self.watch_token).take() {
            token.cancel();
        }
    }

    /// Writes `(page, first_visible_key)` into the binding, or removes both
    /// slots while auto-refreshing; a live tail is not a stable bookmark.
    fn persist_view(&self) {
        match self.mode() {
            Mode::Unmounted => {}
            Mode::AutoRefreshing => {
                self.binding.remove(&self.config.page_param);
                self.binding.remove(&self.config.key_param);
            }
            Mode::Paged => {
                self.binding
                    .set(&self.config.page_param, &self.buffer.page().to_string());
                match self.buffer.first_visible_key() {
                    Some(key) => self
                        .binding
                        .set(&self.config.key_param, &self.source.key_to_string(&key)),
                    None => self.binding.remove(&self.config.key_param),
                }
            }
        }
    }

    async fn run_refresh(&self) {
        if let Err(e) = self.buffer.refresh().await {
            warn!("live-tail refresh failed: {e}");
        }
    }

    async fn run_move(&self, page: usize, anchor: Option<S::Key>) {
        if let Err(e) = self.buffer.move_to_page(page, anchor).await {
            warn!("move to page {page} failed: {e}");
        }
        self.persist_view();
    }
}

/// Public orchestrator over a [`RowBuffer`].
///
/// Cheap to clone (uses `Arc` internally); clones share one buffer. All
/// methods must run inside a tokio runtime, since the auto-refresh loop and
/// the watch reactions are spawned tasks.
///
/// # Example
///
/// ```ignore
/// let controller = TableController::new(TxSource::new(client), binding, config);
/// controller.mount().await;
/// // ... user clicks page 3:
/// controller.on_page_change(3).await;
/// let view = controller.view();
/// ```
pub struct TableController<S: TableSource, B: ViewBinding> {
    inner: Arc<ControllerInner<S, B>>,
}

impl<S: TableSource, B: ViewBinding> Clone for TableController<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TableSource, B: ViewBinding> TableController<S, B> {
    /// Creates an unmounted controller with an empty buffer.
    pub fn new(source: S, binding: B, config: TableConfig) -> Self {
        let source = Arc::new(source);
        let buffer = RowBuffer::new(Arc::clone(&source), config.clone());
        Self {
            inner: Arc::new(ControllerInner {
                source,
                buffer,
                binding,
                config,
                mode: Mutex::new(Mode::Unmounted),
                auto_token: Mutex::new(None),
                watch_token: Mutex::new(None),
            }),
        }
    }

    /// Mounts the controller.
    ///
    /// If the binding holds a persisted view, restores it: enters paged mode
    /// at that page, anchored at the persisted key (an unparsable key is
    /// logged and treated as no anchor). Otherwise starts the live tail.
    pub async fn mount(&self) {
        let inner = &self.inner;
        let page_raw = inner.binding.get(&inner.config.page_param);
        let key_raw = inner.binding.get(&inner.config.key_param);

        if page_raw.is_none() && key_raw.is_none() {
            self.start_auto_refresh();
            return;
        }

        let page = match page_raw.as_deref().map(str::parse::<usize>) {
            Some(Ok(page)) => page,
            Some(Err(_)) => {
                warn!("ignoring unparsable page bookmark {page_raw:?}");
                1
            }
            None => 1,
        };
        let anchor = key_raw.as_deref().and_then(|raw| {
            let key = inner.source.key_from_string(raw);
            if key.is_none() {
                warn!("ignoring unparsable key bookmark {raw:?}");
            }
            key
        });
        inner.set_mode(Mode::Paged);
        inner.run_move(page, anchor).await;
    }

    /// Unmounts the controller: stops the auto-refresh loop and all
    /// watchers, aborts the active operation, and clears the buffer.
    ///
    /// Deliberately does not write the cleared state to the binding, so a
    /// remount can restore the last persisted view.
    pub fn unmount(&self) {
        self.inner.cancel_auto();
        self.inner.cancel_watch();
        self.inner.set_mode(Mode::Unmounted);
        self.inner.buffer.clear();
    }

    /// Starts (or restarts) the live tail.
    ///
    /// The loop runs a refresh, persists, then arms a cancellable timer for
    /// the next tick; ticks never overlap. After `max_auto_update_count`
    /// ticks it self-stops into paged mode at page 1 and persists the view.
    pub fn start_auto_refresh(&self) {
        self.inner.cancel_auto();
        self.inner.set_mode(Mode::AutoRefreshing);
        self.inner.persist_view();

        let token = CancellationToken::new();
        *lock(&self.inner.auto_token) = Some(token.clone());
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            auto_refresh_loop(inner, token).await;
        });
    }

    /// Stops the live tail and settles on page 1 (an implicit
    /// `move_to_page(1, None)`), persisting the view.
    pub async fn stop_auto_refresh(&self) {
        self.inner.cancel_auto();
        self.inner.set_mode(Mode::Paged);
        self.inner.run_move(1, None).await;
    }

    /// Navigates to a page.
    ///
    /// While auto-refreshing this only stops the live tail (landing on
    /// page 1); the caller re-invokes navigation once the tail is stopped.
    pub async fn on_page_change(&self, page: usize) {
        if self.inner.mode() == Mode::AutoRefreshing {
            self.stop_auto_refresh().await;
            return;
        }
        self.inner.run_move(page, None).await;
    }

    /// Re-anchors the table at `key`, on page 1, stopping the live tail if
    /// it is active. Used when a parallel filter changes what the anchor
    /// means.
    pub async fn on_key_change(&self, key: S::Key) {
        if self.inner.mode() == Mode::AutoRefreshing {
            self.inner.cancel_auto();
            self.inner.set_mode(Mode::Paged);
        }
        self.inner.run_move(1, Some(key)).await;
    }

    /// Registers external change signals; any change clears the buffer and
    /// re-enters the active mode. Replaces any previously registered set.
    pub fn watch_and_reload(&self, sources: Vec<ChangeSignal>) {
        self.inner.cancel_watch();
        let token = CancellationToken::new();
        *lock(&self.inner.watch_token) = Some(token.clone());

        for mut rx in sources {
            let inner = Arc::clone(&self.inner);
            let token = token.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            handle_source_change(&inner).await;
                        }
                    }
                }
            });
        }
    }

    /// Clears the buffer and performs one live-tail fetch, regardless of
    /// mode and without altering it.
    pub async fn refresh(&self) {
        self.inner.buffer.clear();
        self.inner.run_refresh().await;
        self.inner.persist_view();
    }

    /// Clears the buffer and re-derives the view without fetching. Used
    /// before a controlled external reload.
    pub fn reset(&self) {
        self.inner.buffer.clear();
        self.inner.persist_view();
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.inner.mode()
    }

    /// Whether the live tail is active.
    pub fn is_auto_refreshing(&self) -> bool {
        self.inner.mode() == Mode::AutoRefreshing
    }

    /// Snapshot of the externally observable state.
    pub fn view(&self) -> TableView<S::Row, S::Key> {
        let buffer = &self.inner.buffer;
        TableView {
            rows: buffer.visible_rows(),
            page: buffer.page(),
            total_rows: buffer.total_rows(),
            first_visible_key: buffer.first_visible_key(),
            loading: buffer.is_loading(),
            auto_refresh: self.is_auto_refreshing(),
        }
    }

    /// Read access to the underlying buffer (counters, cache inspection).
    pub fn buffer(&self) -> &RowBuffer<S> {
        &self.inner.buffer
    }
}

/// One live-tail loop. Serialized ticks: the timer is re-armed only after
/// the previous refresh fully settles.
async fn auto_refresh_loop<S: TableSource, B: ViewBinding>(
    inner: Arc<ControllerInner<S, B>>,
    token: CancellationToken,
) {
    let mut ticks = 0u32;
    loop {
        if token.is_cancelled() {
            break;
        }
        inner.run_refresh().await;
        if token.is_cancelled() {
            break;
        }
        inner.persist_view();

        ticks += 1;
        if ticks >= inner.config.max_auto_update_count {
            debug!("auto-refresh reached {ticks} ticks; settling into paged mode");
            if inner.mode() == Mode::AutoRefreshing {
                inner.set_mode(Mode::Paged);
                inner.persist_view();
            }
            break;
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(inner.config.update_period) => {}
        }
    }
}

/// Reaction to a watched source changing: invalidate the cache, then resume
/// the active mode.
async fn handle_source_change<S: TableSource, B: ViewBinding>(inner: &Arc<ControllerInner<S, B>>) {
    debug!("watched source changed; invalidating buffer");
    inner.buffer.clear();
    match inner.mode() {
        Mode::Unmounted => return,
        Mode::AutoRefreshing => inner.run_refresh().await,
        Mode::Paged => {
            if let Err(e) = inner.buffer.move_to_page(1, None).await {
                warn!("reload after source change failed: {e}");
            }
        }
    }
    inner.persist_view();
}
