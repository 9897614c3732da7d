//! Table configuration

use std::time::Duration;

use crate::query::SortOrder;

/// Configuration for a table controller and its row buffer.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tailtable::TableConfig;
///
/// let config = TableConfig::default()
///     .with_page_size(25)
///     .with_update_period(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Rows per displayed page.
    ///
    /// Default: 10
    pub page_size: usize,

    /// Initial total-row estimate before any load completes, and the chunk
    /// size of the live-tail fetch.
    ///
    /// Default: 10
    pub presumed_row_count: usize,

    /// Interval between auto-refresh ticks.
    ///
    /// Default: 10 seconds
    pub update_period: Duration,

    /// Number of auto-refresh ticks before the controller self-stops and
    /// transitions to static paging.
    ///
    /// Default: 100
    pub max_auto_update_count: u32,

    /// Hard cap on the `limit` of any single backend request.
    ///
    /// Default: 100
    pub max_limit: usize,

    /// Binding slot holding the persisted page number.
    ///
    /// Default: `"page"`
    pub page_param: String,

    /// Binding slot holding the persisted anchor key.
    ///
    /// Default: `"key"`
    pub key_param: String,

    /// The table's fixed display order.
    ///
    /// Default: [`SortOrder::Desc`] (newest rows first, the live-tail
    /// orientation)
    pub order: SortOrder,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            presumed_row_count: 10,
            update_period: Duration::from_secs(10),
            max_auto_update_count: 100,
            max_limit: 100,
            page_param: "page".to_string(),
            key_param: "key".to_string(),
            order: SortOrder::Desc,
        }
    }
}

impl TableConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the presumed row count.
    pub fn with_presumed_row_count(mut self, count: usize) -> Self {
        self.presumed_row_count = count;
        self
    }

    /// Sets the auto-refresh tick interval.
    pub fn with_update_period(mut self, period: Duration) -> Self {
        self.update_period = period;
        self
    }

    /// Sets the number of ticks before auto-refresh self-stops.
    pub fn with_max_auto_update_count(mut self, count: u32) -> Self {
        self.max_auto_update_count = count;
        self
    }

    /// Sets the per-request row limit.
    pub fn with_max_limit(mut self, limit: usize) -> Self {
        self.max_limit = limit;
        self
    }

    /// Sets the binding slot names for the persisted view.
    pub fn with_params(
        mut self,
        page_param: impl Into<String>,
        key_param: impl Into<String>,
    ) -> Self {
        self.page_param = page_param.into();
        self.key_param = key_param.into();
        self
    }

    /// Sets the table's display order.
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}
