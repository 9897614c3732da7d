//! The fetch capability consumed by the buffer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::query::Operator;
use crate::query::SortOrder;

/// Capability set a concrete table must supply: a key per row, a lossless
/// string codec for keys, and the keyset fetch primitive.
///
/// `load` is the only backend touchpoint the engine has. It must be
/// stateless, side-effect-free and retry-safe: a superseded operation's
/// result is simply discarded, never rolled back.
///
/// # Example
///
/// ```ignore
/// struct TxSource { client: ExplorerClient }
///
/// #[async_trait]
/// impl TableSource for TxSource {
///     type Row = Tx;
///     type Key = u64;
///
///     fn key_for(&self, row: &Tx) -> u64 {
///         row.nonce
///     }
///
///     fn key_to_string(&self, key: &u64) -> String {
///         key.to_string()
///     }
///
///     fn key_from_string(&self, raw: &str) -> Option<u64> {
///         raw.parse().ok()
///     }
///
///     async fn load(
///         &self,
///         anchor: Option<u64>,
///         op: Operator,
///         order: SortOrder,
///         limit: usize,
///     ) -> Result<Option<Vec<Tx>>, FetchError> {
///         self.client.transactions(anchor, op, order, limit).await
///     }
/// }
/// ```
#[async_trait]
pub trait TableSource: Send + Sync + 'static {
    /// One displayed row. Opaque to the engine.
    type Row: Clone + Send + Sync + 'static;

    /// The backend's sort key. Totally ordered on the backend side.
    type Key: Clone + PartialEq + Send + Sync + 'static;

    /// Returns the sort key of a row.
    fn key_for(&self, row: &Self::Row) -> Self::Key;

    /// Serializes a key for the external binding.
    ///
    /// Must round-trip: `key_from_string(&key_to_string(&k)) == Some(k)`.
    fn key_to_string(&self, key: &Self::Key) -> String;

    /// Parses a key previously produced by [`key_to_string`].
    ///
    /// Returns `None` for unparsable input; the controller treats that as
    /// "no anchor" and falls back to default paging.
    ///
    /// [`key_to_string`]: TableSource::key_to_string
    fn key_from_string(&self, raw: &str) -> Option<Self::Key>;

    /// Fetches up to `limit` rows whose key is `{op} anchor`, sorted by
    /// `order`. A `None` anchor means "from the extreme end of the keyspace
    /// in that order".
    ///
    /// Returning fewer rows than `limit` signals exhaustion in that
    /// direction. Returning `Ok(None)` signals "no backend configured yet"
    /// and is treated as an empty, non-error result.
    async fn load(
        &self,
        anchor: Option<Self::Key>,
        op: Operator,
        order: SortOrder,
        limit: usize,
    ) -> Result<Option<Vec<Self::Row>>, FetchError>;
}

#[async_trait]
impl<S: TableSource> TableSource for Arc<S> {
    type Row = S::Row;
    type Key = S::Key;

    fn key_for(&self, row: &Self::Row) -> Self::Key {
        (**self).key_for(row)
    }

    fn key_to_string(&self, key: &Self::Key) -> String {
        (**self).key_to_string(key)
    }

    fn key_from_string(&self, raw: &str) -> Option<Self::Key> {
        (**self).key_from_string(raw)
    }

    async fn load(
        &self,
        anchor: Option<Self::Key>,
        op: Operator,
        order: SortOrder,
        limit: usize,
    ) -> Result<Option<Vec<Self::Row>>, FetchError> {
        (**self).load(anchor, op, order, limit).await
    }
}
