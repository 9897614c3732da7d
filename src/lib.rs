//! Bounded, paged views over keyset-paginated backends.
//!
//! Many backends only offer cursor pagination: "up to N rows whose key is
//! `{<, <=, >, >=}` K, sorted asc or desc", with no offsets and no random
//! access. This crate turns that primitive into a table engine with two
//! interaction modes:
//!
//! - a **live tail** that periodically re-displays the newest rows, and
//! - **random-access paging** by page number, where any page whose span is
//!   already cached is free to revisit.
//!
//! The engine minimizes round-trips (over-fetched rows are kept as shadow
//! pages), stays correct under rapid overlapping user actions (a newer
//! operation supersedes an in-flight one and its stale result is discarded),
//! and persists the current view (page number + anchor key) into an external
//! binding so a reload can restore it.
//!
//! Use sites implement [`TableSource`] (the row key, a lossless string
//! codec for keys, and the `load` fetch) and drive a [`TableController`].

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod query;

mod source;

pub use buffer::Outcome;
pub use buffer::RowBuffer;
pub use config::TableConfig;
pub use controller::ChangeSignal;
pub use controller::MemoryBinding;
pub use controller::Mode;
pub use controller::TableController;
pub use controller::TableView;
pub use controller::ViewBinding;
pub use error::FetchError;
pub use query::Operator;
pub use query::SortOrder;
pub use source::*;
