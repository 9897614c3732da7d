//! RowBuffer behavior: tail loads, keyset walks, shadow pages, supersession.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockSource;
use tailtable::Operator;
use tailtable::Outcome;
use tailtable::RowBuffer;
use tailtable::SortOrder;
use tailtable::TableConfig;
use tailtable::TableSource;

fn buffer(source: &Arc<MockSource>, config: TableConfig) -> RowBuffer<Arc<MockSource>> {
    RowBuffer::new(Arc::new(Arc::clone(source)), config)
}

#[test]
fn key_string_round_trip() {
    let source = MockSource::with_rows(0);
    for key in [0u64, 1, 19, u64::MAX] {
        let raw = source.key_to_string(&key);
        assert_eq!(source.key_from_string(&raw), Some(key));
    }
    assert_eq!(source.key_from_string("not-a-key"), None);
}

#[tokio::test]
async fn boundary_operators() {
    let source = MockSource::with_rows(50);

    let asc = |op, a| source.load(Some(a), op, SortOrder::Asc, 10);
    assert_eq!(asc(Operator::Lt, 7).await.unwrap().unwrap(), (0..=6).collect::<Vec<_>>());
    assert_eq!(asc(Operator::Lte, 7).await.unwrap().unwrap(), (0..=7).collect::<Vec<_>>());
    assert_eq!(asc(Operator::Gt, 7).await.unwrap().unwrap(), (8..=17).collect::<Vec<_>>());
    assert_eq!(asc(Operator::Gte, 7).await.unwrap().unwrap(), (7..=16).collect::<Vec<_>>());

    let desc = |op, a| source.load(Some(a), op, SortOrder::Desc, 10);
    assert_eq!(desc(Operator::Lt, 7).await.unwrap().unwrap(), (0..=6).rev().collect::<Vec<_>>());
    assert_eq!(desc(Operator::Lte, 7).await.unwrap().unwrap(), (0..=7).rev().collect::<Vec<_>>());
    assert_eq!(desc(Operator::Gt, 7).await.unwrap().unwrap(), (40..=49).rev().collect::<Vec<_>>());
    assert_eq!(desc(Operator::Gte, 7).await.unwrap().unwrap(), (40..=49).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn initial_tail_load() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());

    assert_eq!(buf.refresh().await.unwrap(), Outcome::Applied);
    assert_eq!(buf.visible_rows(), (40..=49).rev().collect::<Vec<_>>());
    assert_eq!(buf.page(), 1);
    assert_eq!(buf.first_visible_key(), Some(49));
}

#[tokio::test]
async fn live_tail_growth_slides_the_window() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());
    buf.refresh().await.unwrap();
    assert_eq!(buf.total_rows(), 10); // still the presumed estimate

    // Two new rows appear; the window slides, its size unchanged.
    source.grow(2);
    buf.refresh().await.unwrap();
    assert_eq!(buf.visible_rows(), (42..=51).rev().collect::<Vec<_>>());
    assert_eq!(buf.total_rows(), 12);

    // A full page of new rows; the previous head fell out of the chunk.
    source.grow(10);
    buf.refresh().await.unwrap();
    assert_eq!(buf.visible_rows(), (52..=61).rev().collect::<Vec<_>>());
    assert_eq!(buf.total_rows(), 22);
}

#[tokio::test]
async fn live_tail_retention_is_bounded() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());
    buf.refresh().await.unwrap();

    for _ in 0..20 {
        source.grow(5);
        buf.refresh().await.unwrap();
    }
    // presumed_row_count = 10, retention factor 4
    assert!(buf.cached_len() <= 40, "cache grew to {}", buf.cached_len());
    // The view always shows the newest page.
    assert_eq!(buf.first_visible_key(), Some(149));
}

#[tokio::test]
async fn dataset_shrink_is_observed() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default().with_presumed_row_count(100));
    buf.refresh().await.unwrap();
    // 50 rows exist but the chunk asked for 100: exhaustion observed.
    assert_eq!(buf.total_rows(), 50);
}

#[tokio::test]
async fn shadow_pages_make_revisits_free() {
    let source = MockSource::with_rows(100);
    let config = TableConfig::default().with_max_limit(12);
    let buf = buffer(&source, config);

    // Cold jump to page 4: walks from the head in 12-row chunks.
    buf.move_to_page(4, None).await.unwrap();
    assert_eq!(source.calls(), 4);
    assert_eq!(buf.visible_rows(), (60..=69).rev().collect::<Vec<_>>());
    assert_eq!(buf.page(), 4);

    // Page 3 fell inside the over-fetched chunks: zero further loads.
    buf.move_to_page(3, None).await.unwrap();
    assert_eq!(source.calls(), 4);
    assert_eq!(buf.visible_rows(), (70..=79).rev().collect::<Vec<_>>());

    // Page 5 needs one more chunk off the tail edge.
    buf.move_to_page(5, None).await.unwrap();
    assert_eq!(source.calls(), 5);
    assert_eq!(buf.visible_rows(), (50..=59).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn anchored_move_restores_a_bookmark() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());

    // Key 19 is the first row of page 4 in a 50-row descending table.
    buf.move_to_page(4, Some(19)).await.unwrap();
    assert_eq!(buf.page(), 4);
    assert_eq!(buf.first_visible_key(), Some(19));
    assert_eq!(buf.visible_rows(), (10..=19).rev().collect::<Vec<_>>());
    assert_eq!(buf.total_rows(), 50);
}

#[tokio::test]
async fn backward_walk_extends_the_head_edge() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());
    buf.move_to_page(4, Some(19)).await.unwrap();

    // Page 3 lies before the cached window; the head edge is walked with
    // the inverted operator and order.
    buf.move_to_page(3, None).await.unwrap();
    assert_eq!(buf.page(), 3);
    assert_eq!(buf.visible_rows(), (20..=29).rev().collect::<Vec<_>>());
    assert_eq!(buf.total_rows(), 50);
}

#[tokio::test]
async fn move_past_the_end_clamps_to_the_last_page() {
    let source = MockSource::with_rows(23);
    let buf = buffer(&source, TableConfig::default());

    buf.move_to_page(9, None).await.unwrap();
    assert_eq!(buf.page(), 3);
    assert_eq!(buf.visible_rows(), vec![2, 1, 0]);
    assert_eq!(buf.total_rows(), 23);
}

#[tokio::test(start_paused = true)]
async fn newer_move_supersedes_older() {
    let source = MockSource::with_rows_and_latency(1000, Duration::from_millis(5));
    let buf = buffer(&source, TableConfig::default());

    let (first, second) = tokio::join!(buf.move_to_page(10, None), buf.move_to_page(2, None));
    assert_eq!(first.unwrap(), Outcome::Superseded);
    assert_eq!(second.unwrap(), Outcome::Applied);
    assert_eq!(buf.page(), 2);
    assert_eq!(buf.aborted_move_count(), 1);
    assert_eq!(buf.aborted_refresh_count(), 0);
    assert!(!buf.is_loading());
}

#[tokio::test(start_paused = true)]
async fn clear_aborts_the_pending_operation() {
    let source = MockSource::with_rows_and_latency(100, Duration::from_millis(5));
    let config = TableConfig::default();
    let buf = Arc::new(RowBuffer::new(Arc::new(Arc::clone(&source)), config));

    let pending = {
        let buf = Arc::clone(&buf);
        tokio::spawn(async move { buf.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;
    buf.clear();

    assert_eq!(pending.await.unwrap().unwrap(), Outcome::Superseded);
    assert_eq!(buf.aborted_refresh_count(), 1);
    assert!(buf.visible_rows().is_empty());
    assert_eq!(buf.total_rows(), 10);
}

#[tokio::test]
async fn fetch_failure_leaves_the_cache_untouched() {
    let source = MockSource::with_rows(50);
    let buf = buffer(&source, TableConfig::default());
    buf.refresh().await.unwrap();
    let before = buf.visible_rows();

    source.fail(true);
    assert!(buf.refresh().await.is_err());
    assert!(buf.move_to_page(3, None).await.is_err());
    assert_eq!(buf.visible_rows(), before);
    assert!(!buf.is_loading());

    // A failed operation is not a supersession.
    source.fail(false);
    buf.refresh().await.unwrap();
    assert_eq!(buf.aborted_refresh_count(), 0);
    assert_eq!(buf.aborted_move_count(), 0);
}
