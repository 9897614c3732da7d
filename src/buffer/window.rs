//! Window and span arithmetic.
//!
//! Pure helpers over display ranks. A *rank* is a row's absolute position in
//! the table's fixed display order; rank 0 is the display head. The cached
//! window covers ranks `[first_rank, first_rank + len)`.

/// Half-open span of display ranks, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// First rank of the span.
    pub start: usize,
    /// One past the last rank of the span.
    pub end: usize,
}

impl Span {
    /// The span of display ranks a 1-based page occupies.
    pub fn for_page(page: usize, page_size: usize) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let start = (page - 1) * page_size;
        Self {
            start,
            end: start + page_size,
        }
    }

    /// Number of ranks in the span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether a cached window `[first_rank, first_rank + len)` fully covers
    /// this span.
    pub fn covered_by(&self, first_rank: usize, len: usize) -> bool {
        first_rank <= self.start && first_rank + len >= self.end
    }
}

/// The 1-based page number a display rank falls on.
pub fn page_of_rank(rank: usize, page_size: usize) -> usize {
    rank / page_size.max(1) + 1
}

/// Rounds a rank down to its page boundary.
pub fn aligned_floor(rank: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    rank - rank % page_size
}

/// The `start_index` (offset within the cache) for a requested span start,
/// clamped to the last page that has any cached rows when the dataset ran
/// out before the requested page.
pub fn clamped_start(first_rank: usize, len: usize, span_start: usize, page_size: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let last_rank = first_rank + len - 1;
    let last_page_start = aligned_floor(last_rank, page_size);
    span_start.min(last_page_start).max(first_rank) - first_rank
}
