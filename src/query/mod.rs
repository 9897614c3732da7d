//! Keyset query primitives.
//!
//! The small algebra the buffer uses to walk the keyspace in either
//! direction: comparison operators with their inversions, and sort order.

mod operator;
mod order;

pub use operator::*;
pub use order::*;

/// Operator that fetches rows coming *later* in the given display order.
///
/// For a descending table ("newest first") later rows have smaller keys, so
/// the walk uses `Lt`; for an ascending table it uses `Gt`. The query runs
/// in the display order itself, so results append directly.
pub fn forward_operator(order: SortOrder) -> Operator {
    match order {
        SortOrder::Asc => Operator::Gt,
        SortOrder::Desc => Operator::Lt,
    }
}

/// Operator that fetches rows coming *earlier* in the given display order.
///
/// The query runs in the inverted order (nearest rows first) and the chunk
/// is reversed before being prepended.
pub fn backward_operator(order: SortOrder) -> Operator {
    forward_operator(order).invert()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_operators() {
        assert_eq!(forward_operator(SortOrder::Desc), Operator::Lt);
        assert_eq!(forward_operator(SortOrder::Asc), Operator::Gt);
        assert_eq!(backward_operator(SortOrder::Desc), Operator::Gt);
        assert_eq!(backward_operator(SortOrder::Asc), Operator::Lt);
    }
}
