//! Sort order for keyset walks.

/// Sort direction of a keyset query, and of the table's display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (smallest key first).
    Asc,
    /// Descending order (largest key first).
    Desc,
}

impl SortOrder {
    /// Returns the opposite direction.
    ///
    /// Used when walking the cache's head edge: rows that come *earlier* in
    /// display order are fetched in the inverted order and reversed before
    /// they are prepended.
    pub fn invert(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert() {
        assert_eq!(SortOrder::Asc.invert(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.invert(), SortOrder::Asc);
        assert_eq!(SortOrder::Asc.invert().invert(), SortOrder::Asc);
    }
}
