//! Keyset comparison operators.

/// Comparison operator of a keyset query: "rows whose key is {op} anchor".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Strictly greater than the anchor key.
    Gt,
    /// Greater than or equal to the anchor key.
    Gte,
    /// Strictly less than the anchor key.
    Lt,
    /// Less than or equal to the anchor key.
    Lte,
}

impl Operator {
    /// Makes the operator boundary-inclusive.
    ///
    /// `Gt` becomes `Gte` and `Lt` becomes `Lte`; inclusive operators are
    /// returned unchanged. Applied when an anchor row must itself be part of
    /// the fetched span, so the row is neither duplicated nor skipped.
    pub fn non_strict(self) -> Self {
        match self {
            Self::Gt => Self::Gte,
            Self::Lt => Self::Lte,
            other => other,
        }
    }

    /// Flips the direction of the comparison, preserving strictness.
    pub fn invert(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Gte => Self::Lte,
            Self::Lt => Self::Gt,
            Self::Lte => Self::Gte,
        }
    }

    /// Returns `true` if the anchor key itself satisfies the comparison.
    pub fn includes_anchor(self) -> bool {
        matches!(self, Self::Gte | Self::Lte)
    }
}
