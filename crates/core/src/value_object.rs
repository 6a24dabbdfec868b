//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two instances holding the same values are the
/// same thing. `Money`, discount specifications and shipping selections are value
/// objects; products and orders are entities.
///
/// To "modify" a value object, build a new one. The bounds keep them cheap to copy
/// into snapshots (an order freezes the prices it was sold at) and easy to compare
/// in tests.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Percent(Decimal);
///
/// impl ValueObject for Percent {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
