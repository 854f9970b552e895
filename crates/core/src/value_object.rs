//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Two value objects with the same attributes are interchangeable; an
/// order line for `(order-1, LAMP, 3)` is the same line wherever it shows
/// up. Value objects are immutable once built.
pub trait ValueObject: Clone + PartialEq + Eq + core::hash::Hash + core::fmt::Debug {}
