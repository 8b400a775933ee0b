//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// A cart line's product snapshot and an order's customer details are value
/// objects: they are captured once, never edited in place, and compared field
/// by field.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
