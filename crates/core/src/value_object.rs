//! Value object trait: equality by value, not identity.

/// Marker trait for immutable values compared by their attributes.
///
/// A `Quantity` of 10 is interchangeable with any other `Quantity` of 10; an
/// inventory record is not (see [`crate::Entity`]). Operations on value objects
/// return new values instead of mutating in place.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
