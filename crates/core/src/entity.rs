//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products and inventory records are entities: two records with the same
/// quantities are still different records if their ids differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
