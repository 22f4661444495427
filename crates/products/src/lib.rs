//! Products domain module.
//!
//! This crate contains the catalog model and the rule used to match uploaded
//! rows against it, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage).

pub mod product;

pub use product::{CatalogKey, NewProduct, Product};
pub use stockwise_core::ProductId;
