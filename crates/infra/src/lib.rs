//! Infrastructure layer: configuration, storage, caching and application services.

pub mod cache;
pub mod config;
pub mod service;
pub mod store;

pub use config::{AppConfig, ConfigError};
