//! Configuration loading and representation.
//!
//! Everything is read from environment variables once at startup. Unset
//! variables fall back to development defaults; set-but-invalid values are
//! errors rather than silently ignored.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Longest accepted `ANALYTICS_CACHE_TTL_SECS` (one day).
pub const MAX_ANALYTICS_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub analytics_cache_ttl: Duration,
    pub analytics_cache_capacity: usize,
    /// Lot used when a create or upload row does not name one.
    pub default_lot_number: String,
    /// Location used when a create or upload row does not name one.
    pub default_location: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            use_persistent_stores: false,
            database_url: None,
            database_max_connections: 10,
            analytics_cache_ttl: Duration::from_secs(60),
            analytics_cache_capacity: 128,
            default_lot_number: "DEFAULT".to_string(),
            default_location: "MAIN".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => parse("BIND_ADDR", &v)?,
            None => defaults.bind_addr,
        };
        let use_persistent_stores = match get("USE_PERSISTENT_STORES") {
            Some(v) => parse("USE_PERSISTENT_STORES", &v.to_ascii_lowercase())?,
            None => defaults.use_persistent_stores,
        };
        let database_url = get("DATABASE_URL");
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(v) => positive("DATABASE_MAX_CONNECTIONS", parse("DATABASE_MAX_CONNECTIONS", &v)?)?,
            None => defaults.database_max_connections,
        };
        let analytics_cache_ttl = match get("ANALYTICS_CACHE_TTL_SECS") {
            Some(v) => {
                let secs: u64 = parse("ANALYTICS_CACHE_TTL_SECS", &v)?;
                if secs > MAX_ANALYTICS_CACHE_TTL_SECS {
                    return Err(ConfigError::Invalid {
                        var: "ANALYTICS_CACHE_TTL_SECS",
                        value: v,
                        reason: format!("must be at most {MAX_ANALYTICS_CACHE_TTL_SECS}"),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.analytics_cache_ttl,
        };
        let analytics_cache_capacity = match get("ANALYTICS_CACHE_CAPACITY") {
            Some(v) => positive("ANALYTICS_CACHE_CAPACITY", parse("ANALYTICS_CACHE_CAPACITY", &v)?)?,
            None => defaults.analytics_cache_capacity,
        };

        Ok(Self {
            bind_addr,
            use_persistent_stores,
            database_url,
            database_max_connections,
            analytics_cache_ttl,
            analytics_cache_capacity,
            default_lot_number: get("DEFAULT_LOT_NUMBER")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.default_lot_number),
            default_location: get("DEFAULT_LOCATION")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.default_location),
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn positive<T>(var: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default + std::fmt::Display,
{
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(load(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let cfg = load(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("USE_PERSISTENT_STORES", "TRUE"),
            ("DATABASE_URL", "postgres://localhost/stockwise"),
            ("ANALYTICS_CACHE_TTL_SECS", "5"),
            ("DEFAULT_LOCATION", " DOCK-2 "),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert!(cfg.use_persistent_stores);
        assert_eq!(cfg.analytics_cache_ttl, Duration::from_secs(5));
        assert_eq!(cfg.default_location, "DOCK-2");
    }

    #[test]
    fn persistent_mode_requires_database_url() {
        let err = load(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = load(&[("ANALYTICS_CACHE_TTL_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANALYTICS_CACHE_TTL_SECS", .. }));

        let err = load(&[("ANALYTICS_CACHE_CAPACITY", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANALYTICS_CACHE_CAPACITY", .. }));
    }

    #[test]
    fn cache_ttl_is_capped_at_one_day() {
        let cfg = load(&[("ANALYTICS_CACHE_TTL_SECS", "86400")]).unwrap();
        assert_eq!(cfg.analytics_cache_ttl, Duration::from_secs(86_400));

        let max = u64::MAX.to_string();
        let err = load(&[("ANALYTICS_CACHE_TTL_SECS", max.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ANALYTICS_CACHE_TTL_SECS", .. }));
    }
}
