//! # Configuration
//!
//! [`Settings`] are read from `ORDER_DESK_*` environment variables. Every
//! field has a default, so an empty environment yields a working desk.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ORDER_DESK_STORE_NAME` | `store_name` | `Order Desk` |
//! | `ORDER_DESK_NOTIFY_CAPACITY` | `notify_capacity` | `16` |
//! | `ORDER_DESK_MAX_QUANTITY` | `max_quantity` | `50` |
//! | `ORDER_DESK_SEED_CATALOG` | `seed_catalog` | `true` |
//!
//! Unknown `ORDER_DESK_*` variables are ignored.

use crate::error::DeskError;
use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "ORDER_DESK_";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_store_name")]
    pub store_name: String,
    /// Capacity of the notification queue.
    #[serde(default = "default_notify_capacity", deserialize_with = "parsed")]
    pub notify_capacity: usize,
    /// Largest quantity a single order may carry.
    #[serde(default = "default_max_quantity", deserialize_with = "parsed")]
    pub max_quantity: u32,
    /// Fill the catalog with demo products on startup.
    #[serde(default = "default_seed_catalog", deserialize_with = "parsed")]
    pub seed_catalog: bool,
}

fn default_store_name() -> String {
    "Order Desk".to_string()
}

fn default_notify_capacity() -> usize {
    16
}

fn default_max_quantity() -> u32 {
    50
}

fn default_seed_catalog() -> bool {
    true
}

/// Environment values are always strings.
fn parsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse().map_err(serde::de::Error::custom)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            notify_capacity: default_notify_capacity(),
            max_quantity: default_max_quantity(),
            seed_catalog: default_seed_catalog(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, DeskError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds settings from `(name, value)` pairs, keeping only names with
    /// the [`ENV_PREFIX`].
    pub fn from_vars<I>(vars: I) -> Result<Self, DeskError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let fields = vars.into_iter().filter_map(|(name, value)| {
            name.strip_prefix(ENV_PREFIX)
                .map(|field| (field.to_ascii_lowercase(), value))
        });
        Settings::deserialize(MapDeserializer::<_, ValueError>::new(fields))
            .map_err(|e| DeskError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), DeskError> {
        if self.store_name.trim().is_empty() {
            return Err(DeskError::Config("store_name must not be empty".into()));
        }
        if self.notify_capacity == 0 {
            return Err(DeskError::Config("notify_capacity must be positive".into()));
        }
        if self.max_quantity == 0 {
            return Err(DeskError::Config("max_quantity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let settings = Settings::from_vars(vars(&[("PATH", "/bin")])).unwrap();
        assert_eq!(settings, Settings::default());
        settings.validate().unwrap();
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let settings = Settings::from_vars(vars(&[
            ("ORDER_DESK_STORE_NAME", "Corner Shop"),
            ("ORDER_DESK_MAX_QUANTITY", " 5 "),
            ("ORDER_DESK_SEED_CATALOG", "false"),
            ("ORDER_DESK_UNUSED", "whatever"),
        ]))
        .unwrap();
        assert_eq!(settings.store_name, "Corner Shop");
        assert_eq!(settings.max_quantity, 5);
        assert!(!settings.seed_catalog);
        assert_eq!(settings.notify_capacity, 16);
    }

    #[test]
    fn malformed_numbers_are_config_errors() {
        let err = Settings::from_vars(vars(&[("ORDER_DESK_NOTIFY_CAPACITY", "many")])).unwrap_err();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let settings = Settings {
            max_quantity: 0,
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(DeskError::Config("max_quantity must be positive".into()))
        );
    }
}
