use serde::{Deserialize, Serialize};

use crate::error::AdapterResult;

pub const DEFAULT_DATABASE_NAME: &str = "doclink-application-db";

/// Adapter settings. Every field is optional in TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Name of the backing database; also used in log fields.
    pub database_name: String,
    /// Whether finds expand eager relationships when the caller does not say.
    pub expand_by_default: bool,
    /// When off, writes only touch the owning document.
    pub synchronize_inverses: bool,
}

impl AdapterConfig {
    pub fn from_toml_str(s: &str) -> AdapterResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            expand_by_default: true,
            synchronize_inverses: true,
        }
    }
}
