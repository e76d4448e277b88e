use std::env;
use std::path::PathBuf;

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file path; in-memory when absent.
    pub database_path: Option<PathBuf>,
    /// Name of the column holding JSON-encoded properties.
    pub properties_column: String,
}

impl StoreConfig {
    /// Load configuration from environment variables with sensible
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("ANNOLAKE_DB").ok().map(PathBuf::from),
            properties_column: env::var("ANNOLAKE_PROPERTIES_COLUMN")
                .unwrap_or_else(|_| "properties".to_string()),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            properties_column: "properties".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_memory() {
        let config = StoreConfig::default();
        assert!(config.database_path.is_none());
        assert_eq!(config.properties_column, "properties");
    }
}
