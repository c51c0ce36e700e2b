//! Service configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! database_path = "database.json"
//! signing_secret = "change-me"
//! hash_cost = 600000
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chirpy_auth::DEFAULT_HASH_COST;
use serde::Deserialize;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

/// Settings for one [`crate::Chirpy`] instance.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Backing JSON document.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Symmetric key for session tokens.
    pub signing_secret: String,

    /// PBKDF2 iteration count for new credential hashes.
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database.json")
}

fn default_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

impl ServiceConfig {
    /// Build a config with defaults for everything but the secret.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            database_path: default_database_path(),
            signing_secret: signing_secret.into(),
            hash_cost: default_hash_cost(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ServiceResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ServiceError::Config {
            reason: format!("failed to parse TOML config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServiceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ServiceError::Config {
            reason: format!("failed to read config file {}: {e}", path.display()),
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "configuration loaded from file");
        Ok(config)
    }

    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.signing_secret.is_empty() {
            return Err(ServiceError::Config {
                reason: "signing_secret must not be empty".into(),
            });
        }
        if self.hash_cost == 0 {
            return Err(ServiceError::Config {
                reason: "hash_cost must be greater than zero".into(),
            });
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(ServiceError::Config {
                reason: "database_path must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("database_path", &self.database_path)
            .field("signing_secret", &"<redacted>")
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = ServiceConfig::from_toml_str(r#"signing_secret = "s3cret""#).unwrap();
        assert_eq!(config.database_path, PathBuf::from("database.json"));
        assert_eq!(config.hash_cost, DEFAULT_HASH_COST);
        assert_eq!(config.signing_secret, "s3cret");
    }

    #[test]
    fn full_config_parses() {
        let config = ServiceConfig::from_toml_str(
            r#"
            database_path = "/var/lib/chirpy/db.json"
            signing_secret = "abc"
            hash_cost = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/chirpy/db.json"));
        assert_eq!(config.hash_cost, 1000);
    }

    #[test]
    fn missing_secret_rejected() {
        let err = ServiceConfig::from_toml_str("hash_cost = 1000").unwrap_err();
        assert!(matches!(err, ServiceError::Config { .. }));
    }

    #[test]
    fn empty_secret_rejected() {
        let err = ServiceConfig::from_toml_str(r#"signing_secret = """#).unwrap_err();
        assert!(matches!(err, ServiceError::Config { .. }));
    }

    #[test]
    fn zero_cost_rejected() {
        let err = ServiceConfig::from_toml_str("signing_secret = \"x\"\nhash_cost = 0").unwrap_err();
        assert!(matches!(err, ServiceError::Config { .. }));
    }

    #[test]
    fn unknown_field_rejected() {
        let err =
            ServiceConfig::from_toml_str("signing_secret = \"x\"\nport = 8080").unwrap_err();
        assert!(matches!(err, ServiceError::Config { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chirpy.toml");
        std::fs::write(&path, "signing_secret = \"from-file\"\nhash_cost = 10").unwrap();

        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.hash_cost, 10);

        let missing = ServiceConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ServiceError::Config { .. }));
    }

    #[test]
    fn debug_redacts_secret() {
        let config = ServiceConfig::new("do-not-print");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("do-not-print"));
        assert!(rendered.contains("<redacted>"));
    }
}
