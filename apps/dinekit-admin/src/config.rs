//! Layered application configuration.
//!
//! Precedence, lowest first: built-in defaults, the YAML file passed with
//! `--config`, then `DINEKIT__*` environment variables (`__` separates nesting,
//! e.g. `DINEKIT__DATABASE__DSN`).
use std::path::Path;

use anyhow::{Context, Result};
use dinekit_db::DbConfig;
use dinekit_security::TenancyConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "DINEKIT__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DbConfig,
    pub tenancy: TenancyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// One JSON object per line instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// # Errors
    /// Returns an error if the file does not exist or the merged layers do not
    /// form a valid configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)?
            .extract()
            .context("invalid configuration")
    }

    fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let cfg = AppConfig::figment(None).unwrap().extract::<AppConfig>().unwrap();
        assert_eq!(cfg.database.dsn, "sqlite::memory:");
        assert_eq!(cfg.tenancy.header_name, "X-Tenant-ID");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  dsn: \"sqlite://dinekit.db?mode=rwc\"\n  acquire_timeout: 5s\ntenancy:\n  static_tenant: 3\nlogging:\n  json: true"
        )
        .unwrap();
        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.database.dsn, "sqlite://dinekit.db?mode=rwc");
        assert_eq!(
            cfg.database.acquire_timeout,
            Some(std::time::Duration::from_secs(5))
        );
        assert_eq!(cfg.tenancy.static_tenant.map(|t| t.get()), Some(3));
        assert_eq!(cfg.tenancy.header_name, "X-Tenant-ID");
        assert!(cfg.logging.json);
    }

    #[test]
    fn unknown_keys_and_missing_files_are_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "databse:\n  dsn: x").unwrap();
        assert!(AppConfig::load(Some(file.path())).is_err());

        assert!(AppConfig::load(Some(Path::new("/nonexistent/dinekit.yaml"))).is_err());
    }

    #[test]
    fn yaml_roundtrip_keeps_sections() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("database:"));
        assert!(yaml.contains("tenancy:"));
        assert!(yaml.contains("logging:"));
    }
}
