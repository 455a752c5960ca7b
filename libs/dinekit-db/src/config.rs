use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `database` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// Connection string, e.g. `sqlite://dinekit.db?mode=rwc` or `postgres://...`.
    pub dsn: String,

    /// Pool size. In-memory `SQLite` defaults to a single connection since every
    /// pooled connection would otherwise see its own empty database.
    pub max_conns: Option<u32>,

    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,

    /// Emit sqlx statement logs.
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            dsn: "sqlite::memory:".to_owned(),
            max_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            sqlx_logging: false,
        }
    }
}

impl DbConfig {
    #[must_use]
    pub fn with_dsn(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    pub(crate) fn is_memory_sqlite(&self) -> bool {
        let dsn = self.dsn.trim();
        dsn.starts_with("sqlite::memory:") || dsn.contains("mode=memory")
    }

    pub(crate) fn effective_max_conns(&self) -> u32 {
        match self.max_conns {
            Some(n) => n.max(1),
            None if self.is_memory_sqlite() => 1,
            None => 10,
        }
    }
}
