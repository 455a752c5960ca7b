//! Database handle: connection setup, repository factory, transactions, migrations.
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dinekit_security::TenantContext;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use thiserror::Error;

use crate::DbConfig;
use crate::secure::{EntityRepository, EntitySchema, ScopeError};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Main handle.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    conn: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine, DbError> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }

    /// Connect and build handle.
    ///
    /// # Errors
    /// Returns an error if the DSN is unknown, its engine is not compiled in,
    /// or the connection fails.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, DbError> {
        let engine = Self::detect(&cfg.dsn)?;
        ensure_compiled(engine)?;

        let mut opts = ConnectOptions::new(cfg.dsn.trim().to_owned());
        opts.max_connections(cfg.effective_max_conns())
            .sqlx_logging(cfg.sqlx_logging);
        if let Some(timeout) = cfg.acquire_timeout {
            opts.acquire_timeout(timeout);
        }

        let conn = Database::connect(opts).await?;
        tracing::info!(engine = ?engine, "database connected");
        Ok(Self { engine, conn })
    }

    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Connection for typed repositories and [`ScopedQuery`](crate::ScopedQuery)
    /// execution. Scoping is carried by the queries and repositories built on it,
    /// not by the connection.
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Repository over `schema` bound to `ctx`.
    #[must_use]
    pub fn repository(
        &self,
        schema: Arc<EntitySchema>,
        ctx: TenantContext,
    ) -> EntityRepository<'_, DatabaseConnection> {
        EntityRepository::new(&self.conn, schema, ctx)
    }

    /// Run `f` inside a transaction. Commits when `f` returns `Ok`, rolls back otherwise.
    ///
    /// ```ignore
    /// db.in_transaction(move |tx| Box::pin(async move {
    ///     let repo = EntityRepository::new(tx, schema, ctx);
    ///     repo.insert(record).await
    /// })).await?;
    /// ```
    ///
    /// # Errors
    /// Returns the callback's error, or `ScopeError::Db` if begin/commit fails.
    pub async fn in_transaction<T, F>(&self, f: F) -> Result<T, ScopeError>
    where
        T: Send,
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, ScopeError>> + Send + 'c>>
            + Send,
    {
        self.conn
            .transaction::<_, T, ScopeError>(f)
            .await
            .map_err(|e| match e {
                sea_orm::TransactionError::Transaction(err) => err,
                sea_orm::TransactionError::Connection(db_err) => ScopeError::Db(db_err),
            })
    }

    /// Apply all pending migrations of `M`.
    ///
    /// # Errors
    /// Returns `DbError::Sea` if a migration fails.
    pub async fn run_migrations<M: MigratorTrait>(&self) -> Result<(), DbError> {
        M::up(&self.conn, None).await?;
        tracing::info!("migrations applied");
        Ok(())
    }

    /// Close the pool.
    ///
    /// # Errors
    /// Returns `DbError::Sea` if the pool fails to close cleanly.
    pub async fn close(self) -> Result<(), DbError> {
        self.conn.close().await?;
        Ok(())
    }
}

fn ensure_compiled(engine: DbEngine) -> Result<(), DbError> {
    match engine {
        DbEngine::Postgres if !cfg!(feature = "pg") => {
            Err(DbError::FeatureDisabled("PostgreSQL feature not enabled"))
        }
        DbEngine::Sqlite if !cfg!(feature = "sqlite") => {
            Err(DbError::FeatureDisabled("SQLite feature not enabled"))
        }
        _ => Ok(()),
    }
}
