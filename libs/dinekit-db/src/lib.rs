#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant-isolated data access for Dinekit.
//!
//! Every read and write issued through this crate is scoped to the tenant of the
//! [`TenantContext`](dinekit_security::TenantContext) the repository was built
//! with. Cross-tenant access exists only through the privilege-gated escape hatch
//! ([`secure::without_tenant_scope`]).
//!
//! ```ignore
//! let db = DbHandle::connect(&cfg.database).await?;
//! let dishes = db.repository(schemas::dishes(), ctx);
//! let visible = dishes.find_all(&Filters::new(), None, None).await?;
//! ```
pub mod config;
pub mod handle;
pub mod secure;

pub use config::DbConfig;
pub use handle::{DbEngine, DbError, DbHandle};
pub use secure::{
    EntityRepository, EntitySchema, ErrorClass, Filters, Page, Record, RecordId, ScopeError,
    ScopedQuery, UnscopedRepository, without_tenant_scope,
};

// Re-exported so downstream crates can name the connection types repositories
// are generic over without depending on sea-orm directly.
pub use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction};
