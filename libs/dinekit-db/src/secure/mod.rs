//! Tenant isolation layer.
//!
//! - [`EntitySchema`] describes one table: keys, tenant field, allow-list, hooks
//! - [`ScopedQuery`] carries the tenant predicate as a fixed first term
//! - [`EntityRepository`] is the generic CRUD surface, bound to one tenant context
//! - [`guard::assert_ownership`] re-checks row ownership before every mutation
//! - [`without_tenant_scope`] opens a privilege-gated [`UnscopedRepository`]
//!
//! # Scoping rules
//!
//! | schema            | context with tenant        | context without tenant            |
//! |-------------------|----------------------------|-----------------------------------|
//! | tenant-scoped     | `tenant_field = T` on every statement | reads empty, writes `TenantRequired` |
//! | `no_tenant_scope` | no tenant term             | no tenant term                    |
pub mod error;
pub mod escape;
pub mod guard;
pub mod hooks;
mod ops;
pub mod query;
pub mod record;
pub mod repository;
pub mod schema;
mod values;

pub use error::{ErrorClass, ScopeError};
pub use escape::{UnscopedRepository, without_tenant_scope};
pub use guard::assert_ownership;
pub use hooks::{Defaults, FnHook, HookContext, HookError, HookPhase, JsonEncode, RecordHook};
pub use query::{FilterOp, ScopedQuery};
pub use record::{Filters, Record, RecordId};
pub use repository::{EntityRepository, Page};
pub use schema::{EntitySchema, EntitySchemaBuilder, TenantScoping};
