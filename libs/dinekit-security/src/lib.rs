#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant identity primitives shared by every Dinekit data-access path.
//!
//! - [`TenantId`]: validated restaurant identifier
//! - [`TenantContext`]: immutable "who is the active tenant" value for one unit of work
//! - [`resolver`]: turns session, header and static-override inputs into a context
//! - [`PrivilegeAssertion`]: explicit proof of an administrative role, required by the
//!   escape hatch in `dinekit-db`
pub mod config;
pub mod context;
pub mod privilege;
pub mod resolver;
pub mod tenant_id;

pub use config::TenancyConfig;
pub use context::{ContextOrigin, TenantContext};
pub use privilege::PrivilegeAssertion;
pub use resolver::{
    HeaderTenant, ResolveError, SessionTenant, SourceKind, StaticTenantOverride,
    TenantContextResolver, TenantSource, resolve,
};
pub use tenant_id::TenantId;
