use serde::{Deserialize, Serialize};

use crate::TenantId;

pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-ID";

/// `tenancy` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenancyConfig {
    /// Transport header carrying the tenant for machine-to-machine callers.
    pub header_name: String,

    /// Fallback tenant for single-tenant tooling. Lowest precedence.
    pub static_tenant: Option<TenantId>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_TENANT_HEADER.to_owned(),
            static_tenant: None,
        }
    }
}
