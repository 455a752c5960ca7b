use crate::TenantId;

/// Where the active tenant of a [`TenantContext`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrigin {
    /// Authenticated session identity.
    Session,
    /// Transport header (machine-to-machine callers).
    Header,
    /// Statically configured override (single-tenant admin jobs).
    StaticOverride,
    /// Built directly in code via [`TenantContext::for_tenant`].
    Explicit,
    /// Nothing produced an identifier.
    Unresolved,
}

/// Active tenant for one unit of work (request, job run, CLI invocation).
///
/// The value is immutable. Switching tenants means building a new context.
///
/// A context without a tenant is **not** an unscoped context: repositories
/// bound to it see no rows and refuse to write. Unscoped access only exists
/// through the escape hatch in `dinekit-db`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TenantContext {
    tenant_id: Option<TenantId>,
    origin: ContextOrigin,
}

impl TenantContext {
    #[must_use]
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            origin: ContextOrigin::Explicit,
        }
    }

    /// Context with no active tenant.
    #[must_use]
    pub fn without_tenant() -> Self {
        Self {
            tenant_id: None,
            origin: ContextOrigin::Unresolved,
        }
    }

    pub(crate) fn resolved(tenant_id: TenantId, origin: ContextOrigin) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            origin,
        }
    }

    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    #[inline]
    #[must_use]
    pub fn origin(&self) -> ContextOrigin {
        self.origin
    }

    #[must_use]
    pub fn has_tenant(&self) -> bool {
        self.tenant_id.is_some()
    }
}
