//! Tenant context resolution.
//!
//! A unit of work may learn its tenant from several places. Precedence is fixed
//! by [`SourceKind`] and never depends on the order the caller lists sources in:
//! session first, then the transport header, then the static override.
use http::{HeaderMap, HeaderName};
use thiserror::Error;

use crate::{ContextOrigin, TenancyConfig, TenantContext, TenantId};

/// Kind of tenant source, declared in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Session,
    Header,
    StaticOverride,
}

impl SourceKind {
    fn origin(self) -> ContextOrigin {
        match self {
            SourceKind::Session => ContextOrigin::Session,
            SourceKind::Header => ContextOrigin::Header,
            SourceKind::StaticOverride => ContextOrigin::StaticOverride,
        }
    }
}

/// Something that may know the active tenant.
///
/// Implementations must be side-effect free: `tenant_id` may be called any
/// number of times and must return the same answer.
pub trait TenantSource {
    fn kind(&self) -> SourceKind;

    /// `None` when the source has no identifier or only a malformed one.
    fn tenant_id(&self) -> Option<TenantId>;
}

/// Tenant of the authenticated session, as handed over by the auth provider.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionTenant(Option<i64>);

impl SessionTenant {
    #[must_use]
    pub fn new(raw: Option<i64>) -> Self {
        Self(raw)
    }
}

impl TenantSource for SessionTenant {
    fn kind(&self) -> SourceKind {
        SourceKind::Session
    }

    fn tenant_id(&self) -> Option<TenantId> {
        let raw = self.0?;
        let id = TenantId::new(raw);
        if id.is_none() {
            tracing::debug!(raw, "session tenant id is not positive; ignoring");
        }
        id
    }
}

/// Tenant carried in a request header.
#[derive(Clone, Debug)]
pub struct HeaderTenant<'a> {
    headers: &'a HeaderMap,
    name: HeaderName,
}

impl<'a> HeaderTenant<'a> {
    #[must_use]
    pub fn new(headers: &'a HeaderMap, name: HeaderName) -> Self {
        Self { headers, name }
    }

    /// Reads the default `X-Tenant-ID` header.
    #[must_use]
    pub fn default_header(headers: &'a HeaderMap) -> Self {
        Self::new(headers, HeaderName::from_static("x-tenant-id"))
    }
}

impl TenantSource for HeaderTenant<'_> {
    fn kind(&self) -> SourceKind {
        SourceKind::Header
    }

    fn tenant_id(&self) -> Option<TenantId> {
        let value = self.headers.get(&self.name)?;
        let parsed = value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<TenantId>().ok());
        if parsed.is_none() {
            tracing::debug!(header = %self.name, "malformed tenant header; ignoring");
        }
        parsed
    }
}

/// Configured fallback tenant.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticTenantOverride(Option<TenantId>);

impl StaticTenantOverride {
    #[must_use]
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self(tenant_id)
    }
}

impl TenantSource for StaticTenantOverride {
    fn kind(&self) -> SourceKind {
        SourceKind::StaticOverride
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.0
    }
}

/// Resolve the active tenant from `sources`.
///
/// The first source in precedence order that yields a valid identifier wins.
/// When none does, the result is a context without a tenant.
#[must_use]
pub fn resolve(sources: &[&dyn TenantSource]) -> TenantContext {
    let mut ordered = sources.to_vec();
    ordered.sort_by_key(|s| s.kind());

    for source in ordered {
        if let Some(tenant_id) = source.tenant_id() {
            let kind = source.kind();
            tracing::debug!(tenant = %tenant_id, source = ?kind, "tenant context resolved");
            return TenantContext::resolved(tenant_id, kind.origin());
        }
    }

    tracing::debug!("no tenant source produced an identifier");
    TenantContext::without_tenant()
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid tenant header name '{name}'")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
}

/// Resolver preconfigured from the `tenancy` config section.
#[derive(Clone, Debug)]
pub struct TenantContextResolver {
    header_name: HeaderName,
    static_tenant: Option<TenantId>,
}

impl TenantContextResolver {
    /// # Errors
    /// Returns [`ResolveError::InvalidHeaderName`] if the configured header name
    /// is not a valid HTTP header name.
    pub fn from_config(cfg: &TenancyConfig) -> Result<Self, ResolveError> {
        let header_name = HeaderName::from_bytes(cfg.header_name.trim().as_bytes()).map_err(
            |source| ResolveError::InvalidHeaderName {
                name: cfg.header_name.clone(),
                source,
            },
        )?;
        Ok(Self {
            header_name,
            static_tenant: cfg.static_tenant,
        })
    }

    #[must_use]
    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Resolve for an HTTP-style request.
    #[must_use]
    pub fn resolve_request(&self, session: Option<i64>, headers: &HeaderMap) -> TenantContext {
        let session = SessionTenant::new(session);
        let header = HeaderTenant::new(headers, self.header_name.clone());
        let fallback = StaticTenantOverride::new(self.static_tenant);
        resolve(&[&session, &header, &fallback])
    }

    /// Resolve for a job or CLI run with no transport headers.
    ///
    /// `explicit` plays the session role: an operator-supplied tenant beats the
    /// configured override.
    #[must_use]
    pub fn resolve_job(&self, explicit: Option<i64>) -> TenantContext {
        let session = SessionTenant::new(explicit);
        let fallback = StaticTenantOverride::new(self.static_tenant);
        resolve(&[&session, &fallback])
    }
}
