#![allow(clippy::unwrap_used, clippy::expect_used)]

use dinekit_security::{
    ContextOrigin, HeaderTenant, SessionTenant, StaticTenantOverride, TenancyConfig,
    TenantContextResolver, TenantId, TenantSource, resolve,
};
use http::{HeaderMap, HeaderValue};

fn headers(name: &'static str, value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(name, HeaderValue::from_str(value).unwrap());
    h
}

#[test]
fn resolution_is_idempotent() {
    let h = headers("x-tenant-id", "12");
    let header = HeaderTenant::default_header(&h);
    let first = resolve(&[&header]);
    let second = resolve(&[&header]);
    assert_eq!(first, second);
    assert_eq!(first.tenant_id(), TenantId::new(12));
}

#[test]
fn every_permutation_of_sources_agrees() {
    let h = headers("x-tenant-id", "20");
    let session = SessionTenant::new(None);
    let header = HeaderTenant::default_header(&h);
    let fallback = StaticTenantOverride::new(TenantId::new(30));

    let sources: [&dyn TenantSource; 3] = [&session, &header, &fallback];
    let perms: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for p in perms {
        let ordered = [sources[p[0]], sources[p[1]], sources[p[2]]];
        let ctx = resolve(&ordered);
        assert_eq!(ctx.tenant_id(), TenantId::new(20), "perm {p:?}");
        assert_eq!(ctx.origin(), ContextOrigin::Header);
    }
}

#[test]
fn configured_header_name_is_honoured() {
    let cfg = TenancyConfig {
        header_name: "X-Restaurant".to_owned(),
        static_tenant: None,
    };
    let resolver = TenantContextResolver::from_config(&cfg).unwrap();

    let ctx = resolver.resolve_request(None, &headers("x-restaurant", "5"));
    assert_eq!(ctx.tenant_id(), TenantId::new(5));

    let ignored = resolver.resolve_request(None, &headers("x-tenant-id", "5"));
    assert!(!ignored.has_tenant());
}

#[test]
fn session_beats_header_in_request_resolution() {
    let resolver = TenantContextResolver::from_config(&TenancyConfig::default()).unwrap();
    let ctx = resolver.resolve_request(Some(1), &headers("x-tenant-id", "2"));
    assert_eq!(ctx.tenant_id(), TenantId::new(1));
    assert_eq!(ctx.origin(), ContextOrigin::Session);
}

#[test]
fn job_resolution_uses_static_override_last() {
    let cfg = TenancyConfig {
        static_tenant: TenantId::new(77),
        ..TenancyConfig::default()
    };
    let resolver = TenantContextResolver::from_config(&cfg).unwrap();

    let fallback = resolver.resolve_job(None);
    assert_eq!(fallback.tenant_id(), TenantId::new(77));
    assert_eq!(fallback.origin(), ContextOrigin::StaticOverride);

    let explicit = resolver.resolve_job(Some(3));
    assert_eq!(explicit.tenant_id(), TenantId::new(3));

    let malformed = resolver.resolve_job(Some(-1));
    assert_eq!(malformed.tenant_id(), TenantId::new(77));
}

#[test]
fn non_utf8_header_is_ignored() {
    let mut h = HeaderMap::new();
    h.insert("x-tenant-id", HeaderValue::from_bytes(&[0xfa, 0x31]).unwrap());
    let header = HeaderTenant::default_header(&h);
    assert!(header.tenant_id().is_none());
    assert!(!resolve(&[&header]).has_tenant());
}
