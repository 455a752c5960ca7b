#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use anyhow::Result;
use dinekit_db::{ConnectionTrait, DbConfig, DbHandle, Record};
use dinekit_security::{PrivilegeAssertion, TenantContext, TenantId};
use restaurant_store::{Migrator, schemas};
use serde_json::{Value, json};

/// Migrated in-memory store.
pub async fn store() -> Result<DbHandle> {
    let db = DbHandle::connect(&DbConfig::default()).await?;
    db.run_migrations::<Migrator>().await?;
    Ok(db)
}

pub async fn restaurant(db: &DbHandle, name: &str) -> Result<TenantId> {
    let repo = db.repository(schemas::restaurants(), TenantContext::without_tenant());
    let id = repo.insert(rec(json!({"name": name}))).await?;
    Ok(TenantId::new(id).unwrap())
}

pub async fn exec(db: &DbHandle, sql: &str) -> Result<()> {
    db.conn().execute_unprepared(sql).await?;
    Ok(())
}

pub fn ctx(tenant: TenantId) -> TenantContext {
    TenantContext::for_tenant(tenant)
}

pub fn admin() -> PrivilegeAssertion {
    PrivilegeAssertion::new("platform_admin")
}

pub fn rec(v: Value) -> Record {
    match v {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}
