//! Ownership guard for mutations.
//!
//! The guard does not rely on the scoped WHERE clause: it loads the target row by
//! primary key alone and compares its tenant field with the active tenant. A
//! mutation that would slip past a broken predicate is still refused here.
use dinekit_security::TenantContext;
use serde_json::Value;

use crate::secure::ops::load_raw;
use crate::secure::values::as_tenant_id;
use crate::secure::{EntitySchema, Record, RecordId, ScopeError};
use sea_orm::ConnectionTrait;

/// Load row `id` and check that it belongs to the tenant of `ctx`.
///
/// Global schemas only get the existence check. Soft-deleted rows count as
/// missing once ownership has been confirmed.
///
/// # Errors
/// - [`ScopeError::TenantRequired`] if the schema is tenant-scoped and `ctx` has no tenant
/// - [`ScopeError::NotFound`] if the row does not exist (or is soft-deleted)
/// - [`ScopeError::CrossTenantAccess`] if another tenant owns the row
/// - [`ScopeError::Db`] on storage failure
pub async fn assert_ownership<C>(
    conn: &C,
    schema: &EntitySchema,
    ctx: &TenantContext,
    id: RecordId,
) -> Result<Record, ScopeError>
where
    C: ConnectionTrait,
{
    let expected = match schema.tenant_field() {
        Some(_) => Some(
            ctx.tenant_id()
                .ok_or_else(|| ScopeError::tenant_required(schema.table()))?,
        ),
        None => None,
    };

    let not_found = || ScopeError::NotFound {
        table: schema.table().to_owned(),
        id,
    };
    let row = load_raw(conn, schema, id).await?.ok_or_else(not_found)?;

    if let (Some(field), Some(tenant)) = (schema.tenant_field(), expected)
        && as_tenant_id(row.get(field)) != Some(tenant.get())
    {
        tracing::warn!(
            target: "security",
            table = schema.table(),
            id,
            tenant = %tenant,
            "cross-tenant access denied"
        );
        return Err(ScopeError::CrossTenantAccess {
            table: schema.table().to_owned(),
            id,
        });
    }

    if is_soft_deleted(schema, &row) {
        return Err(not_found());
    }
    Ok(row)
}

pub(crate) fn is_soft_deleted(schema: &EntitySchema, row: &Record) -> bool {
    schema
        .soft_delete_field()
        .and_then(|f| row.get(f))
        .is_some_and(|v| !Value::is_null(v))
}
