//! Statement-level write paths shared by scoped and unscoped repositories.
use std::sync::Arc;

use dinekit_security::TenantId;
use sea_orm::sea_query::{
    Alias, Asterisk, Condition, ConditionalStatement, Expr, Keyword, Query, SimpleExpr,
};
use sea_orm::{ConnectionTrait, DbErr};
use serde_json::Value;

use crate::secure::hooks::{HookContext, HookPhase, RecordHook};
use crate::secure::values::{as_tenant_id, row_to_record, to_db_value};
use crate::secure::{EntitySchema, Record, RecordId, ScopeError};

/// Which rows a write may touch.
#[derive(Clone, Copy, Debug)]
pub(crate) enum WriteScope {
    /// Tenant-scoped schema, active tenant known.
    Tenant(TenantId),
    /// Schema declared without tenant scoping.
    Global,
    /// Escape hatch: no tenant term.
    Bypass,
}

impl WriteScope {
    fn tenant(self) -> Option<TenantId> {
        match self {
            WriteScope::Tenant(t) => Some(t),
            WriteScope::Global | WriteScope::Bypass => None,
        }
    }
}

pub(crate) fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

/// Row by primary key, no tenant or soft-delete terms.
pub(crate) async fn load_raw<C>(
    conn: &C,
    schema: &EntitySchema,
    id: RecordId,
) -> Result<Option<Record>, ScopeError>
where
    C: ConnectionTrait,
{
    let table = Alias::new(schema.table());
    let mut stmt = Query::select();
    stmt.column((table.clone(), Asterisk))
        .from(table.clone())
        .and_where(Expr::col((table, Alias::new(schema.primary_key()))).eq(id))
        .limit(1);
    let backend = conn.get_database_backend();
    match conn.query_one(backend.build(&stmt)).await? {
        Some(row) => Ok(Some(row_to_record(schema, &row)?)),
        None => Ok(None),
    }
}

fn check_fields(
    schema: &EntitySchema,
    record: &Record,
    allowed: fn(&EntitySchema, &str) -> bool,
) -> Result<(), ScopeError> {
    match record.keys().find(|k| !allowed(schema, k)) {
        Some(field) => Err(ScopeError::invalid_field(schema.table(), field)),
        None => Ok(()),
    }
}

fn run_hooks(
    hooks: &[Arc<dyn RecordHook>],
    record: &mut Record,
    ctx: &HookContext<'_>,
) -> Result<(), ScopeError> {
    for hook in hooks {
        hook.apply(record, ctx).map_err(|e| ScopeError::Hook {
            hook: hook.name().to_owned(),
            message: e.0,
        })?;
    }
    Ok(())
}

/// `pk = id`, plus the tenant term and the live-row term where they apply.
fn target_condition(schema: &EntitySchema, scope: WriteScope, id: RecordId) -> Condition {
    let mut cond = Condition::all();
    if let (Some(field), Some(tenant)) = (schema.tenant_field(), scope.tenant()) {
        cond = cond.add(Expr::col(Alias::new(field)).eq(tenant.get()));
    }
    cond = cond.add(Expr::col(Alias::new(schema.primary_key())).eq(id));
    if let Some(field) = schema.soft_delete_field() {
        cond = cond.add(Expr::col(Alias::new(field)).is_null());
    }
    cond
}

/// Column assignments. JSON null is written as a bare `NULL` keyword so that no
/// column type is implied for it.
fn assignments(record: &Record) -> Result<Vec<(Alias, SimpleExpr)>, ScopeError> {
    record
        .iter()
        .map(|(k, v)| -> Result<_, ScopeError> {
            let expr = if v.is_null() {
                SimpleExpr::Keyword(Keyword::Null)
            } else {
                SimpleExpr::from(to_db_value(k, v)?)
            };
            Ok((Alias::new(k), expr))
        })
        .collect()
}

/// Decide the owning tenant of a new row and write it into `record`.
fn owning_tenant(
    schema: &EntitySchema,
    scope: WriteScope,
    record: &mut Record,
) -> Result<Option<TenantId>, ScopeError> {
    let Some(field) = schema.tenant_field() else {
        return Ok(None);
    };
    let tenant = match scope {
        WriteScope::Tenant(t) => {
            if let Some(given) = as_tenant_id(record.get(field))
                && given != t.get()
            {
                tracing::debug!(
                    table = schema.table(),
                    tenant = %t,
                    "caller-supplied tenant overridden"
                );
            }
            t
        }
        WriteScope::Bypass => as_tenant_id(record.get(field))
            .and_then(TenantId::new)
            .ok_or_else(|| ScopeError::tenant_required(schema.table()))?,
        WriteScope::Global => return Ok(None),
    };
    record.insert(field.to_owned(), Value::from(tenant.get()));
    Ok(Some(tenant))
}

pub(crate) async fn insert<C>(
    conn: &C,
    schema: &EntitySchema,
    scope: WriteScope,
    mut record: Record,
) -> Result<RecordId, ScopeError>
where
    C: ConnectionTrait,
{
    check_fields(schema, &record, EntitySchema::is_insertable)?;
    let tenant = owning_tenant(schema, scope, &mut record)?;

    let ctx = HookContext {
        phase: HookPhase::Insert,
        tenant,
        current: None,
    };
    run_hooks(schema.pre_insert_hooks(), &mut record, &ctx)?;
    check_fields(schema, &record, EntitySchema::is_insertable)?;
    if let (Some(field), Some(tenant)) = (schema.tenant_field(), tenant) {
        record.insert(field.to_owned(), Value::from(tenant.get()));
    }

    for field in [schema.created_at_field(), schema.updated_at_field()]
        .into_iter()
        .flatten()
    {
        if record.get(field).is_none_or(Value::is_null) {
            record.insert(field.to_owned(), now());
        }
    }

    let pk = schema.primary_key();
    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(schema.table()));
    if record.is_empty() {
        stmt.or_default_values();
    } else {
        let (columns, values): (Vec<_>, Vec<_>) = assignments(&record)?.into_iter().unzip();
        stmt.columns(columns);
        stmt.values(values)?;
    }

    let backend = conn.get_database_backend();
    let id = if conn.support_returning() {
        stmt.returning_col(Alias::new(pk));
        let row = conn
            .query_one(backend.build(&stmt))
            .await?
            .ok_or(DbErr::RecordNotInserted)?;
        row.try_get::<i64>("", pk)?
    } else {
        let res = conn.execute(backend.build(&stmt)).await?;
        i64::try_from(res.last_insert_id()).map_err(|_| ScopeError::InvalidValue {
            field: pk.to_owned(),
            reason: "generated id out of range".to_owned(),
        })?
    };

    tracing::debug!(table = schema.table(), id, tenant = ?tenant, "row inserted");
    Ok(id)
}

/// Reject fields that may not change before any storage access.
pub(crate) fn check_patch(schema: &EntitySchema, patch: &Record) -> Result<(), ScopeError> {
    check_fields(schema, patch, EntitySchema::is_updatable)
}

pub(crate) async fn update<C>(
    conn: &C,
    schema: &EntitySchema,
    scope: WriteScope,
    id: RecordId,
    mut patch: Record,
    current: &Record,
) -> Result<bool, ScopeError>
where
    C: ConnectionTrait,
{
    let tenant = match scope {
        WriteScope::Tenant(t) => Some(t),
        WriteScope::Bypass => schema
            .tenant_field()
            .and_then(|f| as_tenant_id(current.get(f)))
            .and_then(TenantId::new),
        WriteScope::Global => None,
    };
    let ctx = HookContext {
        phase: HookPhase::Update,
        tenant,
        current: Some(current),
    };
    run_hooks(schema.pre_update_hooks(), &mut patch, &ctx)?;
    check_patch(schema, &patch)?;

    if patch.is_empty() {
        return Ok(true);
    }
    if let Some(field) = schema.updated_at_field()
        && !patch.contains_key(field)
    {
        patch.insert(field.to_owned(), now());
    }

    let mut stmt = Query::update();
    stmt.table(Alias::new(schema.table()))
        .values(assignments(&patch)?)
        .cond_where(target_condition(schema, scope, id));
    let backend = conn.get_database_backend();
    let res = conn.execute(backend.build(&stmt)).await?;

    tracing::debug!(table = schema.table(), id, tenant = ?tenant, rows = res.rows_affected(), "row updated");
    Ok(res.rows_affected() > 0)
}

/// Soft delete when the schema declares it, hard delete otherwise.
pub(crate) async fn delete<C>(
    conn: &C,
    schema: &EntitySchema,
    scope: WriteScope,
    id: RecordId,
) -> Result<bool, ScopeError>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let cond = target_condition(schema, scope, id);

    let res = if let Some(field) = schema.soft_delete_field() {
        let mut marks = Record::new();
        marks.insert(field.to_owned(), now());
        if let Some(updated) = schema.updated_at_field() {
            marks.insert(updated.to_owned(), now());
        }
        let mut stmt = Query::update();
        stmt.table(Alias::new(schema.table()))
            .values(assignments(&marks)?)
            .cond_where(cond);
        conn.execute(backend.build(&stmt)).await?
    } else {
        let mut stmt = Query::delete();
        stmt.from_table(Alias::new(schema.table())).cond_where(cond);
        conn.execute(backend.build(&stmt)).await?
    };

    tracing::debug!(
        table = schema.table(),
        id,
        soft = schema.soft_delete_field().is_some(),
        rows = res.rows_affected(),
        "row deleted"
    );
    Ok(res.rows_affected() > 0)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sea_orm::DatabaseBackend;
    use serde_json::json;

    #[test]
    fn null_assignments_are_untyped_keywords() {
        let Value::Object(record) = json!({"category_id": null, "name": "Soup"}) else {
            unreachable!()
        };
        let (columns, values): (Vec<_>, Vec<_>) = assignments(&record).unwrap().into_iter().unzip();
        let mut stmt = Query::insert();
        stmt.into_table(Alias::new("dishes")).columns(columns);
        stmt.values(values).unwrap();
        let built = DatabaseBackend::Postgres.build(&stmt);
        assert!(built.sql.contains("VALUES (NULL, $1)"), "{}", built.sql);
        assert_eq!(built.values.map(|v| v.0.len()), Some(1));
    }
}
