//! Cross-restaurant administrative operations.
//!
//! Everything here runs through escape-hatch handles and therefore needs a
//! [`PrivilegeAssertion`] from the caller.
use std::collections::HashMap;

use dinekit_db::{
    ConnectionTrait, DbHandle, EntityRepository, EntitySchema, Filters, Record, RecordId,
    ScopeError, without_tenant_scope,
};
use dinekit_security::{PrivilegeAssertion, TenantContext, TenantId};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::StoreError;
use crate::schemas;

/// Rows written by [`duplicate_menu`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MenuCopy {
    pub categories: u64,
    pub dishes: u64,
}

/// Live rows of one table per owning restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub tenants: Vec<TenantCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TenantCount {
    /// `None` for global tables.
    pub tenant: Option<TenantId>,
    pub rows: u64,
}

/// Copy the menu (categories and live dishes) of restaurant `from` to restaurant `to`.
///
/// Runs in one transaction: either the whole menu is copied or nothing is.
/// Copied dishes point at the copied categories; a dish whose category is not
/// part of the source menu is copied without one.
///
/// # Errors
/// - [`StoreError::SameTenant`] if `from == to`
/// - [`StoreError::Scope`] with [`ScopeError::PrivilegeRequired`] for an empty privilege
/// - [`StoreError::Scope`] with [`ScopeError::NotFound`] if either restaurant does not exist
pub async fn duplicate_menu(
    db: &DbHandle,
    privilege: &PrivilegeAssertion,
    from: TenantId,
    to: TenantId,
) -> Result<MenuCopy, StoreError> {
    if from == to {
        return Err(StoreError::SameTenant(from));
    }
    let privilege = privilege.clone();
    let copied = db
        .in_transaction(move |tx| Box::pin(async move { copy_menu(tx, &privilege, from, to).await }))
        .await?;
    tracing::info!(
        from = %from,
        to = %to,
        categories = copied.categories,
        dishes = copied.dishes,
        "menu duplicated"
    );
    Ok(copied)
}

async fn copy_menu<C>(
    tx: &C,
    privilege: &PrivilegeAssertion,
    from: TenantId,
    to: TenantId,
) -> Result<MenuCopy, ScopeError>
where
    C: ConnectionTrait,
{
    let restaurants = EntityRepository::new(tx, schemas::restaurants(), TenantContext::without_tenant());
    for tenant in [from, to] {
        if restaurants.find(tenant.get()).await?.is_none() {
            return Err(ScopeError::NotFound {
                table: schemas::RESTAURANTS.to_owned(),
                id: tenant.get(),
            });
        }
    }

    let target = TenantContext::for_tenant(to);
    let categories = EntityRepository::new(tx, schemas::categories(), target.clone());
    let dishes = EntityRepository::new(tx, schemas::dishes(), target.clone());
    let categories = without_tenant_scope(&categories, privilege)?;
    let dishes = without_tenant_scope(&dishes, privilege)?;

    let source = Filters::new().eq("restaurant_id", from.get());
    let mut copied = MenuCopy::default();

    let mut category_ids: HashMap<RecordId, RecordId> = HashMap::new();
    for row in categories.find_all(&source, None, None).await? {
        let mut copy = business_fields(categories.schema(), &row);
        copy.insert("restaurant_id".to_owned(), Value::from(to.get()));
        let new_id = categories.insert(copy).await?;
        if let Some(old_id) = row.get("id").and_then(Value::as_i64) {
            category_ids.insert(old_id, new_id);
        }
        copied.categories += 1;
    }

    for row in dishes.find_all(&source, None, None).await? {
        let mut copy = business_fields(dishes.schema(), &row);
        let category = row
            .get("category_id")
            .and_then(Value::as_i64)
            .and_then(|old| category_ids.get(&old).copied());
        copy.insert("category_id".to_owned(), category.map_or(Value::Null, Value::from));
        copy.insert("restaurant_id".to_owned(), Value::from(to.get()));
        dishes.insert(copy).await?;
        copied.dishes += 1;
    }

    let audit = EntityRepository::new(tx, schemas::audit_logs(), target);
    let mut entry = Record::new();
    entry.insert("actor".to_owned(), Value::from(privilege.role()));
    entry.insert("action".to_owned(), Value::from("menu_duplicated"));
    entry.insert("entity".to_owned(), Value::from(schemas::RESTAURANTS));
    entry.insert("entity_id".to_owned(), Value::from(from.get()));
    entry.insert(
        "details".to_owned(),
        json!({"categories": copied.categories, "dishes": copied.dishes}),
    );
    audit.insert(entry).await?;

    Ok(copied)
}

/// Declared, non-null business fields of `row`.
fn business_fields(schema: &EntitySchema, row: &Record) -> Record {
    schema
        .fields()
        .filter_map(|f| {
            row.get(f)
                .filter(|v| !v.is_null())
                .map(|v| (f.to_owned(), v.clone()))
        })
        .collect()
}

/// Per-restaurant row counts for `tables`; every table when `tables` is empty.
///
/// # Errors
/// - [`StoreError::Validation`] for an unknown table name
/// - [`StoreError::Scope`] with [`ScopeError::PrivilegeRequired`] for an empty privilege
pub async fn tenant_report<C>(
    conn: &C,
    privilege: &PrivilegeAssertion,
    tables: &[String],
) -> Result<Vec<TableReport>, StoreError>
where
    C: ConnectionTrait,
{
    let selected = if tables.is_empty() {
        schemas::all()
    } else {
        tables
            .iter()
            .map(|t| {
                schemas::by_table(t)
                    .ok_or_else(|| StoreError::validation("table", format!("unknown table '{t}'")))
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut report = Vec::with_capacity(selected.len());
    for schema in selected {
        let table = schema.table().to_owned();
        let repo = EntityRepository::new(conn, schema, TenantContext::without_tenant());
        let hatch = without_tenant_scope(&repo, privilege)?;
        let tenants = hatch
            .count_by_tenant()
            .await?
            .into_iter()
            .map(|(tenant, rows)| TenantCount { tenant, rows })
            .collect();
        report.push(TableReport { table, tenants });
    }
    Ok(report)
}
