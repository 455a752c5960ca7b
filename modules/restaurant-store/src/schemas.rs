//! Entity schemas of the restaurant domain.
//!
//! Every table except `restaurants` is owned by a restaurant through
//! `restaurant_id`. Schemas are built once and shared.
use std::sync::{Arc, LazyLock};

use dinekit_db::secure::{Defaults, FnHook, HookContext, HookError};
use dinekit_db::{EntitySchema, Record};
use serde_json::Value;

pub const RESTAURANTS: &str = "restaurants";
pub const CATEGORIES: &str = "categories";
pub const DISHES: &str = "dishes";
pub const DINING_TABLES: &str = "dining_tables";
pub const CUSTOMERS: &str = "customers";
pub const EMPLOYEES: &str = "employees";
pub const ORDERS: &str = "orders";
pub const AUDIT_LOGS: &str = "audit_logs";

/// Order lifecycle values accepted in `orders.status`.
pub const ORDER_STATUSES: &[&str] = &["open", "closed", "cancelled"];
/// Values accepted in `dining_tables.status`.
pub const TABLE_STATUSES: &[&str] = &["free", "occupied", "reserved"];

static RESTAURANTS_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(RESTAURANTS)
        .no_tenant_scope()
        .fields(["name", "address", "phone", "active"])
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([("active", true)]))
        .build()
});

static CATEGORIES_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(CATEGORIES)
        .fields(["name", "position"])
        .timestamps("created_at", "updated_at")
        .hook(FnHook::new("name_required", name_required))
        .build()
});

static DISHES_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(DISHES)
        .fields([
            "category_id",
            "name",
            "description",
            "price",
            "available",
            "tags",
        ])
        .soft_delete("deleted_at")
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([("available", true)]))
        .hook(FnHook::new("name_required", name_required))
        .hook(FnHook::new("price_not_negative", price_not_negative))
        .json_field("tags")
        .build()
});

static DINING_TABLES_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(DINING_TABLES)
        .fields(["number", "seats", "status"])
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([("status", "free")]))
        .hook(FnHook::new("table_status", |r: &mut Record, _: &HookContext<'_>| {
            one_of(r, "status", TABLE_STATUSES)
        }))
        .build()
});

static CUSTOMERS_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(CUSTOMERS)
        .fields(["name", "email", "phone", "notes"])
        .soft_delete("deleted_at")
        .timestamps("created_at", "updated_at")
        .hook(FnHook::new("normalize_email", normalize_email))
        .build()
});

static EMPLOYEES_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(EMPLOYEES)
        .fields(["name", "email", "role", "active"])
        .soft_delete("deleted_at")
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([("active", true)]))
        .hook(FnHook::new("normalize_email", normalize_email))
        .build()
});

// `order_total` reads the structured items, so it is declared before the JSON encoder.
static ORDERS_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(ORDERS)
        .fields([
            "table_id",
            "customer_id",
            "employee_id",
            "status",
            "items",
            "total",
            "notes",
            "closed_at",
        ])
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([
            ("status", Value::from("open")),
            ("items", Value::Array(Vec::new())),
        ]))
        .hook(FnHook::new("order_status", |r: &mut Record, _: &HookContext<'_>| {
            one_of(r, "status", ORDER_STATUSES)
        }))
        .hook(FnHook::new("order_total", order_total))
        .json_field("items")
        .build()
});

static AUDIT_LOGS_SCHEMA: LazyLock<Arc<EntitySchema>> = LazyLock::new(|| {
    EntitySchema::builder(AUDIT_LOGS)
        .fields(["actor", "action", "entity", "entity_id", "details"])
        .created_at("created_at")
        .json_field("details")
        .build()
});

#[must_use]
pub fn restaurants() -> Arc<EntitySchema> {
    Arc::clone(&RESTAURANTS_SCHEMA)
}

#[must_use]
pub fn categories() -> Arc<EntitySchema> {
    Arc::clone(&CATEGORIES_SCHEMA)
}

#[must_use]
pub fn dishes() -> Arc<EntitySchema> {
    Arc::clone(&DISHES_SCHEMA)
}

#[must_use]
pub fn dining_tables() -> Arc<EntitySchema> {
    Arc::clone(&DINING_TABLES_SCHEMA)
}

#[must_use]
pub fn customers() -> Arc<EntitySchema> {
    Arc::clone(&CUSTOMERS_SCHEMA)
}

#[must_use]
pub fn employees() -> Arc<EntitySchema> {
    Arc::clone(&EMPLOYEES_SCHEMA)
}

#[must_use]
pub fn orders() -> Arc<EntitySchema> {
    Arc::clone(&ORDERS_SCHEMA)
}

#[must_use]
pub fn audit_logs() -> Arc<EntitySchema> {
    Arc::clone(&AUDIT_LOGS_SCHEMA)
}

/// Schema registered under `table`.
#[must_use]
pub fn by_table(table: &str) -> Option<Arc<EntitySchema>> {
    let schema = match table {
        RESTAURANTS => restaurants(),
        CATEGORIES => categories(),
        DISHES => dishes(),
        DINING_TABLES => dining_tables(),
        CUSTOMERS => customers(),
        EMPLOYEES => employees(),
        ORDERS => orders(),
        AUDIT_LOGS => audit_logs(),
        _ => return None,
    };
    Some(schema)
}

/// Every table, global ones first.
#[must_use]
pub fn all() -> Vec<Arc<EntitySchema>> {
    vec![
        restaurants(),
        categories(),
        dishes(),
        dining_tables(),
        customers(),
        employees(),
        orders(),
        audit_logs(),
    ]
}

fn name_required(record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
    match record.get("name") {
        Some(Value::String(name)) if name.trim().is_empty() => {
            Err(HookError::new("name must not be blank"))
        }
        Some(Value::String(_)) | None => Ok(()),
        Some(_) => Err(HookError::new("name must be text")),
    }
}

fn price_not_negative(record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
    match record.get("price") {
        None => Ok(()),
        Some(v) => match v.as_i64() {
            Some(p) if p >= 0 => Ok(()),
            _ => Err(HookError::new(
                "price must be a non-negative amount in minor units",
            )),
        },
    }
}

fn one_of(record: &Record, field: &str, allowed: &[&str]) -> Result<(), HookError> {
    match record.get(field) {
        None => Ok(()),
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
        Some(other) => Err(HookError::new(format!(
            "{field} must be one of {allowed:?}, got {other}"
        ))),
    }
}

fn normalize_email(record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
    let Some(Value::String(email)) = record.get("email") else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(HookError::new("email must contain '@'"));
    }
    record.insert("email".to_owned(), Value::String(email));
    Ok(())
}

/// `total` is derived from `items`: the sum of `quantity * unit_price`.
///
/// A caller-supplied total is only accepted together with the items it is
/// computed from, and is then overwritten.
fn order_total(record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
    let total = match record.get("items") {
        None if record.contains_key("total") => {
            return Err(HookError::new("total is derived from items"));
        }
        None => return Ok(()),
        Some(Value::Null) => 0,
        Some(Value::Array(items)) => items_total(items)?,
        Some(Value::String(text)) => {
            let items: Vec<Value> = serde_json::from_str(text)
                .map_err(|e| HookError::new(format!("items are not a JSON list: {e}")))?;
            items_total(&items)?
        }
        Some(_) => return Err(HookError::new("items must be a list")),
    };
    record.insert("total".to_owned(), Value::from(total));
    Ok(())
}

fn items_total(items: &[Value]) -> Result<i64, HookError> {
    items.iter().try_fold(0_i64, |acc, item| {
        let quantity = item
            .get("quantity")
            .and_then(Value::as_i64)
            .filter(|q| *q > 0)
            .ok_or_else(|| HookError::new("every item needs a positive quantity"))?;
        let unit_price = item
            .get("unit_price")
            .and_then(Value::as_i64)
            .filter(|p| *p >= 0)
            .ok_or_else(|| HookError::new("every item needs a non-negative unit_price"))?;
        quantity
            .checked_mul(unit_price)
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| HookError::new("order total overflows"))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use dinekit_db::secure::HookPhase;
    use serde_json::json;

    const INSERT: HookContext<'static> = HookContext {
        phase: HookPhase::Insert,
        tenant: None,
        current: None,
    };

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn only_restaurants_are_global() {
        for schema in all() {
            assert_eq!(
                schema.is_tenant_scoped(),
                schema.table() != RESTAURANTS,
                "{}",
                schema.table()
            );
        }
        assert_eq!(dishes().tenant_field(), Some("restaurant_id"));
    }

    #[test]
    fn lookup_by_table_name() {
        let orders = by_table("orders").unwrap();
        assert_eq!(orders.table(), ORDERS);
        assert_eq!(orders.json_fields(), ["items".to_owned()]);
        assert!(by_table("users").is_none());
    }

    #[test]
    fn order_total_sums_items() {
        let mut r = record(json!({
            "items": [
                {"dish_id": 1, "name": "Soup", "quantity": 2, "unit_price": 450},
                {"dish_id": 2, "name": "Tea", "quantity": 1, "unit_price": 200}
            ],
            "total": 1
        }));
        order_total(&mut r, &INSERT).unwrap();
        assert_eq!(r["total"], json!(1100));
    }

    #[test]
    fn order_total_rejects_bad_items_and_bare_totals() {
        let mut r = record(json!({"items": [{"quantity": 0, "unit_price": 1}]}));
        assert!(order_total(&mut r, &INSERT).is_err());

        let mut r = record(json!({"total": 5}));
        assert!(order_total(&mut r, &INSERT).is_err());

        let mut r = record(json!({"notes": "window seat"}));
        order_total(&mut r, &INSERT).unwrap();
        assert!(!r.contains_key("total"));
    }

    #[test]
    fn email_is_normalized() {
        let mut r = record(json!({"email": "  Ana@Example.COM "}));
        normalize_email(&mut r, &INSERT).unwrap();
        assert_eq!(r["email"], json!("ana@example.com"));

        let mut r = record(json!({"email": "nope"}));
        assert!(normalize_email(&mut r, &INSERT).is_err());
    }

    #[test]
    fn status_hooks_reject_unknown_values() {
        let mut r = record(json!({"status": "teleported"}));
        assert!(one_of(&r, "status", ORDER_STATUSES).is_err());
        r.insert("status".to_owned(), json!("closed"));
        assert!(one_of(&r, "status", ORDER_STATUSES).is_ok());
    }
}
