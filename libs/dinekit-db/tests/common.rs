#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]
use std::sync::Arc;

use anyhow::Result;
use dinekit_db::secure::{Defaults, FnHook, HookContext, HookError, HookPhase};
use dinekit_db::{EntitySchema, Record};
use dinekit_security::{TenantContext, TenantId};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use serde_json::Value;

const DDL: &[&str] = &[
    "CREATE TABLE restaurants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        restaurant_id INTEGER NOT NULL,
        name TEXT NOT NULL
    )",
    "CREATE TABLE dishes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        restaurant_id INTEGER NOT NULL,
        category_id INTEGER,
        name TEXT NOT NULL,
        price INTEGER NOT NULL DEFAULT 0,
        available BOOLEAN NOT NULL DEFAULT 1,
        tags TEXT,
        created_at TEXT,
        updated_at TEXT,
        deleted_at TEXT
    )",
];

/// Fresh in-memory database with the test tables. One pooled connection so
/// every statement sees the same database.
pub async fn setup() -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let conn = Database::connect(opts).await?;
    for stmt in DDL {
        conn.execute_unprepared(stmt).await?;
    }
    Ok(conn)
}

pub async fn exec(conn: &DatabaseConnection, sql: &str) -> Result<()> {
    conn.execute_unprepared(sql).await?;
    Ok(())
}

pub fn restaurants() -> Arc<EntitySchema> {
    EntitySchema::builder("restaurants")
        .no_tenant_scope()
        .fields(["name"])
        .build()
}

pub fn categories() -> Arc<EntitySchema> {
    EntitySchema::builder("categories").fields(["name"]).build()
}

pub fn dishes() -> Arc<EntitySchema> {
    EntitySchema::builder("dishes")
        .fields(["category_id", "name", "price", "available", "tags"])
        .soft_delete("deleted_at")
        .timestamps("created_at", "updated_at")
        .pre_insert(Defaults::new([("available", true)]))
        .hook(FnHook::new(
            "price_not_negative",
            |r: &mut Record, _: &HookContext<'_>| match r.get("price").and_then(Value::as_i64) {
                Some(p) if p < 0 => Err(HookError::new("price must not be negative")),
                _ => Ok(()),
            },
        ))
        .pre_update(FnHook::new(
            "keep_name_on_price_change",
            |r: &mut Record, ctx: &HookContext<'_>| {
                assert_eq!(ctx.phase, HookPhase::Update);
                if r.contains_key("price")
                    && !r.contains_key("name")
                    && let Some(current) = ctx.current.and_then(|c| c.get("name"))
                {
                    r.insert("name".to_owned(), current.clone());
                }
                Ok(())
            },
        ))
        .json_field("tags")
        .build()
}

pub fn ctx(tenant: i64) -> TenantContext {
    TenantContext::for_tenant(TenantId::new(tenant).unwrap())
}

pub fn rec(v: Value) -> Record {
    match v {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}
