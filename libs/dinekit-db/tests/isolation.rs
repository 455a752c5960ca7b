#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::Result;
use common::{ctx, dishes, exec, rec, setup};
use dinekit_db::secure::assert_ownership;
use dinekit_db::{EntityRepository, Filters, ScopeError};
use dinekit_security::TenantContext;
use serde_json::json;

/// Tenant 1 owns dish 7 (price 20), tenant 2 owns dish 8.
async fn seeded() -> Result<sea_orm::DatabaseConnection> {
    let conn = setup().await?;
    exec(
        &conn,
        "INSERT INTO dishes (id, restaurant_id, name, price) VALUES (7, 1, 'Soup', 20)",
    )
    .await?;
    exec(
        &conn,
        "INSERT INTO dishes (id, restaurant_id, name, price) VALUES (8, 2, 'Salad', 12)",
    )
    .await?;
    Ok(conn)
}

#[tokio::test]
async fn other_tenant_rows_look_absent() -> Result<()> {
    let conn = seeded().await?;
    let owner = EntityRepository::new(&conn, dishes(), ctx(1));
    let other = EntityRepository::new(&conn, dishes(), ctx(2));

    let found = owner.find(7).await?.expect("owner sees its dish");
    assert_eq!(found["name"], json!("Soup"));
    assert_eq!(found["restaurant_id"], json!(1));

    assert!(other.find(7).await?.is_none());

    let visible = other.find_all(&Filters::new(), None, None).await?;
    assert_eq!(visible.len(), 1);
    assert!(visible.iter().all(|r| r["restaurant_id"] == json!(2)));

    assert_eq!(other.count(&Filters::new()).await?, 1);
    assert_eq!(other.count(&Filters::new().eq("name", "Soup")).await?, 0);
    Ok(())
}

#[tokio::test]
async fn cross_tenant_update_is_blocked_and_writes_nothing() -> Result<()> {
    let conn = seeded().await?;
    let other = EntityRepository::new(&conn, dishes(), ctx(2));

    let err = other
        .update(7, rec(json!({"price": 1})))
        .await
        .expect_err("update of a foreign row must fail");
    assert!(matches!(err, ScopeError::CrossTenantAccess { id: 7, .. }));

    let owner = EntityRepository::new(&conn, dishes(), ctx(1));
    let row = owner.find(7).await?.unwrap();
    assert_eq!(row["price"], json!(20));
    Ok(())
}

#[tokio::test]
async fn cross_tenant_delete_is_blocked() -> Result<()> {
    let conn = seeded().await?;
    let other = EntityRepository::new(&conn, dishes(), ctx(2));

    let err = other.delete(7).await.unwrap_err();
    assert!(matches!(err, ScopeError::CrossTenantAccess { .. }));

    let owner = EntityRepository::new(&conn, dishes(), ctx(1));
    assert!(owner.find(7).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn insert_forces_active_tenant() -> Result<()> {
    let conn = setup().await?;
    let repo = EntityRepository::new(&conn, dishes(), ctx(1));

    let id = repo
        .insert(rec(json!({"name": "Stew", "price": 9, "restaurant_id": 2})))
        .await?;

    let row = repo.find(id).await?.unwrap();
    assert_eq!(row["restaurant_id"], json!(1));

    let other = EntityRepository::new(&conn, dishes(), ctx(2));
    assert!(other.find(id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn absent_context_reads_nothing_and_writes_nothing() -> Result<()> {
    let conn = seeded().await?;
    let repo = EntityRepository::new(&conn, dishes(), TenantContext::without_tenant());

    assert!(repo.find_all(&Filters::new(), None, None).await?.is_empty());
    assert!(repo.find(7).await?.is_none());
    assert_eq!(repo.count(&Filters::new()).await?, 0);
    let page = repo.paginate(&Filters::new(), 10, 1).await?;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);

    let err = repo.insert(rec(json!({"name": "Ghost"}))).await.unwrap_err();
    assert!(matches!(err, ScopeError::TenantRequired { .. }));
    assert!(matches!(
        repo.update(7, rec(json!({"price": 1}))).await,
        Err(ScopeError::TenantRequired { .. })
    ));
    assert!(matches!(
        repo.delete(7).await,
        Err(ScopeError::TenantRequired { .. })
    ));
    assert!(matches!(repo.query(), Err(ScopeError::TenantRequired { .. })));
    Ok(())
}

#[tokio::test]
async fn guard_checks_ownership_independently() -> Result<()> {
    let conn = seeded().await?;
    let schema = dishes();

    let row = assert_ownership(&conn, &schema, &ctx(1), 7).await?;
    assert_eq!(row["name"], json!("Soup"));

    let err = assert_ownership(&conn, &schema, &ctx(2), 7).await.unwrap_err();
    assert!(matches!(err, ScopeError::CrossTenantAccess { .. }));
    assert!(!err.to_string().contains("restaurant"));

    let missing = assert_ownership(&conn, &schema, &ctx(1), 999).await.unwrap_err();
    assert!(matches!(missing, ScopeError::NotFound { id: 999, .. }));

    let none = assert_ownership(&conn, &schema, &TenantContext::without_tenant(), 7)
        .await
        .unwrap_err();
    assert!(matches!(none, ScopeError::TenantRequired { .. }));

    let other = EntityRepository::new(&conn, schema, ctx(2));
    assert!(matches!(
        other.get_owned(7).await,
        Err(ScopeError::CrossTenantAccess { id: 7, .. })
    ));
    assert_eq!(other.get_owned(8).await?["name"], json!("Salad"));
    Ok(())
}

#[tokio::test]
async fn missing_rows_update_and_delete_to_false() -> Result<()> {
    let conn = seeded().await?;
    let repo = EntityRepository::new(&conn, dishes(), ctx(1));
    assert!(!repo.update(999, rec(json!({"price": 3}))).await?);
    assert!(!repo.delete(999).await?);
    Ok(())
}
