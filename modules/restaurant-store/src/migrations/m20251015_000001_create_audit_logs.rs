//! Append-only audit trail per restaurant.

use sea_orm_migration::prelude::*;

use super::{id_column, tenant_index};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(id_column(AuditLogs::Id))
                    .col(ColumnDef::new(AuditLogs::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(AuditLogs::Actor).text())
                    .col(ColumnDef::new(AuditLogs::Action).text().not_null())
                    .col(ColumnDef::new(AuditLogs::Entity).text().not_null())
                    .col(ColumnDef::new(AuditLogs::EntityId).big_integer())
                    .col(ColumnDef::new(AuditLogs::Details).text())
                    .col(ColumnDef::new(AuditLogs::CreatedAt).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(tenant_index(
                AuditLogs::Table,
                AuditLogs::RestaurantId,
                "idx_audit_logs_restaurant",
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    RestaurantId,
    Actor,
    Action,
    Entity,
    EntityId,
    Details,
    CreatedAt,
}
