//! Initial restaurant tables.
//!
//! Timestamps are RFC 3339 text so the same schema works on SQLite and Postgres.

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
                    .table(Restaurants::Table)
                    .if_not_exists()
                    .col(id_column(Restaurants::Id))
                    .col(ColumnDef::new(Restaurants::Name).text().not_null())
                    .col(ColumnDef::new(Restaurants::Address).text())
                    .col(ColumnDef::new(Restaurants::Phone).text())
                    .col(
                        ColumnDef::new(Restaurants::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Restaurants::CreatedAt).text())
                    .col(ColumnDef::new(Restaurants::UpdatedAt).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(id_column(Categories::Id))
                    .col(ColumnDef::new(Categories::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Categories::Name).text().not_null())
                    .col(
                        ColumnDef::new(Categories::Position)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Categories::CreatedAt).text())
                    .col(ColumnDef::new(Categories::UpdatedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                Categories::Table,
                Categories::RestaurantId,
                "idx_categories_restaurant",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Dishes::Table)
                    .if_not_exists()
                    .col(id_column(Dishes::Id))
                    .col(ColumnDef::new(Dishes::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Dishes::CategoryId).big_integer())
                    .col(ColumnDef::new(Dishes::Name).text().not_null())
                    .col(ColumnDef::new(Dishes::Description).text())
                    // Minor currency units.
                    .col(
                        ColumnDef::new(Dishes::Price)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Dishes::Available)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Dishes::Tags).text())
                    .col(ColumnDef::new(Dishes::CreatedAt).text())
                    .col(ColumnDef::new(Dishes::UpdatedAt).text())
                    .col(ColumnDef::new(Dishes::DeletedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                Dishes::Table,
                Dishes::RestaurantId,
                "idx_dishes_restaurant",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiningTables::Table)
                    .if_not_exists()
                    .col(id_column(DiningTables::Id))
                    .col(ColumnDef::new(DiningTables::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(DiningTables::Number).big_integer().not_null())
                    .col(
                        ColumnDef::new(DiningTables::Seats)
                            .big_integer()
                            .not_null()
                            .default(2),
                    )
                    .col(
                        ColumnDef::new(DiningTables::Status)
                            .text()
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(DiningTables::CreatedAt).text())
                    .col(ColumnDef::new(DiningTables::UpdatedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                DiningTables::Table,
                DiningTables::RestaurantId,
                "idx_dining_tables_restaurant",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(id_column(Customers::Id))
                    .col(ColumnDef::new(Customers::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Customers::Name).text().not_null())
                    .col(ColumnDef::new(Customers::Email).text())
                    .col(ColumnDef::new(Customers::Phone).text())
                    .col(ColumnDef::new(Customers::Notes).text())
                    .col(ColumnDef::new(Customers::CreatedAt).text())
                    .col(ColumnDef::new(Customers::UpdatedAt).text())
                    .col(ColumnDef::new(Customers::DeletedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                Customers::Table,
                Customers::RestaurantId,
                "idx_customers_restaurant",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employees::Table)
                    .if_not_exists()
                    .col(id_column(Employees::Id))
                    .col(ColumnDef::new(Employees::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Employees::Name).text().not_null())
                    .col(ColumnDef::new(Employees::Email).text())
                    .col(ColumnDef::new(Employees::Role).text().not_null())
                    .col(
                        ColumnDef::new(Employees::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Employees::CreatedAt).text())
                    .col(ColumnDef::new(Employees::UpdatedAt).text())
                    .col(ColumnDef::new(Employees::DeletedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                Employees::Table,
                Employees::RestaurantId,
                "idx_employees_restaurant",
            ))
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(id_column(Orders::Id))
                    .col(ColumnDef::new(Orders::RestaurantId).big_integer().not_null())
                    .col(ColumnDef::new(Orders::TableId).big_integer())
                    .col(ColumnDef::new(Orders::CustomerId).big_integer())
                    .col(ColumnDef::new(Orders::EmployeeId).big_integer())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .text()
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Orders::Items).text())
                    .col(
                        ColumnDef::new(Orders::Total)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::Notes).text())
                    .col(ColumnDef::new(Orders::ClosedAt).text())
                    .col(ColumnDef::new(Orders::CreatedAt).text())
                    .col(ColumnDef::new(Orders::UpdatedAt).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(tenant_index(
                Orders::Table,
                Orders::RestaurantId,
                "idx_orders_restaurant",
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Employees::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DiningTables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Dishes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Restaurants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Restaurants {
    Table,
    Id,
    Name,
    Address,
    Phone,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    RestaurantId,
    Name,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Dishes {
    Table,
    Id,
    RestaurantId,
    CategoryId,
    Name,
    Description,
    Price,
    Available,
    Tags,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum DiningTables {
    Table,
    Id,
    RestaurantId,
    Number,
    Seats,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    RestaurantId,
    Name,
    Email,
    Phone,
    Notes,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
    RestaurantId,
    Name,
    Email,
    Role,
    Active,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    RestaurantId,
    TableId,
    CustomerId,
    EmployeeId,
    Status,
    Items,
    Total,
    Notes,
    ClosedAt,
    CreatedAt,
    UpdatedAt,
}
