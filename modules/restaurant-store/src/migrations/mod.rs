//! Database migrations for the restaurant store.

use sea_orm_migration::prelude::*;

mod m20251001_000001_create_restaurant_tables;
mod m20251015_000001_create_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_restaurant_tables::Migration),
            Box::new(m20251015_000001_create_audit_logs::Migration),
        ]
    }
}

/// Primary key column shared by every table.
fn id_column<T: IntoIden>(name: T) -> ColumnDef {
    ColumnDef::new(name)
        .big_integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn tenant_index<T: IntoIden + 'static>(table: T, column: T, name: &str) -> IndexCreateStatement {
    Index::create()
        .name(name)
        .if_not_exists()
        .table(table)
        .col(column)
        .to_owned()
}
