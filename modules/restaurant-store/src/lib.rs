#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Restaurant domain on top of the tenant-isolated data-access layer.
//!
//! - [`schemas`]: entity descriptors for every restaurant table
//! - [`migrations::Migrator`]: creates those tables
//! - [`repos`]: typed repositories, each bound to one restaurant
//! - [`admin`]: privileged operations spanning restaurants
pub mod admin;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repos;
pub mod schemas;

pub use admin::{MenuCopy, TableReport, TenantCount, duplicate_menu, tenant_report};
pub use error::StoreError;
pub use migrations::Migrator;
pub use repos::{AuditLogRepo, CategoriesRepo, CustomersRepo, DishesRepo, OrdersRepo};
