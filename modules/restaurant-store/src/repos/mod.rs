//! Typed repositories over [`EntityRepository`](dinekit_db::EntityRepository).
//!
//! Each one is bound to a single tenant context at construction and goes
//! through the base repository for every statement.
mod audit_log;
mod categories;
mod customers;
mod dishes;
mod orders;

pub use audit_log::AuditLogRepo;
pub use categories::CategoriesRepo;
pub use customers::CustomersRepo;
pub use dishes::DishesRepo;
pub use orders::OrdersRepo;
