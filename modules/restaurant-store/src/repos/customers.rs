use dinekit_db::{ConnectionTrait, EntityRepository, RecordId};
use dinekit_security::TenantContext;

use crate::error::StoreError;
use crate::models::{Customer, NewCustomer, from_record, to_record};
use crate::schemas;

const ENTITY: &str = "customer";

pub struct CustomersRepo<'c, C> {
    conn: &'c C,
    base: EntityRepository<'c, C>,
}

impl<'c, C> CustomersRepo<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, ctx: TenantContext) -> Self {
        Self {
            conn,
            base: EntityRepository::new(conn, schemas::customers(), ctx),
        }
    }

    #[must_use]
    pub fn base(&self) -> &EntityRepository<'c, C> {
        &self.base
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] without an active tenant or for a malformed email.
    pub async fn create(&self, customer: &NewCustomer) -> Result<RecordId, StoreError> {
        Ok(self.base.insert(to_record(ENTITY, customer)?).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn get(&self, id: RecordId) -> Result<Option<Customer>, StoreError> {
        self.base
            .find(id)
            .await?
            .map(|r| from_record(ENTITY, r))
            .transpose()
    }

    /// Customer of the active restaurant with this email, compared case-insensitively.
    ///
    /// The same address may exist under other restaurants; they are never matched.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, StoreError> {
        let Ok(query) = self.base.query() else {
            return Ok(None);
        };
        query
            .filter_eq("email", email.trim().to_lowercase())
            .one(self.conn)
            .await?
            .map(|r| from_record(ENTITY, r))
            .transpose()
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] if the customer belongs to another restaurant.
    pub async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.base.delete(id).await?)
    }
}
