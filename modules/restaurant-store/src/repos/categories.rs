use dinekit_db::{ConnectionTrait, EntityRepository, RecordId};
use dinekit_security::TenantContext;

use crate::error::StoreError;
use crate::models::{Category, NewCategory, from_record, to_record};
use crate::schemas;

const ENTITY: &str = "category";

pub struct CategoriesRepo<'c, C> {
    conn: &'c C,
    base: EntityRepository<'c, C>,
}

impl<'c, C> CategoriesRepo<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, ctx: TenantContext) -> Self {
        Self {
            conn,
            base: EntityRepository::new(conn, schemas::categories(), ctx),
        }
    }

    #[must_use]
    pub fn base(&self) -> &EntityRepository<'c, C> {
        &self.base
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] without an active tenant or on a rejected name.
    pub async fn create(&self, category: &NewCategory) -> Result<RecordId, StoreError> {
        Ok(self.base.insert(to_record(ENTITY, category)?).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn get(&self, id: RecordId) -> Result<Option<Category>, StoreError> {
        self.base
            .find(id)
            .await?
            .map(|r| from_record(ENTITY, r))
            .transpose()
    }

    /// Categories of the active restaurant in menu order.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let Ok(query) = self.base.query() else {
            return Ok(Vec::new());
        };
        let rows = query
            .order_by_asc("position")
            .order_by_asc("id")
            .all(self.conn)
            .await?;
        rows.into_iter().map(|r| from_record(ENTITY, r)).collect()
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] if the category belongs to another restaurant.
    pub async fn rename(&self, id: RecordId, name: &str) -> Result<bool, StoreError> {
        let mut patch = dinekit_db::Record::new();
        patch.insert("name".to_owned(), name.into());
        Ok(self.base.update(id, patch).await?)
    }

    /// Hard delete; dishes keep their dangling `category_id`.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] if the category belongs to another restaurant.
    pub async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.base.delete(id).await?)
    }
}
