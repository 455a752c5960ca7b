use dinekit_db::secure::FilterOp;
use dinekit_db::{ConnectionTrait, EntityRepository, Filters, Record, RecordId};
use dinekit_security::TenantContext;

use crate::error::StoreError;
use crate::models::{Dish, NewDish, from_record, to_record};
use crate::schemas;

const ENTITY: &str = "dish";

/// Menu dishes of one restaurant. Deletes are soft.
pub struct DishesRepo<'c, C> {
    conn: &'c C,
    base: EntityRepository<'c, C>,
}

impl<'c, C> DishesRepo<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, ctx: TenantContext) -> Self {
        Self {
            conn,
            base: EntityRepository::new(conn, schemas::dishes(), ctx),
        }
    }

    #[must_use]
    pub fn base(&self) -> &EntityRepository<'c, C> {
        &self.base
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] without an active tenant or when a hook
    /// rejects the dish (blank name, negative price).
    pub async fn create(&self, dish: &NewDish) -> Result<RecordId, StoreError> {
        Ok(self.base.insert(to_record(ENTITY, dish)?).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn get(&self, id: RecordId) -> Result<Option<Dish>, StoreError> {
        self.base
            .find(id)
            .await?
            .map(|r| from_record(ENTITY, r))
            .transpose()
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn by_category(&self, category_id: RecordId) -> Result<Vec<Dish>, StoreError> {
        let rows = self
            .base
            .find_all(&Filters::new().eq("category_id", category_id), None, None)
            .await?;
        decode_all(rows)
    }

    /// Dishes currently on sale, optionally capped at `max_price`.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn available(&self, max_price: Option<i64>) -> Result<Vec<Dish>, StoreError> {
        let Ok(mut query) = self.base.query() else {
            return Ok(Vec::new());
        };
        query = query.filter_eq("available", true);
        if let Some(max) = max_price {
            query = query.filter("price", FilterOp::Lte, max);
        }
        decode_all(query.order_by_asc("name").all(self.conn).await?)
    }

    /// Take a dish off the menu or put it back.
    ///
    /// Returns `false` if the active restaurant has no such live dish.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] if the dish belongs to another restaurant.
    pub async fn set_availability(&self, id: RecordId, available: bool) -> Result<bool, StoreError> {
        let mut patch = Record::new();
        patch.insert("available".to_owned(), available.into());
        Ok(self.base.update(id, patch).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] if the price is negative or the dish belongs
    /// to another restaurant.
    pub async fn set_price(&self, id: RecordId, price: i64) -> Result<bool, StoreError> {
        let mut patch = Record::new();
        patch.insert("price".to_owned(), price.into());
        Ok(self.base.update(id, patch).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] if the dish belongs to another restaurant.
    pub async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.base.delete(id).await?)
    }
}

fn decode_all(rows: Vec<Record>) -> Result<Vec<Dish>, StoreError> {
    rows.into_iter().map(|r| from_record(ENTITY, r)).collect()
}
