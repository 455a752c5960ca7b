use dinekit_db::{ConnectionTrait, EntityRepository, Filters, Record, RecordId, ScopeError};
use dinekit_security::TenantContext;
use serde_json::Value;

use crate::error::StoreError;
use crate::models::{NewOrder, Order, OrderItem, OrderStatus, from_record, to_record};
use crate::schemas;

const ENTITY: &str = "order";

/// Orders of one restaurant. `total` is maintained by the schema from `items`.
pub struct OrdersRepo<'c, C> {
    base: EntityRepository<'c, C>,
}

impl<'c, C> OrdersRepo<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, ctx: TenantContext) -> Self {
        Self {
            base: EntityRepository::new(conn, schemas::orders(), ctx),
        }
    }

    #[must_use]
    pub fn base(&self) -> &EntityRepository<'c, C> {
        &self.base
    }

    /// Open a new order.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] without an active tenant or when an item
    /// has a non-positive quantity or a negative price.
    pub async fn open(&self, order: &NewOrder) -> Result<RecordId, StoreError> {
        Ok(self.base.insert(to_record(ENTITY, order)?).await?)
    }

    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn get(&self, id: RecordId) -> Result<Option<Order>, StoreError> {
        self.base
            .find(id)
            .await?
            .map(|r| from_record(ENTITY, r))
            .transpose()
    }

    /// Open orders, oldest first.
    ///
    /// # Errors
    /// Returns [`StoreError::Scope`] on storage failure.
    pub async fn open_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.base
            .find_all(&Filters::new().eq("status", "open"), None, None)
            .await?
            .into_iter()
            .map(|r| from_record(ENTITY, r))
            .collect()
    }

    /// Replace the items of an open order; the total follows.
    ///
    /// # Errors
    /// See [`OrdersRepo::close`].
    pub async fn replace_items(&self, id: RecordId, items: &[OrderItem]) -> Result<Order, StoreError> {
        self.open_order(id).await?;
        let items = serde_json::to_value(items)
            .map_err(|source| StoreError::Mapping { entity: ENTITY, source })?;
        let mut patch = Record::new();
        patch.insert("items".to_owned(), items);
        self.apply(id, patch).await
    }

    /// Close an open order and stamp `closed_at`.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the active restaurant has no such order
    /// - [`StoreError::Validation`] if the order is no longer open
    /// - [`StoreError::Scope`] if the order belongs to another restaurant
    pub async fn close(&self, id: RecordId) -> Result<Order, StoreError> {
        self.finish(id, OrderStatus::Closed).await
    }

    /// # Errors
    /// Same as [`OrdersRepo::close`].
    pub async fn cancel(&self, id: RecordId) -> Result<Order, StoreError> {
        self.finish(id, OrderStatus::Cancelled).await
    }

    async fn finish(&self, id: RecordId, status: OrderStatus) -> Result<Order, StoreError> {
        self.open_order(id).await?;
        let mut patch = Record::new();
        patch.insert("status".to_owned(), status.as_str().into());
        patch.insert(
            "closed_at".to_owned(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let order = self.apply(id, patch).await?;
        tracing::debug!(order = id, status = ?order.status, "order finished");
        Ok(order)
    }

    /// Owned order that is still open.
    async fn open_order(&self, id: RecordId) -> Result<Order, StoreError> {
        let row = self.base.get_owned(id).await.map_err(|e| match e {
            ScopeError::NotFound { .. } => StoreError::NotFound { entity: ENTITY, id },
            other => StoreError::Scope(other),
        })?;
        let order: Order = from_record(ENTITY, row)?;
        if order.status != OrderStatus::Open {
            return Err(StoreError::validation(
                "status",
                format!("order {id} is {}", order.status.as_str()),
            ));
        }
        Ok(order)
    }

    async fn apply(&self, id: RecordId, patch: Record) -> Result<Order, StoreError> {
        if !self.base.update(id, patch).await? {
            return Err(StoreError::NotFound { entity: ENTITY, id });
        }
        self.get(id)
            .await?
            .ok_or(StoreError::NotFound { entity: ENTITY, id })
    }
}
