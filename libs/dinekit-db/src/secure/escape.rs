//! Escape hatch: privilege-gated access without the tenant predicate.
//!
//! An [`UnscopedRepository`] is a separate, smaller type. It borrows the scoped
//! repository it was opened from, cannot be cloned, and has no way back to a
//! scoped handle. Acquisition and release are logged on the `security` target;
//! release is logged from `Drop`, so every exit path is covered.
use std::sync::Arc;

use dinekit_security::{PrivilegeAssertion, TenantId};
use sea_orm::ConnectionTrait;

use crate::secure::guard::is_soft_deleted;
use crate::secure::ops::{self, WriteScope, load_raw};
use crate::secure::repository::paginate_query;
use crate::secure::{
    EntityRepository, EntitySchema, Filters, Page, Record, RecordId, ScopeError, ScopedQuery,
};

/// Unscoped view over the same table and connection as a scoped repository.
pub struct UnscopedRepository<'r, 'c, C>
where
    C: ConnectionTrait,
{
    repo: &'r EntityRepository<'c, C>,
    role: String,
}

/// Open an unscoped handle over `repo`.
///
/// `privilege` must come from the caller's authorization layer; this function
/// only checks that one was supplied.
///
/// # Errors
/// Returns [`ScopeError::PrivilegeRequired`] for an empty assertion.
pub fn without_tenant_scope<'r, 'c, C>(
    repo: &'r EntityRepository<'c, C>,
    privilege: &PrivilegeAssertion,
) -> Result<UnscopedRepository<'r, 'c, C>, ScopeError>
where
    C: ConnectionTrait,
{
    let table = repo.schema().table();
    if privilege.is_empty() {
        tracing::warn!(target: "security", table, "tenant scope bypass refused: no privilege");
        return Err(ScopeError::PrivilegeRequired(
            "a non-empty privilege assertion is required to bypass tenant scope",
        ));
    }
    tracing::warn!(
        target: "security",
        table,
        role = privilege.role(),
        tenant = ?repo.context().tenant_id(),
        "tenant scope bypass acquired"
    );
    Ok(UnscopedRepository {
        repo,
        role: privilege.role().to_owned(),
    })
}

impl<C> UnscopedRepository<'_, '_, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        self.repo.schema()
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Query without tenant predicate. Soft-deleted rows are still excluded.
    pub fn query(&self) -> ScopedQuery {
        ScopedQuery::unscoped(Arc::clone(self.repo.schema()))
    }

    /// # Errors
    /// Returns `ScopeError::Db` on storage failure.
    pub async fn find(&self, id: RecordId) -> Result<Option<Record>, ScopeError> {
        self.query()
            .filter_eq(self.schema().primary_key(), id)
            .one(self.repo.conn())
            .await
    }

    /// # Errors
    /// Returns [`ScopeError::InvalidField`] for unknown filter fields or `ScopeError::Db`.
    pub async fn find_all(
        &self,
        filters: &Filters,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Record>, ScopeError> {
        let mut q = self.query().apply_filters(filters);
        if let Some(limit) = limit {
            q = q.limit(limit);
        }
        if let Some(offset) = offset {
            q = q.offset(offset);
        }
        q.all(self.repo.conn()).await
    }

    /// # Errors
    /// Same as [`UnscopedRepository::find_all`].
    pub async fn count(&self, filters: &Filters) -> Result<u64, ScopeError> {
        self.query()
            .apply_filters(filters)
            .count(self.repo.conn())
            .await
    }

    /// # Errors
    /// Same as [`UnscopedRepository::find_all`].
    pub async fn paginate(
        &self,
        filters: &Filters,
        page_size: u64,
        page: u64,
    ) -> Result<Page, ScopeError> {
        paginate_query(
            self.repo.conn(),
            self.query().apply_filters(filters),
            page_size,
            page,
        )
        .await
    }

    /// Insert a row for the tenant named in `record`.
    ///
    /// # Errors
    /// Returns [`ScopeError::TenantRequired`] if the schema is tenant-scoped and
    /// `record` does not carry a valid owning tenant, plus the errors of
    /// [`EntityRepository::insert`].
    pub async fn insert(&self, record: Record) -> Result<RecordId, ScopeError> {
        let id = ops::insert(self.repo.conn(), self.schema(), WriteScope::Bypass, record).await?;
        tracing::info!(target: "security", table = self.schema().table(), id, role = %self.role, "unscoped insert");
        Ok(id)
    }

    /// # Errors
    /// Returns [`ScopeError::InvalidField`] for disallowed fields, the tenant field
    /// or the primary key.
    pub async fn update(&self, id: RecordId, patch: Record) -> Result<bool, ScopeError> {
        ops::check_patch(self.schema(), &patch)?;
        let Some(current) = self.live_row(id).await? else {
            return Ok(false);
        };
        let updated =
            ops::update(self.repo.conn(), self.schema(), WriteScope::Bypass, id, patch, &current)
                .await?;
        tracing::info!(target: "security", table = self.schema().table(), id, role = %self.role, "unscoped update");
        Ok(updated)
    }

    /// # Errors
    /// Returns `ScopeError::Db` on storage failure.
    pub async fn delete(&self, id: RecordId) -> Result<bool, ScopeError> {
        if self.live_row(id).await?.is_none() {
            return Ok(false);
        }
        let deleted = ops::delete(self.repo.conn(), self.schema(), WriteScope::Bypass, id).await?;
        tracing::info!(target: "security", table = self.schema().table(), id, role = %self.role, "unscoped delete");
        Ok(deleted)
    }

    /// Live rows per owning tenant, ascending by tenant. Global tables report a
    /// single `None` bucket.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` on storage failure.
    pub async fn count_by_tenant(&self) -> Result<Vec<(Option<TenantId>, u64)>, ScopeError> {
        let conn = self.repo.conn();
        let Some(field) = self.schema().tenant_field() else {
            let total = self.query().count(conn).await?;
            return Ok(vec![(None, total)]);
        };
        let stmt = self.query().grouped_count_statement(field)?;
        let rows = conn
            .query_all(conn.get_database_backend().build(&stmt))
            .await?;
        rows.iter()
            .map(|row| -> Result<_, ScopeError> {
                let tenant: Option<i64> = row.try_get("", field)?;
                let count: i64 = row.try_get("", "count")?;
                Ok((
                    tenant.and_then(TenantId::new),
                    u64::try_from(count).unwrap_or_default(),
                ))
            })
            .collect()
    }

    async fn live_row(&self, id: RecordId) -> Result<Option<Record>, ScopeError> {
        let row = load_raw(self.repo.conn(), self.schema(), id).await?;
        Ok(row.filter(|r| !is_soft_deleted(self.schema(), r)))
    }
}

impl<C> Drop for UnscopedRepository<'_, '_, C>
where
    C: ConnectionTrait,
{
    fn drop(&mut self) {
        tracing::warn!(
            target: "security",
            table = self.repo.schema().table(),
            role = %self.role,
            "tenant scope bypass released"
        );
    }
}
