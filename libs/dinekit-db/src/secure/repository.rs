//! Generic tenant-scoped repository.
use std::sync::Arc;

use dinekit_security::TenantContext;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::secure::guard::assert_ownership;
use crate::secure::ops::{self, WriteScope};
use crate::secure::{EntitySchema, Filters, Record, RecordId, ScopeError, ScopedQuery};

/// One page of results. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Record>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// CRUD over one entity, bound to one tenant context and one connection.
///
/// `C` is a plain connection or a transaction. Construct one repository per unit
/// of work; the context can't change afterwards.
pub struct EntityRepository<'c, C> {
    conn: &'c C,
    schema: Arc<EntitySchema>,
    ctx: TenantContext,
}

impl<'c, C> EntityRepository<'c, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'c C, schema: Arc<EntitySchema>, ctx: TenantContext) -> Self {
        Self { conn, schema, ctx }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    #[must_use]
    pub fn context(&self) -> &TenantContext {
        &self.ctx
    }

    pub(crate) fn conn(&self) -> &'c C {
        self.conn
    }

    /// Scoped query for custom reads.
    ///
    /// # Errors
    /// Returns [`ScopeError::TenantRequired`] when the schema is tenant-scoped
    /// and the context has no tenant.
    pub fn query(&self) -> Result<ScopedQuery, ScopeError> {
        ScopedQuery::new(Arc::clone(&self.schema), &self.ctx)
    }

    /// `None` when reads must come back empty: tenant-scoped schema, no tenant.
    fn read_query(&self) -> Option<ScopedQuery> {
        let q = self.query().ok();
        if q.is_none() {
            tracing::debug!(table = self.schema.table(), "no tenant in context; read is empty");
        }
        q
    }

    fn write_scope(&self) -> Result<WriteScope, ScopeError> {
        if !self.schema.is_tenant_scoped() {
            return Ok(WriteScope::Global);
        }
        self.ctx
            .tenant_id()
            .map(WriteScope::Tenant)
            .ok_or_else(|| ScopeError::tenant_required(self.schema.table()))
    }

    /// Row `id` of the active tenant. Rows of other tenants look absent.
    ///
    /// # Errors
    /// Returns `ScopeError::Db` on storage failure.
    pub async fn find(&self, id: RecordId) -> Result<Option<Record>, ScopeError> {
        let Some(q) = self.read_query() else {
            return Ok(None);
        };
        q.filter_eq(self.schema.primary_key(), id)
            .one(self.conn)
            .await
    }

    /// Row `id` after the ownership check. Unlike [`EntityRepository::find`], a
    /// row of another tenant is reported instead of looking absent.
    ///
    /// # Errors
    /// See [`assert_ownership`].
    pub async fn get_owned(&self, id: RecordId) -> Result<Record, ScopeError> {
        assert_ownership(self.conn, &self.schema, &self.ctx, id).await
    }

    /// Equality-filtered rows of the active tenant, ordered by primary key.
    ///
    /// # Errors
    /// Returns [`ScopeError::InvalidField`] for filters on unknown fields, or
    /// `ScopeError::Db` on storage failure.
    pub async fn find_all(
        &self,
        filters: &Filters,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Record>, ScopeError> {
        let Some(mut q) = self.read_query() else {
            return Ok(Vec::new());
        };
        q = q.apply_filters(filters);
        if let Some(limit) = limit {
            q = q.limit(limit);
        }
        if let Some(offset) = offset {
            q = q.offset(offset);
        }
        q.all(self.conn).await
    }

    /// # Errors
    /// Same as [`EntityRepository::find_all`].
    pub async fn count(&self, filters: &Filters) -> Result<u64, ScopeError> {
        let Some(q) = self.read_query() else {
            return Ok(0);
        };
        q.apply_filters(filters).count(self.conn).await
    }

    /// Page `page` (1-based, 0 is read as 1) of `page_size` rows.
    ///
    /// # Errors
    /// Same as [`EntityRepository::find_all`].
    pub async fn paginate(
        &self,
        filters: &Filters,
        page_size: u64,
        page: u64,
    ) -> Result<Page, ScopeError> {
        let Some(q) = self.read_query() else {
            return Ok(empty_page(page_size, page));
        };
        paginate_query(self.conn, q.apply_filters(filters), page_size, page).await
    }

    /// Insert `record` for the active tenant and return its primary key.
    ///
    /// Any tenant value supplied by the caller is replaced.
    ///
    /// # Errors
    /// - [`ScopeError::TenantRequired`] without an active tenant
    /// - [`ScopeError::InvalidField`] for fields outside the allow-list, from the
    ///   caller or from a hook
    /// - [`ScopeError::Hook`] when a hook rejects the record
    pub async fn insert(&self, record: Record) -> Result<RecordId, ScopeError> {
        let scope = self.write_scope()?;
        ops::insert(self.conn, &self.schema, scope, record).await
    }

    /// Apply `patch` to row `id`. Returns `false` if no live row of the active
    /// tenant has that id.
    ///
    /// # Errors
    /// - [`ScopeError::InvalidField`] for disallowed fields, the tenant field or the primary key
    /// - [`ScopeError::CrossTenantAccess`] if another tenant owns the row
    /// - [`ScopeError::TenantRequired`] without an active tenant
    pub async fn update(&self, id: RecordId, patch: Record) -> Result<bool, ScopeError> {
        ops::check_patch(&self.schema, &patch)?;
        let scope = self.write_scope()?;
        let Some(current) = self.guarded(id).await? else {
            return Ok(false);
        };
        ops::update(self.conn, &self.schema, scope, id, patch, &current).await
    }

    /// Delete row `id`; soft delete when the schema declares a soft-delete field.
    ///
    /// # Errors
    /// Same as [`EntityRepository::update`], minus field validation.
    pub async fn delete(&self, id: RecordId) -> Result<bool, ScopeError> {
        let scope = self.write_scope()?;
        if self.guarded(id).await?.is_none() {
            return Ok(false);
        }
        ops::delete(self.conn, &self.schema, scope, id).await
    }

    /// Ownership check; a missing row becomes `None`.
    async fn guarded(&self, id: RecordId) -> Result<Option<Record>, ScopeError> {
        match assert_ownership(self.conn, &self.schema, &self.ctx, id).await {
            Ok(row) => Ok(Some(row)),
            Err(ScopeError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn empty_page(page_size: u64, page: u64) -> Page {
    Page {
        items: Vec::new(),
        total: 0,
        page: page.max(1),
        page_size,
    }
}

pub(crate) async fn paginate_query<C>(
    conn: &C,
    query: ScopedQuery,
    page_size: u64,
    page: u64,
) -> Result<Page, ScopeError>
where
    C: ConnectionTrait,
{
    let page = page.max(1);
    let total = query.clone().count(conn).await?;
    let offset = (page - 1).checked_mul(page_size);
    let items = match offset {
        Some(offset) if page_size > 0 && offset < total => {
            query.limit(page_size).offset(offset).all(conn).await?
        }
        _ => Vec::new(),
    };
    Ok(Page {
        items,
        total,
        page,
        page_size,
    })
}
