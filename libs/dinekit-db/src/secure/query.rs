//! Scoped query builder.
//!
//! A [`ScopedQuery`] is bound to one schema and one tenant context. The tenant
//! predicate is decided in [`ScopedQuery::new`] and kept apart from caller
//! predicates, which only ever get appended. When the statement is rendered the
//! tenant term comes first, followed by the soft-delete term and then caller
//! predicates in the order they were added:
//!
//! ```text
//! WHERE "dishes"."restaurant_id" = $1      -- fixed at construction
//!   AND "dishes"."deleted_at" IS NULL      -- schema declares soft delete
//!   AND "dishes"."category_id" = $2        -- caller filters
//! ```
use std::sync::Arc;

use dinekit_security::{TenantContext, TenantId};
use sea_orm::sea_query::{
    Alias, Asterisk, Condition, ConditionalStatement, Expr, JoinType, Order, OrderedStatement,
    Query, SelectStatement, SimpleExpr,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use serde_json::Value;

use crate::secure::values::{row_to_record, to_db_value};
use crate::secure::{EntitySchema, Filters, Record, ScopeError};

/// SQLite refuses OFFSET without LIMIT.
const NO_LIMIT: u64 = 9_223_372_036_854_775_807;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Clone, Debug)]
struct Column {
    table: String,
    field: String,
}

impl Column {
    fn expr(&self) -> Expr {
        Expr::col((Alias::new(&self.table), Alias::new(&self.field)))
    }
}

#[derive(Clone, Debug)]
enum Predicate {
    Compare {
        column: Column,
        op: FilterOp,
        value: Value,
    },
    In {
        column: Column,
        values: Vec<Value>,
    },
    Null {
        column: Column,
        is_null: bool,
    },
    Like {
        column: Column,
        pattern: String,
    },
}

impl Predicate {
    fn to_expr(&self) -> Result<SimpleExpr, ScopeError> {
        match self {
            Predicate::Compare { column, op, value } => compare(column, *op, value),
            Predicate::In { column, values } => {
                let bound = values
                    .iter()
                    .map(|v| to_db_value(&column.field, v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(column.expr().is_in(bound))
            }
            Predicate::Null { column, is_null } => Ok(if *is_null {
                column.expr().is_null()
            } else {
                column.expr().is_not_null()
            }),
            Predicate::Like { column, pattern } => Ok(column.expr().like(pattern.as_str())),
        }
    }
}

fn compare(column: &Column, op: FilterOp, value: &Value) -> Result<SimpleExpr, ScopeError> {
    let col = column.expr();
    if value.is_null() {
        return match op {
            FilterOp::Eq => Ok(col.is_null()),
            FilterOp::Ne => Ok(col.is_not_null()),
            _ => Err(ScopeError::InvalidValue {
                field: column.field.clone(),
                reason: "null only compares with eq/ne".to_owned(),
            }),
        };
    }
    let v = to_db_value(&column.field, value)?;
    Ok(match op {
        FilterOp::Eq => col.eq(v),
        FilterOp::Ne => col.ne(v),
        FilterOp::Lt => col.lt(v),
        FilterOp::Lte => col.lte(v),
        FilterOp::Gt => col.gt(v),
        FilterOp::Gte => col.gte(v),
    })
}

#[derive(Clone, Debug)]
struct JoinClause {
    kind: JoinType,
    schema: Arc<EntitySchema>,
    local: String,
    foreign: String,
}

/// Query over one entity, scoped to one tenant.
#[must_use]
#[derive(Clone, Debug)]
pub struct ScopedQuery {
    schema: Arc<EntitySchema>,
    tenant: Option<TenantId>,
    bypass: bool,
    predicates: Vec<Predicate>,
    joins: Vec<JoinClause>,
    order: Vec<(Column, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    invalid_fields: Vec<String>,
    missing_tenant_for: Option<String>,
}

impl ScopedQuery {
    /// Start a query for `schema` under `ctx`.
    ///
    /// # Errors
    /// Returns [`ScopeError::TenantRequired`] if the schema is tenant-scoped and
    /// `ctx` carries no tenant.
    pub fn new(schema: Arc<EntitySchema>, ctx: &TenantContext) -> Result<Self, ScopeError> {
        if schema.is_tenant_scoped() && !ctx.has_tenant() {
            return Err(ScopeError::tenant_required(schema.table()));
        }
        Ok(Self::with_scope(schema, ctx.tenant_id(), false))
    }

    /// Query without tenant predicate. Only reachable through the escape hatch.
    pub(crate) fn unscoped(schema: Arc<EntitySchema>) -> Self {
        Self::with_scope(schema, None, true)
    }

    fn with_scope(schema: Arc<EntitySchema>, tenant: Option<TenantId>, bypass: bool) -> Self {
        Self {
            schema,
            tenant,
            bypass,
            predicates: Vec::new(),
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            invalid_fields: Vec::new(),
            missing_tenant_for: None,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Tenant the fixed predicate is bound to; `None` for global tables and
    /// escape-hatch queries.
    #[must_use]
    pub fn tenant(&self) -> Option<TenantId> {
        if self.bypass || !self.schema.is_tenant_scoped() {
            None
        } else {
            self.tenant
        }
    }

    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        if let Some(column) = self.filter_column(field) {
            self.predicates.push(Predicate::Compare {
                column,
                op,
                value: value.into(),
            });
        }
        self
    }

    pub fn filter_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn filter_ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Ne, value)
    }

    pub fn filter_in<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if let Some(column) = self.filter_column(field) {
            self.predicates.push(Predicate::In {
                column,
                values: values.into_iter().map(Into::into).collect(),
            });
        }
        self
    }

    pub fn filter_null(mut self, field: &str) -> Self {
        if let Some(column) = self.filter_column(field) {
            self.predicates.push(Predicate::Null {
                column,
                is_null: true,
            });
        }
        self
    }

    pub fn filter_not_null(mut self, field: &str) -> Self {
        if let Some(column) = self.filter_column(field) {
            self.predicates.push(Predicate::Null {
                column,
                is_null: false,
            });
        }
        self
    }

    pub fn filter_like(mut self, field: &str, pattern: impl Into<String>) -> Self {
        if let Some(column) = self.filter_column(field) {
            self.predicates.push(Predicate::Like {
                column,
                pattern: pattern.into(),
            });
        }
        self
    }

    /// Append every equality in `filters`.
    pub fn apply_filters(self, filters: &Filters) -> Self {
        filters
            .iter()
            .fold(self, |q, (field, value)| q.filter_eq(field, value.clone()))
    }

    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        if let Some(column) = self.column(field) {
            self.order.push((column, order));
        }
        self
    }

    pub fn order_by_asc(self, field: &str) -> Self {
        self.order_by(field, Order::Asc)
    }

    pub fn order_by_desc(self, field: &str) -> Self {
        self.order_by(field, Order::Desc)
    }

    /// Values past the largest bindable integer are clamped to it.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit.min(NO_LIMIT));
        self
    }

    /// Clamped like [`ScopedQuery::limit`].
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset.min(NO_LIMIT));
        self
    }

    /// `INNER JOIN other ON base.local_field = other.foreign_field`.
    ///
    /// A tenant-scoped `other` is constrained to the same tenant inside the ON
    /// clause. Joined columns are addressed as `"table.field"` in filters.
    pub fn inner_join(self, other: &Arc<EntitySchema>, local_field: &str, foreign_field: &str) -> Self {
        self.join(JoinType::InnerJoin, other, local_field, foreign_field)
    }

    pub fn left_join(self, other: &Arc<EntitySchema>, local_field: &str, foreign_field: &str) -> Self {
        self.join(JoinType::LeftJoin, other, local_field, foreign_field)
    }

    fn join(
        mut self,
        kind: JoinType,
        other: &Arc<EntitySchema>,
        local_field: &str,
        foreign_field: &str,
    ) -> Self {
        if !self.schema.is_known(local_field) {
            self.invalid_fields.push(local_field.to_owned());
        }
        if !other.is_known(foreign_field) {
            self.invalid_fields
                .push(format!("{}.{foreign_field}", other.table()));
        }
        if other.is_tenant_scoped() && !self.bypass && self.tenant.is_none() {
            self.missing_tenant_for = Some(other.table().to_owned());
        }
        self.joins.push(JoinClause {
            kind,
            schema: Arc::clone(other),
            local: local_field.to_owned(),
            foreign: foreign_field.to_owned(),
        });
        self
    }

    /// Resolve `field` or `table.field` against the base and joined schemas.
    fn column(&mut self, name: &str) -> Option<Column> {
        let resolved = match name.split_once('.') {
            None => self.schema.is_known(name).then(|| Column {
                table: self.schema.table().to_owned(),
                field: name.to_owned(),
            }),
            Some((table, field)) => std::iter::once(&self.schema)
                .chain(self.joins.iter().map(|j| &j.schema))
                .find(|s| s.table() == table)
                .filter(|s| s.is_known(field))
                .map(|s| Column {
                    table: s.table().to_owned(),
                    field: field.to_owned(),
                }),
        };
        if resolved.is_none() {
            self.invalid_fields.push(name.to_owned());
        }
        resolved
    }

    /// Like [`ScopedQuery::column`], but a scoped query refuses caller filters on
    /// a tenant field: the fixed term is the only tenant predicate.
    fn filter_column(&mut self, name: &str) -> Option<Column> {
        let column = self.column(name)?;
        let is_tenant_field = !self.bypass
            && std::iter::once(&self.schema)
                .chain(self.joins.iter().map(|j| &j.schema))
                .any(|s| {
                    s.table() == column.table && s.tenant_field() == Some(column.field.as_str())
                });
        if is_tenant_field {
            self.invalid_fields.push(name.to_owned());
            return None;
        }
        Some(column)
    }

    fn check(&self) -> Result<(), ScopeError> {
        if let Some(table) = &self.missing_tenant_for {
            return Err(ScopeError::tenant_required(table));
        }
        match self.invalid_fields.first() {
            Some(field) => Err(ScopeError::invalid_field(self.schema.table(), field)),
            None => Ok(()),
        }
    }

    fn base(&self) -> Alias {
        Alias::new(self.schema.table())
    }

    /// Fixed tenant term, soft-delete term, then caller predicates.
    fn condition(&self) -> Result<Condition, ScopeError> {
        let mut cond = Condition::all();
        if let (Some(field), Some(tenant)) = (self.schema.tenant_field(), self.tenant())
        {
            cond = cond.add(Expr::col((self.base(), Alias::new(field))).eq(tenant.get()));
        }
        if let Some(field) = self.schema.soft_delete_field() {
            cond = cond.add(Expr::col((self.base(), Alias::new(field))).is_null());
        }
        for p in &self.predicates {
            cond = cond.add(p.to_expr()?);
        }
        Ok(cond)
    }

    fn apply_joins(&self, stmt: &mut SelectStatement) {
        for join in &self.joins {
            let joined = Alias::new(join.schema.table());
            let mut on = Condition::all().add(
                Expr::col((self.base(), Alias::new(&join.local)))
                    .equals((joined.clone(), Alias::new(&join.foreign))),
            );
            if let Some(field) = join.schema.tenant_field() {
                let joined_tenant = Expr::col((joined.clone(), Alias::new(field)));
                if let (false, Some(tenant)) = (self.bypass, self.tenant) {
                    on = on.add(joined_tenant.eq(tenant.get()));
                } else if let Some(base_field) = self.schema.tenant_field() {
                    on = on.add(joined_tenant.equals((self.base(), Alias::new(base_field))));
                }
            }
            if let Some(field) = join.schema.soft_delete_field() {
                on = on.add(Expr::col((joined.clone(), Alias::new(field))).is_null());
            }
            stmt.join(join.kind, joined, on);
        }
    }

    fn select_statement(&self) -> Result<SelectStatement, ScopeError> {
        self.check()?;
        let mut stmt = Query::select();
        stmt.column((self.base(), Asterisk)).from(self.base());
        self.apply_joins(&mut stmt);
        stmt.cond_where(self.condition()?);

        if self.order.is_empty() {
            stmt.order_by(
                (self.base(), Alias::new(self.schema.primary_key())),
                Order::Asc,
            );
        }
        for (column, order) in &self.order {
            stmt.order_by(
                (Alias::new(&column.table), Alias::new(&column.field)),
                order.clone(),
            );
        }
        match (self.limit, self.offset) {
            (Some(limit), _) => {
                stmt.limit(limit);
            }
            (None, Some(_)) => {
                stmt.limit(NO_LIMIT);
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            stmt.offset(offset);
        }
        Ok(stmt)
    }

    fn count_statement(&self) -> Result<SelectStatement, ScopeError> {
        self.check()?;
        let mut stmt = Query::select();
        stmt.expr_as(Expr::cust("COUNT(*)"), Alias::new("count"))
            .from(self.base());
        self.apply_joins(&mut stmt);
        stmt.cond_where(self.condition()?);
        Ok(stmt)
    }

    /// `SELECT field, COUNT(*) ... GROUP BY field`, same scoping as every other statement.
    pub(crate) fn grouped_count_statement(&self, field: &str) -> Result<SelectStatement, ScopeError> {
        if !self.schema.is_known(field) {
            return Err(ScopeError::invalid_field(self.schema.table(), field));
        }
        let mut stmt = self.count_statement()?;
        let column = (self.base(), Alias::new(field));
        stmt.column(column.clone())
            .group_by_col(column.clone())
            .order_by(column, Order::Asc);
        Ok(stmt)
    }

    /// Render the SELECT for `backend`.
    ///
    /// # Errors
    /// Returns [`ScopeError::InvalidField`] for unknown filter or order fields,
    /// [`ScopeError::TenantRequired`] for a tenant-scoped join without a tenant,
    /// or [`ScopeError::InvalidValue`] for values that cannot be bound.
    pub fn build(&self, backend: DatabaseBackend) -> Result<Statement, ScopeError> {
        Ok(backend.build(&self.select_statement()?))
    }

    /// Render the `COUNT(*)` form for `backend`. Ordering, limit and offset are ignored.
    ///
    /// # Errors
    /// Same as [`ScopedQuery::build`].
    pub fn build_count(&self, backend: DatabaseBackend) -> Result<Statement, ScopeError> {
        Ok(backend.build(&self.count_statement()?))
    }

    /// # Errors
    /// Returns a construction error (see [`ScopedQuery::build`]) or `ScopeError::Db`.
    pub async fn all<C>(self, conn: &C) -> Result<Vec<Record>, ScopeError>
    where
        C: ConnectionTrait,
    {
        let stmt = self.build(conn.get_database_backend())?;
        tracing::debug!(table = self.schema.table(), tenant = ?self.tenant(), "scoped select");
        let rows = conn.query_all(stmt).await?;
        rows.iter()
            .map(|row| row_to_record(&self.schema, row))
            .collect()
    }

    /// # Errors
    /// Same as [`ScopedQuery::all`].
    pub async fn one<C>(self, conn: &C) -> Result<Option<Record>, ScopeError>
    where
        C: ConnectionTrait,
    {
        let rows = self.limit(1).all(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// # Errors
    /// Same as [`ScopedQuery::all`].
    pub async fn count<C>(self, conn: &C) -> Result<u64, ScopeError>
    where
        C: ConnectionTrait,
    {
        let stmt = self.build_count(conn.get_database_backend())?;
        tracing::debug!(table = self.schema.table(), tenant = ?self.tenant(), "scoped count");
        let count: i64 = match conn.query_one(stmt).await? {
            Some(row) => row.try_get("", "count")?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// # Errors
    /// Same as [`ScopedQuery::all`].
    pub async fn exists<C>(self, conn: &C) -> Result<bool, ScopeError>
    where
        C: ConnectionTrait,
    {
        Ok(self.one(conn).await?.is_some())
    }
}
