use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::secure::hooks::{JsonEncode, RecordHook};

pub const DEFAULT_TENANT_FIELD: &str = "restaurant_id";
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// How a table relates to tenants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TenantScoping {
    /// Rows are owned by the tenant stored in this column.
    Field(String),
    /// Global table, declared explicitly with [`EntitySchemaBuilder::no_tenant_scope`].
    Global,
}

/// Static descriptor of one entity table.
///
/// Built once through [`EntitySchema::builder`] and shared as `Arc<EntitySchema>`.
/// There is no way to mutate a schema after `build()`.
pub struct EntitySchema {
    table: String,
    primary_key: String,
    scoping: TenantScoping,
    fields: BTreeSet<String>,
    soft_delete: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    json_fields: Vec<String>,
    pre_insert: Vec<Arc<dyn RecordHook>>,
    pre_update: Vec<Arc<dyn RecordHook>>,
}

impl EntitySchema {
    #[must_use]
    pub fn builder(table: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            table: table.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_owned(),
            scoping: TenantScoping::Field(DEFAULT_TENANT_FIELD.to_owned()),
            fields: BTreeSet::new(),
            soft_delete: None,
            created_at: None,
            updated_at: None,
            json_fields: Vec::new(),
            pre_insert: Vec::new(),
            pre_update: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    #[must_use]
    pub fn scoping(&self) -> &TenantScoping {
        &self.scoping
    }

    /// `None` for global tables.
    #[must_use]
    pub fn tenant_field(&self) -> Option<&str> {
        match &self.scoping {
            TenantScoping::Field(f) => Some(f),
            TenantScoping::Global => None,
        }
    }

    #[must_use]
    pub fn is_tenant_scoped(&self) -> bool {
        matches!(self.scoping, TenantScoping::Field(_))
    }

    #[must_use]
    pub fn soft_delete_field(&self) -> Option<&str> {
        self.soft_delete.as_deref()
    }

    #[must_use]
    pub fn created_at_field(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    #[must_use]
    pub fn updated_at_field(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    #[must_use]
    pub fn json_fields(&self) -> &[String] {
        &self.json_fields
    }

    pub(crate) fn pre_insert_hooks(&self) -> &[Arc<dyn RecordHook>] {
        &self.pre_insert
    }

    pub(crate) fn pre_update_hooks(&self) -> &[Arc<dyn RecordHook>] {
        &self.pre_update
    }

    /// Caller-declared business fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Any column the table is known to have: usable in filters and ordering.
    #[must_use]
    pub fn is_known(&self, field: &str) -> bool {
        field == self.primary_key
            || self.tenant_field() == Some(field)
            || self.soft_delete.as_deref() == Some(field)
            || self.created_at.as_deref() == Some(field)
            || self.updated_at.as_deref() == Some(field)
            || self.fields.contains(field)
    }

    /// Fields a record may carry on insert. The tenant field is accepted and
    /// then overwritten with the active tenant.
    #[must_use]
    pub fn is_insertable(&self, field: &str) -> bool {
        self.fields.contains(field)
            || self.tenant_field() == Some(field)
            || self.created_at.as_deref() == Some(field)
            || self.updated_at.as_deref() == Some(field)
    }

    /// Fields a patch may carry. Primary key and tenant field never qualify.
    #[must_use]
    pub fn is_updatable(&self, field: &str) -> bool {
        if field == self.primary_key || self.tenant_field() == Some(field) {
            return false;
        }
        self.fields.contains(field) || self.updated_at.as_deref() == Some(field)
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |hooks: &[Arc<dyn RecordHook>]| {
            hooks.iter().map(|h| h.name().to_owned()).collect::<Vec<_>>()
        };
        f.debug_struct("EntitySchema")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("scoping", &self.scoping)
            .field("fields", &self.fields)
            .field("soft_delete", &self.soft_delete)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("json_fields", &self.json_fields)
            .field("pre_insert", &names(&self.pre_insert))
            .field("pre_update", &names(&self.pre_update))
            .finish()
    }
}

#[must_use]
pub struct EntitySchemaBuilder {
    table: String,
    primary_key: String,
    scoping: TenantScoping,
    fields: BTreeSet<String>,
    soft_delete: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    json_fields: Vec<String>,
    pre_insert: Vec<Arc<dyn RecordHook>>,
    pre_update: Vec<Arc<dyn RecordHook>>,
}

impl EntitySchemaBuilder {
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn tenant_field(mut self, field: impl Into<String>) -> Self {
        self.scoping = TenantScoping::Field(field.into());
        self
    }

    /// Declare the table global. Rows carry no tenant and are visible to every context.
    pub fn no_tenant_scope(mut self) -> Self {
        self.scoping = TenantScoping::Global;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn soft_delete(mut self, field: impl Into<String>) -> Self {
        self.soft_delete = Some(field.into());
        self
    }

    pub fn timestamps(mut self, created_at: impl Into<String>, updated_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self.updated_at = Some(updated_at.into());
        self
    }

    /// Creation timestamp only, for append-only tables.
    pub fn created_at(mut self, field: impl Into<String>) -> Self {
        self.created_at = Some(field.into());
        self
    }

    /// Store `field` as JSON text. Encoding runs as a hook at this position in
    /// both hook chains; reads decode it back.
    pub fn json_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        let hook: Arc<dyn RecordHook> = Arc::new(JsonEncode::new(field.clone()));
        self.pre_insert.push(Arc::clone(&hook));
        self.pre_update.push(hook);
        self.json_fields.push(field);
        self
    }

    pub fn pre_insert(mut self, hook: impl RecordHook + 'static) -> Self {
        self.pre_insert.push(Arc::new(hook));
        self
    }

    pub fn pre_update(mut self, hook: impl RecordHook + 'static) -> Self {
        self.pre_update.push(Arc::new(hook));
        self
    }

    /// Register one hook in both chains.
    pub fn hook(mut self, hook: impl RecordHook + 'static) -> Self {
        let hook: Arc<dyn RecordHook> = Arc::new(hook);
        self.pre_insert.push(Arc::clone(&hook));
        self.pre_update.push(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<EntitySchema> {
        Arc::new(EntitySchema {
            table: self.table,
            primary_key: self.primary_key,
            scoping: self.scoping,
            fields: self.fields,
            soft_delete: self.soft_delete,
            created_at: self.created_at,
            updated_at: self.updated_at,
            json_fields: self.json_fields,
            pre_insert: self.pre_insert,
            pre_update: self.pre_update,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::secure::hooks::Defaults;

    fn dishes() -> Arc<EntitySchema> {
        EntitySchema::builder("dishes")
            .fields(["name", "price", "tags"])
            .soft_delete("deleted_at")
            .timestamps("created_at", "updated_at")
            .pre_insert(Defaults::new([("price", 0)]))
            .json_field("tags")
            .build()
    }

    #[test]
    fn tenant_field_defaults_to_restaurant_id() {
        let s = dishes();
        assert_eq!(s.tenant_field(), Some(DEFAULT_TENANT_FIELD));
        assert_eq!(s.primary_key(), "id");
        assert!(s.is_tenant_scoped());
    }

    #[test]
    fn global_tables_are_explicit() {
        let s = EntitySchema::builder("restaurants")
            .no_tenant_scope()
            .fields(["name"])
            .build();
        assert_eq!(s.tenant_field(), None);
        assert!(!s.is_tenant_scoped());
    }

    #[test]
    fn allow_lists() {
        let s = dishes();
        assert!(s.is_insertable("restaurant_id"));
        assert!(!s.is_updatable("restaurant_id"));
        assert!(!s.is_updatable("id"));
        assert!(!s.is_insertable("deleted_at"));
        assert!(!s.is_updatable("deleted_at"));
        assert!(s.is_known("deleted_at"));
        assert!(!s.is_known("secret"));
    }

    #[test]
    fn json_hook_keeps_declared_position() {
        let s = dishes();
        let names: Vec<&str> = s.pre_insert_hooks().iter().map(|h| h.name()).collect();
        assert_eq!(names, ["defaults", "json_encode:tags"]);
        let names: Vec<&str> = s.pre_update_hooks().iter().map(|h| h.name()).collect();
        assert_eq!(names, ["json_encode:tags"]);
    }
}
