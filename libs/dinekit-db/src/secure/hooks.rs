//! Record hooks run by repositories before a statement is built.
//!
//! Hooks are registered on [`EntitySchema`](crate::secure::EntitySchema) and run in
//! the order they were declared. A hook may add or rewrite fields; its output is
//! validated against the schema allow-list afterwards, so it cannot smuggle in a
//! disallowed column or change the tenant.
use dinekit_security::TenantId;
use serde_json::Value;

use crate::secure::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookPhase {
    Insert,
    Update,
}

/// What a hook can see besides the record it rewrites.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub phase: HookPhase,
    /// Tenant the row belongs to, when known.
    pub tenant: Option<TenantId>,
    /// Current stored row. `Some` only for updates.
    pub current: Option<&'a Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait RecordHook: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// Returns [`HookError`] to reject the record; the operation is aborted.
    fn apply(&self, record: &mut Record, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// Fills fields the caller left out.
pub struct Defaults {
    values: Record,
}

impl Defaults {
    #[must_use]
    pub fn new<K, V, I>(values: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl RecordHook for Defaults {
    fn name(&self) -> &str {
        "defaults"
    }

    fn apply(&self, record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        for (field, value) in &self.values {
            if !record.contains_key(field) {
                record.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Serializes a structured field into its JSON text form.
///
/// Strings are assumed to already be encoded and are left alone.
pub struct JsonEncode {
    field: String,
    name: String,
}

impl JsonEncode {
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        let field = field.into();
        let name = format!("json_encode:{field}");
        Self { field, name }
    }
}

impl RecordHook for JsonEncode {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: &mut Record, _ctx: &HookContext<'_>) -> Result<(), HookError> {
        let Some(value) = record.get_mut(&self.field) else {
            return Ok(());
        };
        if value.is_array() || value.is_object() {
            let text = serde_json::to_string(value)
                .map_err(|e| HookError::new(format!("cannot encode '{}': {e}", self.field)))?;
            *value = Value::String(text);
        }
        Ok(())
    }
}

/// Closure-backed hook, used for derived fields.
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(&mut Record, &HookContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> RecordHook for FnHook<F>
where
    F: Fn(&mut Record, &HookContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: &mut Record, ctx: &HookContext<'_>) -> Result<(), HookError> {
        (self.f)(record, ctx)
    }
}
