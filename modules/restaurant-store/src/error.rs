//! Errors of the restaurant store.
use dinekit_db::{ErrorClass, ScopeError};
use dinekit_security::TenantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Tenant isolation or storage failure from the data-access layer.
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A row could not be mapped to or from its typed model.
    #[error("cannot map {entity} row: {source}")]
    Mapping {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("source and target restaurant are both {0}")]
    SameTenant(TenantId),
}

impl StoreError {
    /// Coarse category for transport mapping.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Scope(e) => e.class(),
            StoreError::NotFound { .. } => ErrorClass::NotFound,
            StoreError::Validation { .. } | StoreError::SameTenant(_) => ErrorClass::BadRequest,
            StoreError::Mapping { .. } => ErrorClass::Internal,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn scope_errors_keep_their_class() {
        let err = StoreError::from(ScopeError::CrossTenantAccess {
            table: "orders".to_owned(),
            id: 3,
        });
        assert_eq!(err.class(), ErrorClass::Forbidden);
        assert_eq!(err.to_string(), "cross-tenant access denied: 'orders' id 3");
    }

    #[test]
    fn domain_errors_map_to_client_classes() {
        assert_eq!(
            StoreError::NotFound { entity: "order", id: 1 }.class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            StoreError::validation("status", "order is closed").class(),
            ErrorClass::BadRequest
        );
    }
}
