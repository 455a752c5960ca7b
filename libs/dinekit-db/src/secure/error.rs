use crate::secure::RecordId;

/// Errors raised by the tenant isolation layer.
///
/// Messages never name the tenant that actually owns a row.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// Tenant-scoped operation attempted without an active tenant.
    #[error("tenant context required for '{table}'")]
    TenantRequired { table: String },

    /// Row exists but belongs to another tenant.
    #[error("cross-tenant access denied: '{table}' id {id}")]
    CrossTenantAccess { table: String, id: RecordId },

    /// Field not in the schema's allow-list, or not changeable.
    #[error("field '{field}' is not allowed on '{table}'")]
    InvalidField { table: String, field: String },

    #[error("'{table}' id {id} not found")]
    NotFound { table: String, id: RecordId },

    /// Escape hatch refused.
    #[error("privilege required: {0}")]
    PrivilegeRequired(&'static str),

    /// Value cannot be stored in or read from the field.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("hook '{hook}' rejected record: {message}")]
    Hook { hook: String, message: String },

    /// Statement construction failed.
    #[error("query construction failed: {0}")]
    Query(#[from] sea_orm::sea_query::error::Error),

    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

/// Coarse response class for controllers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Forbidden,
    BadRequest,
    NotFound,
    Internal,
}

impl ScopeError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::TenantRequired { .. }
            | Self::CrossTenantAccess { .. }
            | Self::PrivilegeRequired(_) => ErrorClass::Forbidden,
            Self::InvalidField { .. } | Self::InvalidValue { .. } | Self::Hook { .. } => {
                ErrorClass::BadRequest
            }
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Query(_) | Self::Db(_) => ErrorClass::Internal,
        }
    }

    pub(crate) fn invalid_field(table: &str, field: &str) -> Self {
        Self::InvalidField {
            table: table.to_owned(),
            field: field.to_owned(),
        }
    }

    pub(crate) fn tenant_required(table: &str) -> Self {
        Self::TenantRequired {
            table: table.to_owned(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(
            ScopeError::tenant_required("dishes").class(),
            ErrorClass::Forbidden
        );
        assert_eq!(
            ScopeError::CrossTenantAccess {
                table: "dishes".into(),
                id: 7
            }
            .class(),
            ErrorClass::Forbidden
        );
        assert_eq!(
            ScopeError::invalid_field("dishes", "secret").class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            ScopeError::NotFound {
                table: "dishes".into(),
                id: 1
            }
            .class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            ScopeError::Db(sea_orm::DbErr::Custom("boom".into())).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn cross_tenant_message_names_only_table_and_id() {
        let msg = ScopeError::CrossTenantAccess {
            table: "dishes".into(),
            id: 7,
        }
        .to_string();
        assert_eq!(msg, "cross-tenant access denied: 'dishes' id 7");
    }
}
