//! JSON values to bound statement values and back.
use sea_orm::{FromQueryResult, QueryResult, Value as DbValue};
use serde_json::Value;

use crate::secure::{EntitySchema, Record, ScopeError};

pub(crate) fn to_db_value(field: &str, value: &Value) -> Result<DbValue, ScopeError> {
    let out = match value {
        Value::Null => Option::<String>::None.into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                return Err(invalid(field, "number out of range"));
            }
        }
        Value::String(s) => s.clone().into(),
        Value::Array(_) | Value::Object(_) => {
            return Err(invalid(field, "structured value on a non-JSON field"));
        }
    };
    Ok(out)
}

/// Decode one result row, parsing the schema's JSON fields.
pub(crate) fn row_to_record(schema: &EntitySchema, row: &QueryResult) -> Result<Record, ScopeError> {
    let value = Value::from_query_result(row, "")?;
    let Value::Object(mut record) = value else {
        return Err(invalid(schema.table(), "row did not decode into an object"));
    };
    for field in schema.json_fields() {
        let Some(Value::String(text)) = record.get(field) else {
            continue;
        };
        let parsed: Value = serde_json::from_str(text)
            .map_err(|e| invalid(field, &format!("stored JSON is malformed: {e}")))?;
        record.insert(field.clone(), parsed);
    }
    Ok(record)
}

pub(crate) fn as_tenant_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn invalid(field: &str, reason: &str) -> ScopeError {
    ScopeError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_convert() {
        assert_eq!(to_db_value("a", &json!(3)).unwrap(), DbValue::BigInt(Some(3)));
        assert_eq!(to_db_value("a", &json!(true)).unwrap(), DbValue::Bool(Some(true)));
        assert_eq!(
            to_db_value("a", &json!("x")).unwrap(),
            DbValue::String(Some(Box::new("x".to_owned())))
        );
        assert_eq!(to_db_value("a", &Value::Null).unwrap(), DbValue::String(None));
    }

    #[test]
    fn structures_are_rejected() {
        let err = to_db_value("tags", &json!(["a"])).unwrap_err();
        assert!(matches!(err, ScopeError::InvalidValue { ref field, .. } if field == "tags"));
    }

    #[test]
    fn tenant_ids_read_from_numbers_or_text() {
        assert_eq!(as_tenant_id(Some(&json!(4))), Some(4));
        assert_eq!(as_tenant_id(Some(&json!("4"))), Some(4));
        assert_eq!(as_tenant_id(Some(&Value::Null)), None);
        assert_eq!(as_tenant_id(None), None);
    }
}
