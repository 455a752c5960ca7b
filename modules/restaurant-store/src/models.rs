//! Typed views of restaurant rows.
//!
//! Reads deserialize from the generic [`Record`]; writes serialize into one. Fields
//! left `None` on the `New*` types are omitted so schema defaults apply.
use dinekit_db::{Record, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub restaurant_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub position: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: RecordId,
    pub restaurant_id: i64,
    pub category_id: Option<RecordId>,
    pub name: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub price: i64,
    pub available: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewDish {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordId>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Closed => "closed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dish_id: Option<RecordId>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: RecordId,
    pub restaurant_id: i64,
    pub table_id: Option<RecordId>,
    pub customer_id: Option<RecordId>,
    pub employee_id: Option<RecordId>,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub items: Vec<OrderItem>,
    /// Derived from `items`; minor currency units.
    pub total: i64,
    pub notes: Option<String>,
    pub closed_at: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<RecordId>,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub restaurant_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: RecordId,
    pub restaurant_id: i64,
    pub actor: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<RecordId>,
    #[serde(default)]
    pub details: Value,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAuditEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub action: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<RecordId>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

/// Null and missing both read as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

pub(crate) fn to_record<T: Serialize>(entity: &'static str, value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Mapping {
            entity,
            source: serde::ser::Error::custom(format!("expected an object, got {other}")),
        }),
        Err(source) => Err(StoreError::Mapping { entity, source }),
    }
}

pub(crate) fn from_record<T: DeserializeOwned>(
    entity: &'static str,
    record: Record,
) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record)).map_err(|source| StoreError::Mapping { entity, source })
}
