use serde::Deserialize;
use serde_json::{Number, Value};
use std::fmt;
use thiserror::Error;

use crate::errors::ValidationError;

pub const DEFAULT_STORE_NAME: &str = "TOKO DEMO";

/// A price, quantity or total as the client sent it.
///
/// Strings pass through verbatim so callers can send pre-formatted currency.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(Number),
    Text(String),
}

impl Amount {
    /// Lift any non-null JSON scalar into an amount. Non-scalar values keep
    /// their compact JSON text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => Some(Amount::Number(n.clone())),
            Value::String(s) => Some(Amount::Text(s.clone())),
            other => Some(Amount::Text(stringify(other))),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Number(n) => f.write_str(&format_number(n)),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Number(value.into())
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Amount::Number(value.into())
    }
}

impl From<&str> for Amount {
    fn from(value: &str) -> Self {
        Amount::Text(value.to_string())
    }
}

// Integral floats print without a trailing ".0".
fn format_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// One printable row of the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: Amount,
    pub unit_price: Amount,
}

impl LineItem {
    pub fn new(name: &str, quantity: impl Into<Amount>, unit_price: impl Into<Amount>) -> Self {
        Self {
            name: name.to_string(),
            quantity: quantity.into(),
            unit_price: unit_price.into(),
        }
    }
}

/// Why a row of `items` was left off the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemSkip {
    #[error("item is not an object")]
    NotAnObject,

    #[error("item has no name")]
    MissingName,

    #[error("item has no qty")]
    MissingQuantity,

    #[error("item has no price")]
    MissingPrice,
}

/// A raw element of the `items` array.
///
/// Rows stay untyped until rendering so one bad row cannot reject the
/// whole request.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemEntry(Value);

impl ItemEntry {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }

    pub fn line_item(&self) -> Result<LineItem, ItemSkip> {
        let fields = self.0.as_object().ok_or(ItemSkip::NotAnObject)?;

        let name = fields
            .get("name")
            .filter(|v| is_truthy(v))
            .map(stringify)
            .ok_or(ItemSkip::MissingName)?;
        let quantity = fields
            .get("qty")
            .and_then(Amount::from_value)
            .ok_or(ItemSkip::MissingQuantity)?;
        let unit_price = fields
            .get("price")
            .and_then(Amount::from_value)
            .ok_or(ItemSkip::MissingPrice)?;

        Ok(LineItem {
            name,
            quantity,
            unit_price,
        })
    }
}

impl From<LineItem> for ItemEntry {
    fn from(item: LineItem) -> Self {
        let amount = |a: Amount| match a {
            Amount::Number(n) => Value::Number(n),
            Amount::Text(s) => Value::String(s),
        };
        Self(serde_json::json!({
            "name": item.name,
            "qty": amount(item.quantity),
            "price": amount(item.unit_price),
        }))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Everything needed to lay out one receipt. Built per request and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptRequest {
    pub items: Vec<ItemEntry>,
    pub total: Amount,
    pub store_name: String,
    pub transaction_id: Option<String>,
    pub cashier: Option<String>,
}

impl ReceiptRequest {
    pub fn new(items: Vec<ItemEntry>, total: impl Into<Amount>) -> Self {
        Self {
            items,
            total: total.into(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            transaction_id: None,
            cashier: None,
        }
    }

    pub fn with_store_name(mut self, store_name: &str) -> Self {
        self.store_name = store_name.to_string();
        self
    }

    pub fn with_transaction_id(mut self, transaction_id: &str) -> Self {
        self.transaction_id = Some(transaction_id.to_string());
        self
    }

    pub fn with_cashier(mut self, cashier: &str) -> Self {
        self.cashier = Some(cashier.to_string());
        self
    }
}

/// Body of `POST /print` before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintPayload {
    pub items: Option<Value>,
    pub total: Option<Value>,
    pub store_name: Option<Value>,
    pub transaction_id: Option<Value>,
    pub cashier: Option<Value>,
}

impl PrintPayload {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    pub fn validate(self) -> Result<ReceiptRequest, ValidationError> {
        let items = match self.items {
            Some(Value::Array(items)) if !items.is_empty() => {
                items.into_iter().map(ItemEntry::new).collect()
            }
            _ => return Err(ValidationError::MissingItems),
        };

        let total = self
            .total
            .as_ref()
            .and_then(Amount::from_value)
            .ok_or(ValidationError::MissingTotal)?;

        Ok(ReceiptRequest {
            items,
            total,
            store_name: self
                .store_name
                .filter(|v| !v.is_null())
                .map(|v| stringify(&v))
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
            transaction_id: metadata_text(self.transaction_id),
            cashier: metadata_text(self.cashier),
        })
    }
}

// Optional metadata prints whatever scalar the client sent; falsy values are
// left off the receipt.
fn metadata_text(value: Option<Value>) -> Option<String> {
    value.filter(is_truthy).map(|v| stringify(&v))
}
