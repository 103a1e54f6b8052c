use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use stocklink_catalog::{CategoryId, ProductId};
use stocklink_core::{AggregateId, DomainError};
use stocklink_transfers::{Branch, Cart, CartLine, ItemId, OrderStatus, OrderView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub qty: i64,
}

fn one() -> i64 {
    1
}

/// `{"quantities": {"<item_id>": <qty>, ...}}`
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    #[serde(default)]
    pub quantities: BTreeMap<u32, i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetSentQuantitiesRequest {
    #[serde(default)]
    pub quantities: BTreeMap<u32, i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    pub unit: Option<String>,
    pub category_id: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    /// Absent leaves the category; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<String>>,
    pub image: Option<String>,
    pub active: Option<bool>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn keyed_quantities(raw: BTreeMap<u32, i64>) -> BTreeMap<ItemId, i64> {
    raw.into_iter().map(|(k, v)| (ItemId(k), v)).collect()
}

pub fn parse_product_id(raw: &str) -> Result<ProductId, DomainError> {
    parse_aggregate_id(raw, "invalid product id").map(ProductId::new)
}

pub fn parse_category_id(raw: &str) -> Result<CategoryId, DomainError> {
    parse_aggregate_id(raw, "invalid category id").map(CategoryId::new)
}

fn parse_aggregate_id(raw: &str, message: &str) -> Result<AggregateId, DomainError> {
    raw.trim().parse().map_err(|_| DomainError::invalid_id(message))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub from_branch: Branch,
    pub to_branch: Branch,
    pub lines: Vec<CartLine>,
    pub count: usize,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        Self {
            status: cart.status(),
            status_display: cart.status().label(),
            from_branch: cart.from_branch(),
            to_branch: cart.to_branch(),
            lines: cart.lines().to_vec(),
            count: cart.line_count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Supplier poll: pending count and the newest pending order id (0 when none).
/// Clients compare `newest_id` with the last value they saw.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub count: usize,
    pub newest_id: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: OrderStatus,
    pub status_display: String,
}

impl From<&OrderView> for StatusResponse {
    fn from(order: &OrderView) -> Self {
        Self {
            status: order.status,
            status_display: order.status_display.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_product_distinguishes_absent_from_null_category() {
        let absent: UpdateProductRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.category_id, None);

        let cleared: UpdateProductRequest = serde_json::from_str(r#"{"category_id":null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));
    }

    #[test]
    fn cart_quantities_are_keyed_by_item_id() {
        let req: UpdateCartRequest = serde_json::from_str(r#"{"quantities":{"1":3,"2":0}}"#).unwrap();
        let q = keyed_quantities(req.quantities);
        assert_eq!(q.get(&ItemId(1)), Some(&3));
        assert_eq!(q.get(&ItemId(2)), Some(&0));
    }

    #[test]
    fn poll_body_uses_newest_id() {
        let body = serde_json::to_value(PollResponse { count: 2, newest_id: 7 }).unwrap();
        assert_eq!(body, serde_json::json!({ "count": 2, "newest_id": 7 }));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(matches!(parse_product_id("nope"), Err(DomainError::InvalidId(_))));
    }
}
