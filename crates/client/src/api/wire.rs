//! Wire shapes for the storefront REST API.
//!
//! Every response is wrapped in a success envelope `{success, data, message}`.
//! Shapes here mirror the JSON exactly; conversion into the flat domain types
//! happens in `conversions`.

use serde::{Deserialize, Serialize};
use shopfront_core::{AddressId, Amount, CartId, CartItemId, GuestToken, OrderId, ProductId};

/// The `{success, data}` wrapper used by all responses.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned with non-success HTTP statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartData {
    pub id: CartId,
    #[serde(default)]
    pub guest_token: Option<GuestToken>,
    #[serde(default)]
    pub items: Vec<CartItemData>,
}

#[derive(Debug, Deserialize)]
pub struct CartItemData {
    pub id: CartItemId,
    pub quantity: i64,
    pub product: ProductData,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub id: ProductId,
    pub title: String,
    pub price: Amount,
    #[serde(default)]
    pub images: Vec<ImageData>,
    #[serde(default)]
    pub category: Option<CategoryData>,
}

/// Images arrive either as bare URLs or as `{url}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImageData {
    Url(String),
    Object { url: String },
}

#[derive(Debug, Deserialize)]
pub struct CategoryData {
    pub name: String,
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressData {
    pub id: AddressId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "fullName", alias = "receiverName")]
    pub recipient_name: String,
    #[serde(default, alias = "address")]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default, alias = "state")]
    pub province: String,
    #[serde(default, alias = "zipCode")]
    pub postal_code: String,
    #[serde(default, alias = "phoneNumber")]
    pub phone: String,
    #[serde(default, alias = "default")]
    pub is_default: bool,
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub id: OrderId,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UpdateQuantityBody {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemBody<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody<'a> {
    pub cart_id: &'a CartId,
}
