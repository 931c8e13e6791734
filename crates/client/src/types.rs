//! Domain types for the storefront client.
//!
//! These types provide a flat, ergonomic view separate from the nested wire
//! shapes the REST API returns (see `api::wire`).

use serde::{Deserialize, Serialize};
use shopfront_core::{
    AddressId, Amount, CartId, CartItemId, GuestToken, OrderId, PricedLine, ProductId,
};

// =============================================================================
// Cart Types
// =============================================================================

/// A line in the cart, flattened from the server's item/product shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Cart line ID (used for update/remove).
    pub id: CartItemId,
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product title.
    pub name: String,
    /// Unit price.
    pub price: Amount,
    /// Quantity. Zero is never stored; it removes the line instead.
    pub quantity: u32,
    /// Category label.
    pub category: String,
    /// First product image, if any.
    pub image: Option<String>,
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Amount {
        self.price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Guest token the server associated with this cart, if any.
    pub guest_token: Option<GuestToken>,
    /// Lines in server order.
    pub items: Vec<CartItem>,
}

// =============================================================================
// Address Types
// =============================================================================

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Display title (e.g., "Home").
    pub title: String,
    pub recipient_name: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub phone: String,
    /// Whether this is the customer's default address.
    pub is_default: bool,
}

// =============================================================================
// Product Types
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Amount,
    /// Image URLs, first is the primary image.
    pub images: Vec<String>,
    /// Category label.
    pub category: String,
}

// =============================================================================
// Order Types
// =============================================================================

/// Result of a successful order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: OrderId,
}
