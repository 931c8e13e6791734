//! Fixed data shown when the backend cannot be reached.
//!
//! Both sets are fully populated (every field set, every product with an
//! image) so a page rendered from them never looks broken. None of the IDs
//! exist on the server; the fallback cart deliberately carries no cart ID so
//! it can never be submitted as an order.

use shopfront_core::{Amount, CartItemId, ProductId};

use crate::types::{CartItem, Product};

/// Lines of the mock cart.
#[must_use]
pub fn mock_cart_items() -> Vec<CartItem> {
    vec![
        CartItem {
            id: CartItemId::new("mock-item-1"),
            product_id: ProductId::new("mock-product-1"),
            name: "Wireless Headphones".to_string(),
            price: Amount::new(250_000),
            quantity: 2,
            category: "Electronics".to_string(),
            image: Some("/images/products/headphones.jpg".to_string()),
        },
        CartItem {
            id: CartItemId::new("mock-item-2"),
            product_id: ProductId::new("mock-product-2"),
            name: "Leather Wallet".to_string(),
            price: Amount::new(150_000),
            quantity: 1,
            category: "Accessories".to_string(),
            image: Some("/images/products/wallet.jpg".to_string()),
        },
    ]
}

/// Catalog shown when the product list cannot be fetched.
#[must_use]
pub fn fallback_products() -> Vec<Product> {
    [
        ("fallback-1", "Wireless Headphones", 250_000, "Electronics", "headphones"),
        ("fallback-2", "Leather Wallet", 150_000, "Accessories", "wallet"),
        ("fallback-3", "Smart Watch", 1_200_000, "Electronics", "smart-watch"),
        ("fallback-4", "Cotton T-Shirt", 90_000, "Clothing", "t-shirt"),
        ("fallback-5", "Running Shoes", 850_000, "Footwear", "running-shoes"),
        ("fallback-6", "Ceramic Coffee Mug", 60_000, "Home", "coffee-mug"),
    ]
    .into_iter()
    .map(|(id, title, price, category, slug)| Product {
        id: ProductId::new(id),
        title: title.to_string(),
        price: Amount::new(price),
        images: vec![format!("/images/products/{slug}.jpg")],
        category: category.to_string(),
    })
    .collect()
}
