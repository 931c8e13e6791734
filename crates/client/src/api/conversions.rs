//! Wire-to-domain type conversions.

use tracing::warn;

use crate::types::{Address, Cart, CartItem, PlacedOrder, Product};

use super::wire::{AddressData, CartData, CartItemData, ImageData, OrderData, ProductData};

/// Label used when a product has no category.
const UNCATEGORIZED: &str = "Uncategorized";

impl From<CartData> for Cart {
    fn from(cart: CartData) -> Self {
        Self {
            id: cart.id,
            guest_token: cart.guest_token,
            items: cart.items.into_iter().filter_map(convert_cart_item).collect(),
        }
    }
}

/// Flatten a server cart item. Lines with a non-positive quantity, or whose
/// line total cannot be represented, are dropped.
fn convert_cart_item(item: CartItemData) -> Option<CartItem> {
    let quantity = match u32::try_from(item.quantity) {
        Ok(0) | Err(_) => {
            warn!(item_id = %item.id, quantity = item.quantity, "Dropping cart line with invalid quantity");
            return None;
        }
        Ok(q) => q,
    };

    let ProductData {
        id,
        title,
        price,
        images,
        category,
    } = item.product;

    if price.checked_times(quantity).is_none() {
        warn!(item_id = %item.id, price = %price, quantity, "Dropping cart line with overflowing total");
        return None;
    }

    Some(CartItem {
        id: item.id,
        product_id: id,
        name: title,
        price,
        quantity,
        category: category_label(category.map(|c| c.name)),
        image: images.into_iter().next().map(image_url),
    })
}

impl From<ProductData> for Product {
    fn from(product: ProductData) -> Self {
        Self {
            id: product.id,
            title: product.title,
            price: product.price,
            images: product.images.into_iter().map(image_url).collect(),
            category: category_label(product.category.map(|c| c.name)),
        }
    }
}

impl From<AddressData> for Address {
    fn from(a: AddressData) -> Self {
        Self {
            id: a.id,
            title: a.title,
            recipient_name: a.recipient_name,
            street: a.street,
            city: a.city,
            province: a.province,
            postal_code: a.postal_code,
            phone: a.phone,
            is_default: a.is_default,
        }
    }
}

impl From<OrderData> for PlacedOrder {
    fn from(order: OrderData) -> Self {
        Self { id: order.id }
    }
}

fn image_url(image: ImageData) -> String {
    match image {
        ImageData::Url(url) | ImageData::Object { url } => url,
    }
}

fn category_label(name: Option<String>) -> String {
    name.filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}
