//! User-facing error reporting with Sentry integration.
//!
//! Transport failures, non-success statuses and unsuccessful envelopes are
//! not distinguished for the user: each [`Operation`] has exactly one message.
//! The detailed error goes to the log, and server-side failures are captured
//! to Sentry before the message is handed back.

use crate::api::ApiError;

/// A user-initiated operation that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchCart,
    UpdateQuantity,
    RemoveItem,
    AddItem,
    LoadAddresses,
    PlaceOrder,
    FetchProducts,
}

impl Operation {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FetchCart => "fetch_cart",
            Self::UpdateQuantity => "update_quantity",
            Self::RemoveItem => "remove_item",
            Self::AddItem => "add_item",
            Self::LoadAddresses => "load_addresses",
            Self::PlaceOrder => "place_order",
            Self::FetchProducts => "fetch_products",
        }
    }

    /// The message shown to the user when this operation fails.
    #[must_use]
    pub const fn failure_message(&self) -> &'static str {
        match self {
            Self::FetchCart => "Could not load your cart.",
            Self::UpdateQuantity => "Could not update the item quantity.",
            Self::RemoveItem => "Could not remove the item from your cart.",
            Self::AddItem => "Could not add the item to your cart.",
            Self::LoadAddresses => "Could not load your saved addresses.",
            Self::PlaceOrder => "Could not place your order. Please try again.",
            Self::FetchProducts => "Could not load products. Showing featured items instead.",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log an operation failure and return the message to show the user.
///
/// Server-side failures (transport, 5xx, unparseable responses) are captured
/// to Sentry. Cancellations are logged at debug level only.
pub fn report(operation: Operation, err: &ApiError) -> String {
    if err.is_cancelled() {
        tracing::debug!(operation = %operation, "Operation cancelled");
        return operation.failure_message().to_string();
    }

    if is_server_side(err) {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            operation = %operation,
            error = %err,
            sentry_event_id = %event_id,
            "Storefront operation failed"
        );
    } else {
        tracing::warn!(
            operation = %operation,
            error = %err,
            "Storefront operation rejected"
        );
    }

    operation.failure_message().to_string()
}

const fn is_server_side(err: &ApiError) -> bool {
    match err {
        ApiError::Http(_) | ApiError::Parse(_) | ApiError::InvalidBaseUrl(_) => true,
        ApiError::Status { status, .. } => *status >= 500,
        ApiError::Unsuccessful(_) | ApiError::Unauthenticated | ApiError::Cancelled => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_collapses_error_kinds() {
        let status = ApiError::Status {
            status: 503,
            message: "down".to_string(),
        };
        let unsuccessful = ApiError::Unsuccessful("cart locked".to_string());

        assert_eq!(
            report(Operation::UpdateQuantity, &status),
            report(Operation::UpdateQuantity, &unsuccessful)
        );
    }

    #[test]
    fn test_messages_differ_per_operation() {
        assert_ne!(
            Operation::FetchCart.failure_message(),
            Operation::PlaceOrder.failure_message()
        );
    }

    #[test]
    fn test_cart_message_does_not_promise_fallback_items() {
        // The cart fallback may be empty, so the message must hold either way
        assert!(!Operation::FetchCart.failure_message().contains("instead"));
    }

    #[test]
    fn test_server_side_classification() {
        assert!(is_server_side(&ApiError::Status {
            status: 500,
            message: String::new()
        }));
        assert!(!is_server_side(&ApiError::Status {
            status: 400,
            message: String::new()
        }));
        assert!(!is_server_side(&ApiError::Cancelled));
    }
}
