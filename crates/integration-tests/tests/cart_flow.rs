//! Integration tests for the cart client against the stub backend.
//!
//! Run with: cargo test -p shopfront-integration-tests --test cart_flow

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::Method;
use secrecy::SecretString;
use serde_json::json;
use shopfront_client::error::Operation;
use shopfront_client::fallback::mock_cart_items;
use shopfront_client::{
    CartClient, CartLoad, CartSource, FallbackPolicy, FileSessionStore, MemorySessionStore,
    MutationOutcome, MutationPolicy, SessionStore, StoredSession,
};
use shopfront_core::{Amount, CartId, CartItemId, GuestToken, ProductId};
use shopfront_integration_tests::{EnvelopeFault, Scenario, StubBackend};
use tokio_util::sync::CancellationToken;

fn guest_store(token: Option<&str>) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::new(StoredSession {
        token: None,
        guest_token: token.map(GuestToken::new),
    }))
}

fn cart_client(
    stub: &StubBackend,
    store: &Arc<MemorySessionStore>,
    policy: MutationPolicy,
) -> CartClient {
    CartClient::new(stub.api(), store.clone(), policy, FallbackPolicy::MockCart)
}

fn quantity_of(cart: &CartClient, id: &str) -> Option<u32> {
    cart.items()
        .iter()
        .find(|i| i.id.as_str() == id)
        .map(|i| i.quantity)
}

// ============================================================================
// Loading & Identity
// ============================================================================

#[tokio::test]
async fn test_guest_load_persists_issued_token() {
    let stub = StubBackend::start(Scenario::two_line_cart().with_guest_token("guest-abc")).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let ctx = store.context().unwrap();
    assert_eq!(cart.load(&ctx, &CancellationToken::new()).await, CartLoad::Live);

    assert_eq!(cart.source(), CartSource::Live);
    assert_eq!(cart.cart_id(), Some(&CartId::new("55")));
    assert_eq!(cart.items().len(), 2);
    assert_eq!(store.load().unwrap().guest_token, Some(GuestToken::new("guest-abc")));

    let requests = stub.requests_to(&Method::GET, "/cart");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].query.is_none());
    assert!(requests[0].authorization.is_none());
}

#[tokio::test]
async fn test_stored_guest_token_sent_as_query_and_kept() {
    let stub = StubBackend::start(Scenario::two_line_cart().with_guest_token("guest-new")).await;
    let store = guest_store(Some("guest-old"));
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let ctx = store.context().unwrap();
    cart.load(&ctx, &CancellationToken::new()).await;

    let request = &stub.requests_to(&Method::GET, "/cart")[0];
    assert_eq!(request.query_param("guestToken").as_deref(), Some("guest-old"));
    // At most one guest token per client: the stored one is never replaced
    assert_eq!(store.load().unwrap().guest_token, Some(GuestToken::new("guest-old")));
}

#[tokio::test]
async fn test_bearer_token_takes_precedence() {
    let stub = StubBackend::start(Scenario::two_line_cart().with_guest_token("guest-new")).await;
    let store = Arc::new(MemorySessionStore::new(StoredSession {
        token: Some("session-token".to_string()),
        guest_token: Some(GuestToken::new("guest-old")),
    }));
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let ctx = store.context().unwrap();
    cart.load(&ctx, &CancellationToken::new()).await;

    let request = &stub.requests_to(&Method::GET, "/cart")[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer session-token"));
    assert!(request.query.is_none());
    assert!(request.request_id.is_some());
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_env_bearer_override_wins_over_stored_token() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(Some("guest-old"));
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let ctx = store
        .context()
        .unwrap()
        .with_bearer_override(Some(SecretString::from("from-env")));
    cart.load(&ctx, &CancellationToken::new()).await;

    let request = &stub.requests_to(&Method::GET, "/cart")[0];
    assert_eq!(request.authorization.as_deref(), Some("Bearer from-env"));
}

#[tokio::test]
async fn test_file_store_keeps_guest_token_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let stub = StubBackend::start(Scenario::two_line_cart().with_guest_token("guest-abc")).await;

    {
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&path));
        let mut cart = CartClient::new(
            stub.api(),
            Arc::clone(&store),
            MutationPolicy::Optimistic,
            FallbackPolicy::MockCart,
        );
        let ctx = store.context().unwrap();
        cart.load(&ctx, &CancellationToken::new()).await;
    }

    let reopened = FileSessionStore::new(&path);
    let ctx = reopened.context().unwrap();
    assert_eq!(ctx.guest_token(), Some(&GuestToken::new("guest-abc")));
    assert!(!ctx.is_authenticated());
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn test_fetch_failure_shows_mock_cart() {
    let mut scenario = Scenario::two_line_cart();
    scenario.fail_cart = true;
    let stub = StubBackend::start(scenario).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let load = cart
        .load(&store.context().unwrap(), &CancellationToken::new())
        .await;

    assert_eq!(
        load,
        CartLoad::Fallback {
            error: Operation::FetchCart.failure_message().to_string()
        }
    );
    assert_eq!(cart.items(), mock_cart_items().as_slice());
    assert!(cart.cart_id().is_none());
    assert_eq!(cart.totals().total, Amount::new(758_500));
}

#[tokio::test]
async fn test_fetch_failure_with_empty_policy() {
    let mut scenario = Scenario::two_line_cart();
    scenario.fail_cart = true;
    let stub = StubBackend::start(scenario).await;
    let store = guest_store(None);
    let mut cart = CartClient::new(
        stub.api(),
        store.clone(),
        MutationPolicy::Optimistic,
        FallbackPolicy::Empty,
    );

    cart.load(&store.context().unwrap(), &CancellationToken::new())
        .await;

    assert_eq!(cart.source(), CartSource::Fallback);
    assert!(cart.items().is_empty());
    assert!(cart.totals().total.is_zero());
}

#[tokio::test]
async fn test_malformed_success_response_falls_back() {
    for fault in EnvelopeFault::ALL {
        let stub =
            StubBackend::start(Scenario::two_line_cart().with_envelope_fault(fault)).await;
        let store = guest_store(None);
        let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

        let load = cart
            .load(&store.context().unwrap(), &CancellationToken::new())
            .await;

        assert_eq!(
            load,
            CartLoad::Fallback {
                error: Operation::FetchCart.failure_message().to_string()
            },
            "{fault:?}"
        );
        assert_eq!(cart.items(), mock_cart_items().as_slice(), "{fault:?}");
        assert!(cart.cart_id().is_none(), "{fault:?}");
    }
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_update_quantity_confirmed() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    let outcome = cart
        .update_quantity(&ctx, &CartItemId::new("line-1"), 5, &cancel)
        .await;

    assert_eq!(outcome, MutationOutcome::Confirmed);
    assert_eq!(quantity_of(&cart, "line-1"), Some(5));
    assert_eq!(stub.server_items()[0].quantity, 5);

    let request = &stub.requests_to(&Method::PUT, "/cart/items/line-1")[0];
    assert_eq!(request.body, Some(json!({ "quantity": 5 })));
}

#[tokio::test]
async fn test_update_to_zero_removes_line() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    let outcome = cart
        .update_quantity(&ctx, &CartItemId::new("line-2"), 0, &cancel)
        .await;

    assert_eq!(outcome, MutationOutcome::Confirmed);
    assert!(quantity_of(&cart, "line-2").is_none());
    assert!(stub.requests_to(&Method::PUT, "/cart/items/line-2").is_empty());
    assert_eq!(stub.requests_to(&Method::DELETE, "/cart/items/line-2").len(), 1);
    assert_eq!(stub.server_items().len(), 1);
}

#[tokio::test]
async fn test_optimistic_failure_keeps_local_change() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;
    stub.update(|s| s.fail_mutations = true);

    let outcome = cart
        .update_quantity(&ctx, &CartItemId::new("line-1"), 7, &cancel)
        .await;

    let message = Operation::UpdateQuantity.failure_message();
    assert_eq!(outcome.error(), Some(message));
    assert!(matches!(outcome, MutationOutcome::Diverged { .. }));
    assert_eq!(quantity_of(&cart, "line-1"), Some(7));
    assert_eq!(stub.server_items()[0].quantity, 2);
    assert_eq!(cart.error(), Some(message));
}

#[tokio::test]
async fn test_unusable_mutation_response_diverges() {
    for fault in [EnvelopeFault::Unsuccessful, EnvelopeFault::NotJson] {
        let stub = StubBackend::start(Scenario::two_line_cart()).await;
        let store = guest_store(None);
        let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
        let ctx = store.context().unwrap();
        let cancel = CancellationToken::new();
        cart.load(&ctx, &cancel).await;
        stub.update(|s| s.envelope_fault = Some(fault));

        let outcome = cart
            .update_quantity(&ctx, &CartItemId::new("line-1"), 4, &cancel)
            .await;

        assert_eq!(
            outcome,
            MutationOutcome::Diverged {
                error: Operation::UpdateQuantity.failure_message().to_string()
            },
            "{fault:?}"
        );
        assert_eq!(quantity_of(&cart, "line-1"), Some(4), "{fault:?}");
        assert_eq!(stub.server_items()[0].quantity, 2, "{fault:?}");
    }
}

#[tokio::test]
async fn test_oversized_quantity_rejected_without_request() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    let outcome = cart
        .update_quantity(&ctx, &CartItemId::new("line-1"), 5_000_000_000, &cancel)
        .await;

    assert!(matches!(outcome, MutationOutcome::Rejected { .. }));
    assert_eq!(quantity_of(&cart, "line-1"), Some(2));
    assert_eq!(cart.item_count(), 3);
    assert!(stub.requests_to(&Method::PUT, "/cart/items/line-1").is_empty());
    assert_eq!(stub.server_items()[0].quantity, 2);
}

#[tokio::test]
async fn test_add_zero_quantity_rejected_without_request() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    let outcome = cart
        .add_item(&ctx, &ProductId::new("p-9"), 0, &cancel)
        .await;

    assert!(matches!(outcome, MutationOutcome::Rejected { .. }));
    assert!(stub.requests_to(&Method::POST, "/cart/55/items").is_empty());
    assert_eq!(stub.server_items().len(), 2);
}

#[tokio::test]
async fn test_rollback_failure_restores_lines() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Rollback);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;
    stub.update(|s| s.fail_mutations = true);

    let outcome = cart
        .remove_item(&ctx, &CartItemId::new("line-1"), &cancel)
        .await;

    assert!(matches!(outcome, MutationOutcome::RolledBack { .. }));
    assert_eq!(cart.items().len(), 2);
    assert_eq!(cart.totals().subtotal, Amount::new(650_000));
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    stub.update(|s| s.fail_mutations = true);
    cart.update_quantity(&ctx, &CartItemId::new("line-1"), 3, &cancel)
        .await;
    assert!(cart.error().is_some());

    stub.update(|s| s.fail_mutations = false);
    cart.update_quantity(&ctx, &CartItemId::new("line-1"), 4, &cancel)
        .await;
    assert!(cart.error().is_none());
}

#[tokio::test]
async fn test_add_item_reloads_cart() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    let cancel = CancellationToken::new();
    cart.load(&ctx, &cancel).await;

    let outcome = cart
        .add_item(&ctx, &ProductId::new("p-9"), 2, &cancel)
        .await;

    assert_eq!(outcome, MutationOutcome::Confirmed);
    assert_eq!(cart.items().len(), 3);
    assert_eq!(cart.item_count(), 5);

    let request = &stub.requests_to(&Method::POST, "/cart/55/items")[0];
    assert_eq!(
        request.body,
        Some(json!({ "productId": "p-9", "quantity": 2 }))
    );
}

#[tokio::test]
async fn test_add_item_before_load_fetches_cart_id() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);

    let outcome = cart
        .add_item(
            &store.context().unwrap(),
            &ProductId::new("p-1"),
            1,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(outcome, MutationOutcome::Confirmed);
    assert_eq!(quantity_of(&cart, "line-1"), Some(3));
    assert_eq!(stub.requests_to(&Method::GET, "/cart").len(), 2);
}

#[tokio::test]
async fn test_cancelled_update_leaves_state_unchanged() {
    let stub = StubBackend::start(Scenario::two_line_cart()).await;
    let store = guest_store(None);
    let mut cart = cart_client(&stub, &store, MutationPolicy::Optimistic);
    let ctx = store.context().unwrap();
    cart.load(&ctx, &CancellationToken::new()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = cart
        .update_quantity(&ctx, &CartItemId::new("line-1"), 9, &cancel)
        .await;

    assert_eq!(outcome, MutationOutcome::Cancelled);
    assert_eq!(quantity_of(&cart, "line-1"), Some(2));
    assert!(cart.error().is_none());
    assert!(stub.requests_to(&Method::PUT, "/cart/items/line-1").is_empty());
}
