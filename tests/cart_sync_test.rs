//! Cart synchronisation against a mocked backend.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{cart_line, customer, detail, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_client::{
    api::RemovalRoute,
    events::UiEvent,
    models::{CartItemId, ProductId, Quantity},
    state::SessionStatus,
    ClientError,
};
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, ResponseTemplate,
};

#[tokio::test]
async fn unauthenticated_add_sends_nothing() {
    let mut app = TestApp::new().await;

    let err = app
        .storefront
        .cart
        .add(ProductId(42), Quantity::new(2))
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::Unauthenticated(_));
    assert_eq!(app.request_count(None).await, 0);
    assert_eq!(
        app.notices(),
        vec![(
            "error".to_string(),
            "Please login to add items to cart".to_string()
        )]
    );
}

#[tokio::test]
async fn rejected_token_on_add_signs_out() {
    let mut app = TestApp::signed_in().await;
    app.mock_current_user(customer()).await;
    app.mock_cart(json!([cart_line(1, 42, 25.0, 1)])).await;
    app.storefront.session.initialize().await;
    app.drain_events();

    Mock::given(method("POST"))
        .and(path("/api/cart/add/42"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(detail("Could not validate credentials")),
        )
        .mount(&app.server)
        .await;

    let err = app
        .storefront
        .cart
        .add(ProductId(42), None)
        .await
        .unwrap_err();

    assert!(err.is_auth_rejection());
    assert_eq!(app.storefront.session.status(), SessionStatus::SignedOut);
    assert_eq!(app.stored_token(), None);
    assert!(app.storefront.state.cart().is_empty());

    let events = app.drain_events();
    assert!(events.contains(&UiEvent::SessionChanged));
    assert!(events.contains(&UiEvent::error("Could not validate credentials")));
}

#[tokio::test]
async fn backend_refusal_other_than_auth_keeps_session() {
    let app = TestApp::signed_in().await;
    app.mock_current_user(customer()).await;
    app.mock_cart(json!([])).await;
    app.storefront.session.initialize().await;

    Mock::given(method("POST"))
        .and(path("/api/cart/add/42"))
        .respond_with(ResponseTemplate::new(400).set_body_json(detail("Out of stock")))
        .mount(&app.server)
        .await;

    app.storefront
        .cart
        .add(ProductId(42), None)
        .await
        .unwrap_err();

    assert!(app.storefront.session.status().is_signed_in());
    assert!(app.stored_token().is_some());
}

#[tokio::test]
async fn add_defaults_to_one_and_reloads() {
    let mut app = TestApp::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/cart/add/42"))
        .and(query_param("quantity", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&app.server)
        .await;
    app.mock_cart(json!([cart_line(1, 42, 25.0, 1)])).await;

    app.storefront.cart.add(ProductId(42), None).await.unwrap();

    assert_eq!(app.request_count(Some("/api/cart/")).await, 1);
    assert_eq!(app.storefront.state.cart().line_count(), 1);
    assert_eq!(
        app.notices(),
        vec![("success".to_string(), "Product added to cart!".to_string())]
    );
}

#[tokio::test]
async fn quantity_is_clamped_on_the_wire() {
    let app = TestApp::signed_in().await;
    Mock::given(method("PUT"))
        .and(path("/api/cart/7"))
        .and(query_param("quantity", "99"))
        .and(body_json(json!({"quantity": 99})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.server)
        .await;
    app.mock_cart(json!([cart_line(7, 42, 10.0, 99)])).await;

    let sent = app
        .storefront
        .cart
        .update_quantity(CartItemId(7), 150)
        .await
        .unwrap();

    assert_eq!(sent.get(), 99);
    let cart = app.storefront.state.cart();
    assert_eq!(cart.items[0].quantity, 99);
    assert_eq!(cart.totals.subtotal, dec!(990));
}

#[tokio::test]
async fn stale_reload_is_discarded() {
    let app = TestApp::signed_in().await;
    // The first fetch is slow and reports an older cart.
    Mock::given(method("GET"))
        .and(path("/api/cart/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([cart_line(1, 42, 25.0, 1)]))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([cart_line(1, 42, 25.0, 5)])))
        .mount(&app.server)
        .await;

    let cart = &app.storefront.cart;
    let later = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cart.reload().await
    };
    let (first, second) = tokio::join!(cart.reload(), later);
    first.unwrap();
    second.unwrap();

    let snapshot = app.storefront.state.cart();
    assert_eq!(snapshot.revision, 2);
    assert_eq!(snapshot.items[0].quantity, 5);
}

#[tokio::test]
async fn removal_failures_are_worded_per_route() {
    let mut app = TestApp::signed_in().await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/remove/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.server)
        .await;

    let cart = &app.storefront.cart;
    assert!(cart.remove(CartItemId(3), RemovalRoute::Legacy).await.is_err());
    assert!(cart.remove(CartItemId(3), RemovalRoute::Canonical).await.is_err());

    assert_eq!(
        app.notices(),
        vec![
            ("error".to_string(), "Error removing item".to_string()),
            ("error".to_string(), "Failed to remove item".to_string()),
        ]
    );
}

#[tokio::test]
async fn backend_detail_wins_over_generic_wording() {
    let mut app = TestApp::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/cart/add/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(detail("Product not found")))
        .mount(&app.server)
        .await;

    assert!(app.storefront.cart.add(ProductId(9), None).await.is_err());
    assert_eq!(
        app.notices(),
        vec![("error".to_string(), "Product not found".to_string())]
    );
    assert_eq!(app.request_count(Some("/api/cart/")).await, 0);
}

#[tokio::test]
async fn clear_empties_cart() {
    let mut app = TestApp::signed_in().await;
    app.mock_cart(json!([cart_line(1, 42, 25.0, 2)])).await;
    app.storefront.cart.reload().await.unwrap();
    app.server.reset().await;

    Mock::given(method("DELETE"))
        .and(path("/api/cart/clear"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.server)
        .await;
    app.mock_cart(json!([])).await;
    app.drain_events();

    app.storefront.cart.clear().await.unwrap();

    assert!(app.storefront.state.cart().is_empty());
    assert_eq!(
        app.notices(),
        vec![("success".to_string(), "Cart cleared".to_string())]
    );
}
