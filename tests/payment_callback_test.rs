//! Return leg from the payment gateway.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{TestApp, TOKEN};
use serde_json::json;
use storefront_client::{
    navigation::{Location, Redirect},
    ClientError,
};
use url::Url;
use wiremock::{
    matchers::{header, method, path},
    Mock, ResponseTemplate,
};

fn callback(app: &TestApp, query: &str) -> Url {
    Url::parse(&format!("{}/payment/callback?{}", app.server.uri(), query)).unwrap()
}

#[tokio::test]
async fn verified_payment_redirects_to_orders() {
    let mut app = TestApp::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/verify-payment/ref_123"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Payment verified successfully",
            "order_id": 31
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let redirect = app
        .storefront
        .payments
        .handle(&callback(&app, "trxref=ignored&reference=ref_123"))
        .await
        .unwrap();

    assert_eq!(
        redirect,
        Some(Redirect::after(Location::Orders, Duration::from_millis(2000)))
    );
    assert_eq!(
        app.notices(),
        vec![
            ("info".to_string(), "Verifying payment...".to_string()),
            (
                "success".to_string(),
                "Payment successful! Your order has been confirmed.".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn trxref_is_used_when_reference_is_missing() {
    let app = TestApp::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/verify-payment/trx_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&app.server)
        .await;

    let redirect = app
        .storefront
        .payments
        .handle(&callback(&app, "trxref=trx_9"))
        .await
        .unwrap();
    assert!(redirect.is_some());
}

#[tokio::test]
async fn any_verification_failure_asks_for_support_once() {
    let mut app = TestApp::signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/verify-payment/ref_500"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.server)
        .await;

    let err = app
        .storefront
        .payments
        .handle(&callback(&app, "reference=ref_500"))
        .await
        .unwrap_err();

    assert_matches!(err, ClientError::PaymentVerification(_));
    assert_eq!(
        app.notices().last().map(|(_, message)| message.clone()),
        Some("Payment verification failed. Please contact support.".to_string())
    );
}

#[tokio::test]
async fn ordinary_pages_are_ignored() {
    let app = TestApp::signed_in().await;
    let url = Url::parse(&format!("{}/orders", app.server.uri())).unwrap();

    assert_eq!(app.storefront.payments.handle(&url).await.unwrap(), None);
    assert_eq!(app.request_count(None).await, 0);
}
