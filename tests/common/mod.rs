#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use storefront_client::{
    events::UiEvent,
    storage::{MemoryTokenStore, TokenStore, ACCESS_TOKEN_KEY},
    ClientConfig, Storefront,
};
use tokio::sync::broadcast;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "test-token";

/// Storefront wired to a wiremock backend and an in-memory token store.
pub struct TestApp {
    pub server: MockServer,
    pub storefront: Storefront,
    pub store: Arc<MemoryTokenStore>,
    events: broadcast::Receiver<UiEvent>,
}

impl TestApp {
    /// Signed-out shopper.
    pub async fn new() -> Self {
        Self::build(MemoryTokenStore::new(), |config| config).await
    }

    /// Shopper with `TOKEN` already stored.
    pub async fn signed_in() -> Self {
        Self::build(MemoryTokenStore::with_token(TOKEN), |config| config).await
    }

    pub async fn with_config(
        store: MemoryTokenStore,
        configure: impl FnOnce(ClientConfig) -> ClientConfig,
    ) -> Self {
        Self::build(store, configure).await
    }

    async fn build(
        store: MemoryTokenStore,
        configure: impl FnOnce(ClientConfig) -> ClientConfig,
    ) -> Self {
        let server = MockServer::start().await;
        let config = configure(ClientConfig::for_backend(server.uri()));
        let store = Arc::new(store);
        let storefront =
            Storefront::connect(config, store.clone()).expect("storefront should build");
        let events = storefront.state.subscribe();

        Self {
            server,
            storefront,
            store,
            events,
        }
    }

    pub fn stored_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY).expect("memory store never fails")
    }

    /// Every event published since the last call.
    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Notices only, as `(level, message)` strings.
    pub fn notices(&mut self) -> Vec<(String, String)> {
        self.drain_events()
            .into_iter()
            .filter_map(|event| match event {
                UiEvent::Notice { level, message } => Some((level.to_string(), message)),
                _ => None,
            })
            .collect()
    }

    pub async fn mock_current_user(&self, user: Value) {
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_cart(&self, items: Value) {
        Mock::given(method("GET"))
            .and(path("/api/cart/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the backend saw, optionally narrowed to one path.
    pub async fn request_count(&self, only_path: Option<&str>) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| only_path.map_or(true, |p| request.url.path() == p))
            .count()
    }
}

pub fn customer() -> Value {
    json!({
        "id": 7,
        "username": "ama",
        "email": "ama@example.com",
        "full_name": "Ama Mensah",
        "role": "customer"
    })
}

pub fn admin() -> Value {
    json!({
        "id": 1,
        "username": "root",
        "email": "root@example.com",
        "full_name": "Shop Admin",
        "role": "admin"
    })
}

pub fn cart_line(id: i64, product_id: i64, price: f64, quantity: u32) -> Value {
    json!({
        "id": id,
        "product_id": product_id,
        "product_name": format!("Product {}", product_id),
        "product_price": price,
        "price_at_time": price,
        "quantity": quantity,
        "total_price": price * quantity as f64
    })
}

pub fn detail(message: &str) -> Value {
    json!({ "detail": message })
}
