use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{RemovalRoute, StorefrontApi};
use crate::config::ClientConfig;
use crate::errors::{ClientError, ErrorBody};
use crate::models::{
    AccessToken, BehaviorEvent, CartItemId, CartLineItem, CreateOrderRequest, LoginResponse, Order,
    PaymentVerification, ProductId, Quantity, RegisterRequest, User,
};

#[derive(Serialize)]
struct QuantityBody {
    quantity: u32,
}

/// `StorefrontApi` over HTTP/JSON.
#[derive(Clone, Debug)]
pub struct HttpStorefrontApi {
    client: Client,
    base_url: Url,
}

impl HttpStorefrontApi {
    /// Builds a client for the configured backend. No timeout is applied unless
    /// `request_timeout_secs` is set.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().gzip(true);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Self::with_client(&config.api_base_url, client)
    }

    /// Build from an existing client (useful for testing).
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid api_base_url '{}': {}", base_url, e)))?;

        // Relative joins keep any path prefix of the base.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<RequestBuilder, ClientError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "backend request");

        let builder = self.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.detail_text());

        warn!(%status, detail = detail.as_deref().unwrap_or(""), "backend rejected request");
        Err(ClientError::Api { status, detail })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontApi {
    #[instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let request = self
            .request(Method::POST, "api/auth/login", None)?
            .form(&[("username", username), ("password", password)]);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, "api/auth/register", None)?
            .json(request);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn current_user(&self, token: &AccessToken) -> Result<User, ClientError> {
        let request = self.request(Method::GET, "api/auth/me", Some(token))?;
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn cart_items(&self, token: &AccessToken) -> Result<Vec<CartLineItem>, ClientError> {
        let request = self.request(Method::GET, "api/cart/", Some(token))?;
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn add_to_cart(
        &self,
        token: &AccessToken,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &format!("api/cart/add/{}", product), Some(token))?
            .query(&[("quantity", quantity.get())]);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn remove_cart_item(
        &self,
        token: &AccessToken,
        item: CartItemId,
        route: RemovalRoute,
    ) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &route.path(item), Some(token))?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn update_cart_item(
        &self,
        token: &AccessToken,
        item: CartItemId,
        quantity: Quantity,
    ) -> Result<(), ClientError> {
        // The backend reads the quantity from the query string; the body is kept
        // for handlers that accept JSON.
        let request = self
            .request(Method::PUT, &format!("api/cart/{}", item), Some(token))?
            .query(&[("quantity", quantity.get())])
            .json(&QuantityBody {
                quantity: quantity.get(),
            });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn clear_cart(&self, token: &AccessToken) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, "api/cart/clear", Some(token))?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token, request))]
    async fn create_order(
        &self,
        token: &AccessToken,
        request: &CreateOrderRequest,
    ) -> Result<Order, ClientError> {
        let request = self
            .request(Method::POST, "api/orders/", Some(token))?
            .json(request);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn verify_payment(
        &self,
        token: &AccessToken,
        reference: &str,
    ) -> Result<PaymentVerification, ClientError> {
        let mut url = self.endpoint("api/orders/verify-payment/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("api_base_url cannot carry a path".into()))?
            .pop_if_empty()
            .push(reference);

        let request = self
            .client
            .request(Method::POST, url)
            .bearer_auth(token.as_str());
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn track_behavior(
        &self,
        token: &AccessToken,
        event: &BehaviorEvent,
    ) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, "api/analytics/track-behavior", Some(token))?
            .json(event);
        self.send(request).await?;
        Ok(())
    }
}
