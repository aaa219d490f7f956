use super::error::ApiError;
use super::types::{CartAddRequest, ErrorBody, Product, ProductPayload, WishlistEntry, WishlistPayload};
use crate::util::{join_segments, validate_base_url};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const MAX_BODY_SIZE: usize = 2 * 1024 * 1024; // 2MB
const MAX_ERROR_BODY_SIZE: usize = 64 * 1024;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client for the storefront's catalog, wishlist and cart endpoints.
///
/// Cheap to clone: `reqwest::Client` is reference counted internally.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Build a client with connection pooling and the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Self::with_http_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base = validate_base_url(base_url)?;
        tracing::debug!(base_url = %base, "Storefront API client configured");
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        join_segments(&self.base, segments)
    }

    // ------------------------------------------------------------------------
    // ProductCatalogService
    // ------------------------------------------------------------------------

    /// `GET /products/{id}`. 404/410 come back as `NotFound`/`Gone`.
    pub async fn fetch_product(&self, product_id: &str) -> Result<Product, ApiError> {
        let response = self
            .http
            .get(self.url(&["products", product_id]))
            .send()
            .await?;
        let payload: ProductPayload = read_json(response).await?;
        Ok(payload.into_product())
    }

    // ------------------------------------------------------------------------
    // WishlistStore
    // ------------------------------------------------------------------------

    /// `GET /wishlist` for the session owning `token`.
    pub async fn fetch_wishlist(&self, token: &SecretString) -> Result<Vec<WishlistEntry>, ApiError> {
        let response = self
            .http
            .get(self.url(&["wishlist"]))
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .send()
            .await?;
        let payload: WishlistPayload = read_json(response).await?;
        Ok(payload.into_entries())
    }

    /// `DELETE /wishlist/{productId}`.
    pub async fn remove_from_wishlist(
        &self,
        token: &SecretString,
        product_id: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&["wishlist", product_id]))
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .send()
            .await?;
        expect_success(response).await
    }

    /// `DELETE /wishlist`: removes every entry.
    pub async fn clear_wishlist(&self, token: &SecretString) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.url(&["wishlist"]))
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .send()
            .await?;
        expect_success(response).await
    }

    // ------------------------------------------------------------------------
    // CartService
    // ------------------------------------------------------------------------

    /// `POST /cart/add`.
    pub async fn add_to_cart(
        &self,
        token: &SecretString,
        request: &CartAddRequest,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&["cart", "add"]))
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .json(request)
            .send()
            .await?;
        expect_success(response).await
    }
}

fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

async fn expect_success(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(status_error(response).await)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    let bytes = read_limited_bytes(response, MAX_BODY_SIZE).await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Turn a non-2xx response into an `ApiError`, keeping the server's message if any.
async fn status_error(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match read_limited_bytes(response, MAX_ERROR_BODY_SIZE).await {
        Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        Err(e) => {
            tracing::debug!(status, error = %e, "Could not read error response body");
            None
        }
    };
    ApiError::from_status(status, message)
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::CartProduct;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> SecretString {
        SecretString::from("tok-123")
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), DEFAULT_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_product_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "discountedPrice": 12,
                "image": "img1"
            })))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let product = client.fetch_product("p1").await.unwrap();
        assert_eq!(product.effective_price(), Some(12.0));
        assert_eq!(product.image.as_deref(), Some("img1"));
    }

    #[tokio::test]
    async fn test_fetch_product_404_and_410() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/products/retired"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        assert!(matches!(
            client.fetch_product("missing").await,
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            client.fetch_product("retired").await,
            Err(ApiError::Gone)
        ));
    }

    #[tokio::test]
    async fn test_fetch_product_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.fetch_product("p1").await.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 500, .. }));
        assert!(!err.is_missing_product());
    }

    #[tokio::test]
    async fn test_fetch_wishlist_sends_bearer_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wishlist"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"productId": "p1", "price": 10}
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let entries = client.fetch_wishlist(&token()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].product_id, "p1");
    }

    #[tokio::test]
    async fn test_fetch_wishlist_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wishlist"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.fetch_wishlist(&token()).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_remove_encodes_product_id() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/wishlist/a%2Fb"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        client.remove_from_wishlist(&token(), "a/b").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_wishlist_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/wishlist"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let result = client.clear_wishlist(&token()).await;
        assert!(matches!(result, Err(ApiError::HttpStatus { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_add_to_cart_posts_payload_and_reads_error_message() {
        let mock_server = MockServer::start().await;
        let request = CartAddRequest {
            user_id: "u1".to_string(),
            product: CartProduct {
                product_id: "p1".to_string(),
                name: "Lamp".to_string(),
                image: Some("img1".to_string()),
                mrp: 20.0,
                discounted_price: 12.0,
                quantity: 1,
            },
        };
        Mock::given(method("POST"))
            .and(path("/cart/add"))
            .and(body_json(serde_json::to_value(&request).unwrap()))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "Out of stock"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_for(&mock_server);
        let err = client.add_to_cart(&token(), &request).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Out of stock"));
    }

    #[tokio::test]
    async fn test_base_url_with_path_prefix() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ApiClient::new(&format!("{}/api", mock_server.uri()), DEFAULT_TIMEOUT).unwrap();
        assert!(client.fetch_product("p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_insecure_base_url_rejected() {
        let result = ApiClient::new("http://evil.com", DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }
}
