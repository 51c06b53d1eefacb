//! WooCommerce REST client.
//!
//! Thin typed CRUD over the store API, wrapped in the per-platform rate
//! limiter and the retry executor. Every attempt re-acquires a rate-limit
//! slot so retries respect global throttling. Non-2xx responses become
//! [`WooError::Api`] carrying status, endpoint and raw body; `204 No Content`
//! resolves to `None`; a 404 on delete counts as success (already absent).

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use tomo_core::Platform;

use crate::cache::{InMemoryTermCache, TermCache};
use crate::config::{PlatformConfigs, WooConfig};
use crate::error::{WooError, WooResult};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryExecutor;
use crate::types::{
    WooAttribute, WooAttributeTerm, WooCategory, WooCoupon, WooCustomer, WooOrder, WooProduct,
    WooTag,
};

/// Page size used when scanning paginated collections.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client for one WooCommerce store.
pub struct WooClient {
    platform: Platform,
    config: WooConfig,
    http: Client,
    rate_limiter: RateLimiter,
    retry: RetryExecutor,
    cache: Arc<dyn TermCache>,
}

impl std::fmt::Debug for WooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooClient")
            .field("platform", &self.platform)
            .field("config", &self.config)
            .finish()
    }
}

impl WooClient {
    /// Create a client for a platform from its configuration.
    pub fn new(platform: Platform, config: WooConfig) -> WooResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connection.connect_timeout_secs))
            .timeout(Duration::from_secs(config.connection.read_timeout_secs))
            .build()
            .map_err(|e| WooError::configuration(format!("failed to build HTTP client: {e}")))?;

        let rate_limiter = RateLimiter::new(config.rate_limit.clone());
        let retry = RetryExecutor::new(config.retry.clone());

        Ok(Self {
            platform,
            config,
            http,
            rate_limiter,
            retry,
            cache: Arc::new(InMemoryTermCache::new()),
        })
    }

    /// Replace the term cache (shared between clients or backed elsewhere).
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TermCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The platform this client talks to.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The term cache in use.
    #[must_use]
    pub(crate) fn cache(&self) -> &Arc<dyn TermCache> {
        &self.cache
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.key, self.config.secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// One HTTP attempt: acquire a rate-limit slot, send, classify.
    async fn attempt(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> WooResult<Option<Value>> {
        let _slot = self.rate_limiter.acquire().await;

        let url = self.url(endpoint);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(header::ACCEPT, "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(json_body) = body {
            request = request.json(json_body);
        }

        debug!(platform = %self.platform, method = %method, endpoint, "Sending store request");

        let response = request
            .send()
            .await
            .map_err(|e| WooError::network(endpoint, e))?;

        self.classify(endpoint, response).await
    }

    /// Turn a response into `Ok(Some(json))`, `Ok(None)` for 204, or an
    /// [`WooError::Api`] carrying status/endpoint/body.
    async fn classify(&self, endpoint: &str, response: Response) -> WooResult<Option<Value>> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| WooError::network(endpoint, e))?;
            if body.trim().is_empty() {
                return Ok(None);
            }
            let value = serde_json::from_str(&body).map_err(|e| {
                WooError::serialization(format!("invalid JSON from {endpoint}: {e}"))
            })?;
            return Ok(Some(value));
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response.text().await.unwrap_or_default();
        Err(WooError::Api {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
            retry_after,
        })
    }

    /// Send a request through the retry executor.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> WooResult<Option<Value>> {
        let platform = self.platform;
        self.retry
            .execute(
                || self.attempt(method.clone(), endpoint, query, body),
                |err, attempt| {
                    warn!(
                        platform = %platform,
                        endpoint,
                        attempt,
                        error = %err,
                        "Retrying store request"
                    );
                },
            )
            .await
    }

    async fn get_value(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> WooResult<Option<Value>> {
        self.send(Method::GET, endpoint, query, None).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> WooResult<Option<T>> {
        match self.get_value(endpoint, query).await? {
            Some(value) => Ok(Some(decode(endpoint, value)?)),
            None => Ok(None),
        }
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> WooResult<T> {
        let body = encode(endpoint, body)?;
        let value = self.send(Method::POST, endpoint, &[], Some(&body)).await?;
        decode_required(endpoint, value)
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> WooResult<T> {
        let body = encode(endpoint, body)?;
        let value = self.send(Method::PUT, endpoint, &[], Some(&body)).await?;
        decode_required(endpoint, value)
    }

    /// Idempotent delete with the force flag: a 404 means the record is
    /// already gone and resolves successfully.
    async fn delete_resource(&self, endpoint: &str) -> WooResult<()> {
        let query = [("force", "true".to_string())];
        match self.send(Method::DELETE, endpoint, &query, None).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(endpoint, "Delete target already absent, treating as success");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch one page of a collection, normalizing both response shapes
    /// (bare array, or object wrapping a `data` array).
    async fn list_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        per_page: u32,
        extra_query: &[(&str, String)],
    ) -> WooResult<Vec<T>> {
        let mut query = vec![
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        query.extend(extra_query.iter().map(|(k, v)| (*k, v.clone())));

        let value = self.get_value(endpoint, &query).await?;
        let items = normalize_list(value);
        items
            .into_iter()
            .map(|item| decode(endpoint, item))
            .collect()
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// List a page of products.
    pub async fn list_products(&self, page: u32, per_page: u32) -> WooResult<Vec<WooProduct>> {
        self.list_page("products", page, per_page, &[]).await
    }

    /// Fetch a product by id. `None` when it does not exist.
    pub async fn get_product(&self, id: i64) -> WooResult<Option<WooProduct>> {
        match self.get_json(&format!("products/{id}"), &[]).await {
            Ok(product) => Ok(product),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a product.
    #[instrument(skip(self, product), fields(platform = %self.platform))]
    pub async fn create_product(&self, product: &WooProduct) -> WooResult<WooProduct> {
        self.post_json("products", product).await
    }

    /// Update a product.
    #[instrument(skip(self, product), fields(platform = %self.platform))]
    pub async fn update_product(&self, id: i64, product: &WooProduct) -> WooResult<WooProduct> {
        self.put_json(&format!("products/{id}"), product).await
    }

    /// Delete a product permanently; 404 counts as success.
    pub async fn delete_product(&self, id: i64) -> WooResult<()> {
        self.delete_resource(&format!("products/{id}")).await
    }

    /// Find a product by exact SKU.
    pub async fn find_product_by_sku(&self, sku: &str) -> WooResult<Option<WooProduct>> {
        let query = [("sku", sku.to_string())];
        let products: Vec<WooProduct> = self.list_page("products", 1, 10, &query).await?;
        Ok(products.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Customers
    // ------------------------------------------------------------------

    /// Fetch a customer by id. `None` when it does not exist.
    pub async fn get_customer(&self, id: i64) -> WooResult<Option<WooCustomer>> {
        match self.get_json(&format!("customers/{id}"), &[]).await {
            Ok(customer) => Ok(customer),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a customer.
    #[instrument(skip(self, customer), fields(platform = %self.platform))]
    pub async fn create_customer(&self, customer: &WooCustomer) -> WooResult<WooCustomer> {
        self.post_json("customers", customer).await
    }

    /// Update a customer.
    pub async fn update_customer(&self, id: i64, customer: &WooCustomer) -> WooResult<WooCustomer> {
        self.put_json(&format!("customers/{id}"), customer).await
    }

    /// Delete a customer permanently; 404 counts as success.
    pub async fn delete_customer(&self, id: i64) -> WooResult<()> {
        self.delete_resource(&format!("customers/{id}")).await
    }

    /// Find a customer by email.
    pub async fn find_customer_by_email(&self, email: &str) -> WooResult<Option<WooCustomer>> {
        let query = [("email", email.to_string())];
        let customers: Vec<WooCustomer> = self.list_page("customers", 1, 10, &query).await?;
        Ok(customers.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Fetch an order by id. `None` when it does not exist.
    pub async fn get_order(&self, id: i64) -> WooResult<Option<WooOrder>> {
        match self.get_json(&format!("orders/{id}"), &[]).await {
            Ok(order) => Ok(order),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create an order.
    #[instrument(skip(self, order), fields(platform = %self.platform))]
    pub async fn create_order(&self, order: &WooOrder) -> WooResult<WooOrder> {
        self.post_json("orders", order).await
    }

    /// Update an order.
    #[instrument(skip(self, order), fields(platform = %self.platform))]
    pub async fn update_order(&self, id: i64, order: &WooOrder) -> WooResult<WooOrder> {
        self.put_json(&format!("orders/{id}"), order).await
    }

    /// Delete an order permanently; 404 counts as success.
    pub async fn delete_order(&self, id: i64) -> WooResult<()> {
        self.delete_resource(&format!("orders/{id}")).await
    }

    // ------------------------------------------------------------------
    // Coupons
    // ------------------------------------------------------------------

    /// Fetch a coupon by id. `None` when it does not exist.
    pub async fn get_coupon(&self, id: i64) -> WooResult<Option<WooCoupon>> {
        match self.get_json(&format!("coupons/{id}"), &[]).await {
            Ok(coupon) => Ok(coupon),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a coupon.
    pub async fn create_coupon(&self, coupon: &WooCoupon) -> WooResult<WooCoupon> {
        self.post_json("coupons", coupon).await
    }

    /// Update a coupon.
    pub async fn update_coupon(&self, id: i64, coupon: &WooCoupon) -> WooResult<WooCoupon> {
        self.put_json(&format!("coupons/{id}"), coupon).await
    }

    /// Delete a coupon permanently; 404 counts as success.
    pub async fn delete_coupon(&self, id: i64) -> WooResult<()> {
        self.delete_resource(&format!("coupons/{id}")).await
    }

    /// Find a coupon by its code.
    pub async fn find_coupon_by_code(&self, code: &str) -> WooResult<Option<WooCoupon>> {
        let query = [("code", code.to_string())];
        let coupons: Vec<WooCoupon> = self.list_page("coupons", 1, 10, &query).await?;
        Ok(coupons.into_iter().next())
    }

    // ------------------------------------------------------------------
    // Attributes and attribute terms
    // ------------------------------------------------------------------

    /// List a page of catalog attributes.
    pub async fn list_attributes(&self, page: u32, per_page: u32) -> WooResult<Vec<WooAttribute>> {
        self.list_page("products/attributes", page, per_page, &[])
            .await
    }

    /// Create a catalog attribute.
    pub async fn create_attribute(&self, attribute: &WooAttribute) -> WooResult<WooAttribute> {
        self.post_json("products/attributes", attribute).await
    }

    /// List a page of terms under an attribute, optionally filtered by slug.
    pub async fn list_attribute_terms(
        &self,
        attribute_id: i64,
        page: u32,
        per_page: u32,
        slug: Option<&str>,
    ) -> WooResult<Vec<WooAttributeTerm>> {
        let endpoint = format!("products/attributes/{attribute_id}/terms");
        let extra: Vec<(&str, String)> = match slug {
            Some(slug) => vec![("slug", slug.to_string())],
            None => Vec::new(),
        };
        self.list_page(&endpoint, page, per_page, &extra).await
    }

    /// Create an attribute term.
    pub async fn create_attribute_term(
        &self,
        attribute_id: i64,
        term: &WooAttributeTerm,
    ) -> WooResult<WooAttributeTerm> {
        self.post_json(&format!("products/attributes/{attribute_id}/terms"), term)
            .await
    }

    /// Update an attribute term.
    pub async fn update_attribute_term(
        &self,
        attribute_id: i64,
        term_id: i64,
        term: &WooAttributeTerm,
    ) -> WooResult<WooAttributeTerm> {
        self.put_json(
            &format!("products/attributes/{attribute_id}/terms/{term_id}"),
            term,
        )
        .await
    }

    /// Delete an attribute term; 404 counts as success.
    pub async fn delete_attribute_term(&self, attribute_id: i64, term_id: i64) -> WooResult<()> {
        self.delete_resource(&format!(
            "products/attributes/{attribute_id}/terms/{term_id}"
        ))
        .await
    }

    // ------------------------------------------------------------------
    // Categories and tags
    // ------------------------------------------------------------------

    /// List a page of product categories, optionally filtered by slug.
    pub async fn list_categories(
        &self,
        page: u32,
        per_page: u32,
        slug: Option<&str>,
    ) -> WooResult<Vec<WooCategory>> {
        let extra: Vec<(&str, String)> = match slug {
            Some(slug) => vec![("slug", slug.to_string())],
            None => Vec::new(),
        };
        self.list_page("products/categories", page, per_page, &extra)
            .await
    }

    /// Create a product category.
    pub async fn create_category(&self, category: &WooCategory) -> WooResult<WooCategory> {
        self.post_json("products/categories", category).await
    }

    /// Update a product category.
    pub async fn update_category(&self, id: i64, category: &WooCategory) -> WooResult<WooCategory> {
        self.put_json(&format!("products/categories/{id}"), category)
            .await
    }

    /// List a page of product tags, optionally filtered by slug.
    pub async fn list_tags(
        &self,
        page: u32,
        per_page: u32,
        slug: Option<&str>,
    ) -> WooResult<Vec<WooTag>> {
        let extra: Vec<(&str, String)> = match slug {
            Some(slug) => vec![("slug", slug.to_string())],
            None => Vec::new(),
        };
        self.list_page("products/tags", page, per_page, &extra).await
    }

    /// Create a product tag.
    pub async fn create_tag(&self, tag: &WooTag) -> WooResult<WooTag> {
        self.post_json("products/tags", tag).await
    }

    /// Update a product tag.
    pub async fn update_tag(&self, id: i64, tag: &WooTag) -> WooResult<WooTag> {
        self.put_json(&format!("products/tags/{id}"), tag).await
    }
}

/// Clients for every configured platform.
///
/// Unconfigured platforms are simply absent; outbound callers treat that as
/// "skip with a warning", inbound callers as a configuration error.
pub struct WooClientSet {
    clients: HashMap<Platform, Arc<WooClient>>,
}

impl WooClientSet {
    /// Build clients from a configuration set, sharing one term cache.
    pub fn from_configs(configs: &PlatformConfigs) -> WooResult<Self> {
        let cache: Arc<dyn TermCache> = Arc::new(InMemoryTermCache::new());
        let mut clients = HashMap::new();
        for platform in configs.platforms() {
            if let Some(config) = configs.get(platform) {
                let client = WooClient::new(platform, config.clone())?.with_cache(cache.clone());
                clients.insert(platform, Arc::new(client));
            }
        }
        Ok(Self { clients })
    }

    /// Build a set from pre-constructed clients (used by tests).
    #[must_use]
    pub fn from_clients(clients: impl IntoIterator<Item = WooClient>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.platform(), Arc::new(c)))
                .collect(),
        }
    }

    /// Client for a platform, if configured.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&Arc<WooClient>> {
        self.clients.get(&platform)
    }

    /// Client for a platform, or a configuration error.
    pub fn require(&self, platform: Platform) -> WooResult<&Arc<WooClient>> {
        self.clients.get(&platform).ok_or_else(|| {
            WooError::configuration(format!("platform {platform} is not configured"))
        })
    }

    /// Configured platforms.
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.clients.keys().copied()
    }
}

fn encode<B: Serialize>(endpoint: &str, body: &B) -> WooResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| WooError::serialization(format!("cannot encode body for {endpoint}: {e}")))
}

fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> WooResult<T> {
    serde_json::from_value(value)
        .map_err(|e| WooError::serialization(format!("unexpected shape from {endpoint}: {e}")))
}

fn decode_required<T: DeserializeOwned>(endpoint: &str, value: Option<Value>) -> WooResult<T> {
    match value {
        Some(value) => decode(endpoint, value),
        None => Err(WooError::serialization(format!(
            "empty response body from {endpoint}"
        ))),
    }
}

/// Normalize a collection response: either a bare array or an object
/// wrapping a `data` array.
fn normalize_list(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
