use crate::core::config::{DEFAULT_TIMEOUT, DEFAULT_WINDOW_MS};
use crate::core::errors::{BackpackError, Result};
use crate::core::kernel::headers::{HeaderSet, JSON_CONTENT_TYPE};
use crate::core::kernel::signer::{Ed25519Signer, SignParams};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{instrument, trace};

/// REST client trait for the exchange HTTP API
///
/// Public calls go out unsigned. Authenticated calls are signed under the
/// given instruction: GET query pairs or the top-level fields of the JSON
/// body are the signed parameters. Requests are never retried.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a public GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters as key-value pairs
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)]) -> Result<Value>;

    /// Make a public POST request with a JSON body
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Make a public PATCH request with a JSON body
    async fn patch(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Make a public DELETE request with a JSON body
    async fn delete(&self, endpoint: &str, body: &Value) -> Result<Value>;

    /// Make a signed GET request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `query_params` - Query parameters, also the signed parameters
    /// * `instruction` - Instruction name the request is signed under
    ///
    /// # Returns
    /// The response body as a JSON value
    async fn get_authenticated(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        instruction: &str,
    ) -> Result<Value>;

    /// Make a signed POST request
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `body` - JSON object (or null); its fields are the signed parameters
    /// * `instruction` - Instruction name the request is signed under
    async fn post_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value>;

    /// Make a signed PATCH request
    async fn patch_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value>;

    /// Make a signed DELETE request
    async fn delete_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value>;

    /// POST a batch of orders as a JSON array, signed with the batch string
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `orders` - One parameter map per order, in submission order
    async fn post_batch_orders(&self, endpoint: &str, orders: &[SignParams]) -> Result<Value>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Signature validity window in milliseconds
    pub window: u64,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the API
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("backpack-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
            window: DEFAULT_WINDOW_MS,
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the signature window
    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<Ed25519Signer>>,
}

impl RestClientBuilder {
    /// Create a new builder with the given configuration
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<Ed25519Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the REST client
    ///
    /// # Returns
    /// A new `ReqwestRest` instance
    pub fn build(self) -> Result<ReqwestRest> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| BackpackError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: Arc::new(RwLock::new(self.signer)),
        })
    }
}

/// Implementation of `RestClient` using reqwest
///
/// Clones share the connection pool and the signer slot.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Arc<RwLock<Option<Arc<Ed25519Signer>>>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer().is_some())
            .finish_non_exhaustive()
    }
}

enum Signing<'a> {
    None,
    Single(&'a str, SignParams),
    Batch(&'a [SignParams]),
}

impl ReqwestRest {
    /// Create an unsigned client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        RestClientBuilder::new(RestClientConfig::new(base_url)).build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Replace the signer used for authenticated requests
    ///
    /// Requests already in flight keep the signer they started with.
    pub fn set_signer(&self, signer: Option<Arc<Ed25519Signer>>) {
        let mut slot = self
            .signer
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = signer;
    }

    pub fn signer(&self) -> Option<Arc<Ed25519Signer>> {
        self.signer
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Decode a JSON value into a typed response
    pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(BackpackError::from)
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn require_signer(&self) -> Result<Arc<Ed25519Signer>> {
        self.signer().ok_or(BackpackError::AuthRequired)
    }

    fn body_params(body: &Value) -> Result<SignParams> {
        match body {
            Value::Object(map) => Ok(map.clone()),
            Value::Null => Ok(SignParams::new()),
            other => Err(BackpackError::InvalidParameters(format!(
                "Signed request body must be a JSON object, got {}",
                json_kind(other)
            ))),
        }
    }

    fn query_params(query_params: &[(&str, &str)]) -> SignParams {
        query_params
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
            .collect()
    }

    fn apply_headers(request: RequestBuilder, headers: &HeaderSet) -> RequestBuilder {
        headers
            .to_headers()
            .into_iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }

    /// Handle the response and extract JSON
    #[instrument(skip(self, response), fields(status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| BackpackError::Transport(format!("Failed to read response body: {}", e)))?;

        trace!("Response body: {}", response_text);

        if !status.is_success() {
            return Err(BackpackError::from_response(status.as_u16(), &response_text));
        }

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            // A few endpoints answer with bare text (e.g. `pong`)
            Err(_) => Ok(Value::String(response_text)),
        }
    }

    /// Make a request with the given parameters
    #[instrument(skip(self, query_params, body, signing), fields(method = %method, endpoint = %endpoint))]
    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: Option<&Value>,
        signing: Signing<'_>,
    ) -> Result<Value> {
        let headers = match signing {
            Signing::None => None,
            Signing::Single(instruction, params) => {
                let signer = self.require_signer()?;
                Some(signer.generate_headers(instruction, &params, self.config.window))
            }
            Signing::Batch(orders) => {
                let signer = self.require_signer()?;
                Some(signer.generate_batch_headers(orders, self.config.window))
            }
        };

        let url = self.build_url(endpoint);
        let mut request = self.client.request(method, &url);

        if !query_params.is_empty() {
            request = request.query(query_params);
        }

        if let Some(headers) = &headers {
            request = Self::apply_headers(request, headers);
        }

        if let Some(body) = body.filter(|b| !b.is_null()) {
            let bytes = serde_json::to_vec(body)?;
            if headers.is_none() {
                request = request.header("Content-Type", JSON_CONTENT_TYPE);
            }
            request = request.body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackpackError::Transport(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn get(&self, endpoint: &str, query_params: &[(&str, &str)]) -> Result<Value> {
        self.make_request(Method::GET, endpoint, query_params, None, Signing::None)
            .await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.make_request(Method::POST, endpoint, &[], Some(body), Signing::None)
            .await
    }

    async fn patch(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.make_request(Method::PATCH, endpoint, &[], Some(body), Signing::None)
            .await
    }

    async fn delete(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.make_request(Method::DELETE, endpoint, &[], Some(body), Signing::None)
            .await
    }

    async fn get_authenticated(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
        instruction: &str,
    ) -> Result<Value> {
        let params = Self::query_params(query_params);
        self.make_request(
            Method::GET,
            endpoint,
            query_params,
            None,
            Signing::Single(instruction, params),
        )
        .await
    }

    async fn post_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value> {
        let params = Self::body_params(body)?;
        self.make_request(
            Method::POST,
            endpoint,
            &[],
            Some(body),
            Signing::Single(instruction, params),
        )
        .await
    }

    async fn patch_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value> {
        let params = Self::body_params(body)?;
        self.make_request(
            Method::PATCH,
            endpoint,
            &[],
            Some(body),
            Signing::Single(instruction, params),
        )
        .await
    }

    async fn delete_authenticated(&self, endpoint: &str, body: &Value, instruction: &str) -> Result<Value> {
        let params = Self::body_params(body)?;
        self.make_request(
            Method::DELETE,
            endpoint,
            &[],
            Some(body),
            Signing::Single(instruction, params),
        )
        .await
    }

    async fn post_batch_orders(&self, endpoint: &str, orders: &[SignParams]) -> Result<Value> {
        if orders.is_empty() {
            return Err(BackpackError::InvalidParameters(
                "Batch must contain at least one order".to_string(),
            ));
        }
        let body = Value::Array(orders.iter().cloned().map(Value::Object).collect());
        self.make_request(
            Method::POST,
            endpoint,
            &[],
            Some(&body),
            Signing::Batch(orders),
        )
        .await
    }
}
