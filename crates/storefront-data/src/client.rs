//! Storefront API GraphQL client.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storefront_core::{I18n, StorefrontEnv};

use crate::cache::{CacheMode, Lookup, QueryCache};
use crate::error::DataError;
use crate::retry::RetryPolicy;
use crate::transport::{StorefrontTransport, TransportRequest};

/// Header carrying a public Storefront API token.
pub const PUBLIC_TOKEN_HEADER: &str = "x-shopify-storefront-access-token";

/// Header carrying a private (delegate) Storefront API token.
pub const PRIVATE_TOKEN_HEADER: &str = "shopify-storefront-private-token";

/// Default budget for one upstream attempt.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the Storefront API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub store_domain: String,
    pub api_version: String,
    pub public_token: Option<String>,
    pub private_token: Option<String>,
    pub i18n: I18n,
}

impl StorefrontConfig {
    /// Build from the app environment.
    pub fn from_env(env: &StorefrontEnv) -> Result<Self, DataError> {
        let store_domain = Some(env.store_domain.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DataError::Config("PUBLIC_STORE_DOMAIN is not set".into()))?;

        Ok(Self {
            store_domain,
            api_version: env.api_version().to_string(),
            public_token: env.public_storefront_api_token.clone(),
            private_token: env.private_storefront_api_token.clone(),
            i18n: env.i18n.clone(),
        })
    }

    /// GraphQL endpoint URL.
    pub fn endpoint(&self) -> String {
        let domain = self.store_domain.trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            format!("{}/api/{}/graphql.json", domain, self.api_version)
        } else {
            format!("https://{}/api/{}/graphql.json", domain, self.api_version)
        }
    }

    /// Request headers. The private token wins when both are configured.
    pub fn headers(&self) -> Result<HeaderMap, DataError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let token = match (&self.private_token, &self.public_token) {
            (Some(token), _) if !token.is_empty() => Some((PRIVATE_TOKEN_HEADER, token)),
            (_, Some(token)) if !token.is_empty() => Some((PUBLIC_TOKEN_HEADER, token)),
            _ => None,
        };
        if let Some((name, token)) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| DataError::Config(format!("invalid API token: {}", e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Per-query options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// GraphQL variables.
    pub variables: Map<String, Value>,
    /// Cache mode.
    pub cache: CacheMode,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Set the cache mode.
    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

struct ClientInner {
    config: StorefrontConfig,
    transport: Arc<dyn StorefrontTransport>,
    cache: QueryCache,
    retry: RetryPolicy,
    timeout: Duration,
}

/// Storefront API client with caching and retries.
///
/// Cheap to clone; clones share the query cache.
///
/// # Example
///
/// ```rust,ignore
/// let client = StorefrontClient::new(config, Arc::new(HyperTransport::new()));
/// let data: LayoutData = client.query(LAYOUT_QUERY, QueryOptions::new()).await?;
/// ```
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<ClientInner>,
}

impl StorefrontClient {
    /// Create a client.
    pub fn new(config: StorefrontConfig, transport: Arc<dyn StorefrontTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                cache: QueryCache::new(),
                retry: RetryPolicy::default(),
                timeout: DEFAULT_QUERY_TIMEOUT,
            }),
        }
    }

    /// Set the retry policy. Call before cloning.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.retry = retry;
        }
        self
    }

    /// Set the per-attempt timeout. Call before cloning.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timeout = timeout;
        }
        self
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Locale used for `$country`/`$language` when the caller does not set them.
    pub fn i18n(&self) -> &I18n {
        &self.inner.config.i18n
    }

    /// Run a query and decode its `data` field.
    pub async fn query<T: DeserializeOwned>(
        &self,
        document: &str,
        options: QueryOptions,
    ) -> Result<T, DataError> {
        let variables = Value::Object(self.with_i18n(document, options.variables));
        let data = self.query_value(document, variables, options.cache).await?;
        serde_json::from_value(data).map_err(|e| DataError::Decode(e.to_string()))
    }

    async fn query_value(
        &self,
        document: &str,
        variables: Value,
        cache: CacheMode,
    ) -> Result<Value, DataError> {
        if !cache.is_cacheable() {
            return self.fetch(document, &variables).await;
        }

        let key = QueryCache::key(document, &variables);
        match self.inner.cache.get(&key) {
            Lookup::Fresh(value) => {
                tracing::debug!(cache = "hit", "storefront query");
                Ok(value)
            }
            Lookup::Stale(value) => {
                tracing::debug!(cache = "stale", "storefront query");
                self.revalidate(key, document.to_string(), variables, cache);
                Ok(value)
            }
            Lookup::Miss => {
                let value = self.fetch(document, &variables).await?;
                self.inner.cache.put(key, value.clone(), cache);
                Ok(value)
            }
        }
    }

    /// Refresh a stale entry in the background.
    fn revalidate(&self, key: String, document: String, variables: Value, cache: CacheMode) {
        let client = self.clone();
        tokio::spawn(async move {
            match client.fetch(&document, &variables).await {
                Ok(value) => client.inner.cache.put(key, value, cache),
                Err(e) => tracing::warn!(error = %e, "background revalidation failed"),
            }
        });
    }

    async fn fetch(&self, document: &str, variables: &Value) -> Result<Value, DataError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(document, variables).await {
                Err(e) if self.inner.retry.should_retry(&e, attempt) => {
                    let delay = self.inner.retry.backoff.delay_for_attempt(attempt);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying storefront query");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(&self, document: &str, variables: &Value) -> Result<Value, DataError> {
        let config = &self.inner.config;
        let body = serde_json::to_vec(&GraphqlRequest {
            query: document,
            variables,
        })
        .map_err(|e| DataError::Decode(e.to_string()))?;

        let request = TransportRequest {
            url: config.endpoint(),
            headers: config.headers()?,
            body: Bytes::from(body),
        };

        let response = tokio::time::timeout(self.inner.timeout, self.inner.transport.send(request))
            .await
            .map_err(|_| DataError::Timeout(self.inner.timeout))??;

        if !response.status.is_success() {
            return Err(DataError::Http {
                status: response.status.as_u16(),
            });
        }

        let parsed: GraphqlResponse = serde_json::from_slice(&response.body)
            .map_err(|e| DataError::Decode(e.to_string()))?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(DataError::Api(messages.join("; ")));
        }

        parsed
            .data
            .filter(|d| !d.is_null())
            .ok_or_else(|| DataError::Api("response contained no data".into()))
    }

    fn with_i18n(&self, document: &str, mut variables: Map<String, Value>) -> Map<String, Value> {
        let i18n = self.i18n();
        if declares_variable(document, "country") && !variables.contains_key("country") {
            variables.insert("country".into(), Value::String(i18n.country.clone()));
        }
        if declares_variable(document, "language") && !variables.contains_key("language") {
            variables.insert("language".into(), Value::String(i18n.language.clone()));
        }
        variables
    }
}

/// Whether a GraphQL document declares `$<name>`.
fn declares_variable(document: &str, name: &str) -> bool {
    static VARIABLES: OnceLock<Regex> = OnceLock::new();
    let re = VARIABLES.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"));
    re.captures_iter(document).any(|c| &c[1] == name)
}
