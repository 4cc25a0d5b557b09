use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use super::auth::Authenticator;
use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams, RequestOptions};
use super::endpoints;
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager};

pub const TENANT_HEADER: &str = "X-IBM-Tenant-Id";
pub const SCOPE_HEADER: &str = "X-Scope-Identifier";

/// Backup Recovery API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    authenticator: Arc<dyn Authenticator>,
    retry_config: RetryConfig,
    pool_manager: ConnectionPoolManager,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, authenticator: Arc<dyn Authenticator>) -> Result<Self, ApiError> {
        Self::with_config(endpoint, authenticator, RetryConfig::default(), false)
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        endpoint: &str,
        authenticator: Arc<dyn Authenticator>,
        retry_config: RetryConfig,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        endpoints::validate(endpoint)?;

        let pool_config = ConnectionPoolConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            insecure,
            ..Default::default()
        };
        let pool_manager = ConnectionPoolManager::new(pool_config);
        let http_client = pool_manager.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                authenticator,
                retry_config,
                pool_manager,
            }),
        })
    }

    /// A client for another instance that shares this client's connections,
    /// credentials and retry settings
    pub fn with_base_url(&self, endpoint: &str) -> Result<Self, ApiError> {
        endpoints::validate(endpoint)?;
        let base_url = endpoint.trim_end_matches('/').to_string();
        if base_url == self.inner.base_url {
            return Ok(self.clone());
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client: self.inner.http_client.clone(),
                base_url,
                authenticator: self.inner.authenticator.clone(),
                retry_config: self.inner.retry_config.clone(),
                pool_manager: self.inner.pool_manager.clone(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
        token: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} request to: {}", method, url);

        let mut builder = self
            .inner
            .http_client
            .request(method, &url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");

        if let Some(tenant) = &options.tenant_id {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        if let Some(scope) = &options.scope_identifier {
            builder = builder.header(SCOPE_HEADER, scope);
        }
        if let Some(session) = &options.session_cookie {
            builder = builder.header(COOKIE, format!("session_name={}", session));
        }
        builder
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            |token| async move { self.request(Method::GET, path, options, &token).send().await },
            path,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path, options).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            |token| async move {
                self.request(Method::POST, path, options, &token)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            |token| async move {
                self.request(Method::PUT, path, options, &token)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            |token| async move {
                self.request(Method::PATCH, path, options, &token)
                    .json(body)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            |token| async move {
                self.request(Method::DELETE, path, options, &token)
                    .send()
                    .await
            },
            path,
        )
        .await
    }

    /// Get connection pool statistics
    pub async fn get_connection_stats(&self) -> super::pool::ConnectionStats {
        self.inner.pool_manager.get_stats().await
    }

    pub fn protection_groups(&self) -> crate::api::protection_groups::ProtectionGroupsApi<'_> {
        crate::api::protection_groups::ProtectionGroupsApi::new(self)
    }

    pub fn sources(&self) -> crate::api::sources::SourcesApi<'_> {
        crate::api::sources::SourcesApi::new(self)
    }

    pub fn alerts(&self) -> crate::api::alerts::AlertsApi<'_> {
        crate::api::alerts::AlertsApi::new(self)
    }

    pub fn alert_resolutions(&self) -> crate::api::alert_resolutions::AlertResolutionsApi<'_> {
        crate::api::alert_resolutions::AlertResolutionsApi::new(self)
    }

    pub fn upgrades(&self) -> crate::api::upgrades::UpgradesApi<'_> {
        crate::api::upgrades::UpgradesApi::new(self)
    }

    pub fn clusters(&self) -> crate::api::clusters::ClustersApi<'_> {
        crate::api::clusters::ClustersApi::new(self)
    }

    pub fn users(&self) -> crate::api::users::UsersApi<'_> {
        crate::api::users::UsersApi::new(self)
    }

    /// Execute request with retry logic. The closure receives a fresh bearer
    /// token on every attempt.
    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, path: &str) -> Result<T, ApiError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;
        let mut last_error = None;
        let mut reauthenticated = false;

        while attempt <= retry.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::warn!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                self.inner.pool_manager.record_retry().await;
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let token = self.inner.authenticator.token().await?;

            match request_fn(token).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.pool_manager.record_request(true).await;
                        return self.parse_success_response(response).await;
                    }

                    self.inner.pool_manager.record_request(false).await;

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        // one retry with a new token, outside the backoff budget
                        if !reauthenticated {
                            reauthenticated = true;
                            self.inner.authenticator.invalidate().await;
                            continue;
                        }
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::AuthError(text));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    self.inner.pool_manager.record_request(false).await;

                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(retry.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; an empty body reads as JSON null
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (message, details) = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => (
                err_resp.message.clone().unwrap_or_else(|| text.clone()),
                Some(Box::new(ApiErrorDetails {
                    error_code: err_resp.error_code,
                    message: err_resp.message,
                })),
            ),
            Err(_) => (text, None),
        };

        Err(ApiError::ApiError {
            status,
            message,
            details,
        })
    }
}
