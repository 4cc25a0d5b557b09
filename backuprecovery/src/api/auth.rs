//! IBM Cloud IAM authentication

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::ApiError;

pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
/// Tokens are refreshed this many seconds before they expire
const REFRESH_MARGIN_SECS: i64 = 60;

/// Supplies the bearer token for every API request
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;

    /// Drops any cached token after the service rejected it
    async fn invalidate(&self) {}
}

/// A pre-issued token used as is
pub struct BearerAuthenticator {
    token: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let token = token
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or(token);
        Self { token }
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    /// Unix seconds
    expiration: Option<i64>,
    expires_in: Option<i64>,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Exchanges an API key for IAM access tokens, caching each until shortly
/// before it expires
pub struct IamAuthenticator {
    http_client: reqwest::Client,
    iam_url: String,
    api_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl IamAuthenticator {
    pub fn new(http_client: reqwest::Client, iam_url: &str, api_key: &str) -> Self {
        Self {
            http_client,
            iam_url: iam_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<CachedToken, ApiError> {
        let url = format!("{}/identity/token", self.iam_url);
        tracing::debug!("requesting IAM token from {}", url);

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::AuthError(format!(
                "IAM token request failed (HTTP {}): {}",
                status.as_u16(),
                text
            )));
        }

        let body: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AuthError(format!("invalid IAM token response: {}", e)))?;

        let now = chrono::Utc::now().timestamp();
        let expires_at = body
            .expiration
            .or_else(|| body.expires_in.map(|secs| now + secs))
            .unwrap_or(now);

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl Authenticator for IamAuthenticator {
    async fn token(&self) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - REFRESH_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn iam_token_is_cached_until_near_expiry() {
        let mut server = Server::new_async().await;
        let expiration = chrono::Utc::now().timestamp() + 3600;
        let mock = server
            .mock("POST", "/identity/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), APIKEY_GRANT_TYPE.into()),
                Matcher::UrlEncoded("apikey".into(), "my-key".into()),
            ]))
            .with_body(format!(
                r#"{{"access_token":"tok-1","expiration":{},"expires_in":3600}}"#,
                expiration
            ))
            .expect(1)
            .create_async()
            .await;

        let auth = IamAuthenticator::new(reqwest::Client::new(), &server.url(), "my-key");
        assert_eq!(auth.token().await.unwrap(), "tok-1");
        assert_eq!(auth.token().await.unwrap(), "tok-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed() {
        let mut server = Server::new_async().await;
        let soon = chrono::Utc::now().timestamp() + 30;
        let mock = server
            .mock("POST", "/identity/token")
            .with_body(format!(r#"{{"access_token":"short","expiration":{}}}"#, soon))
            .expect(2)
            .create_async()
            .await;

        let auth = IamAuthenticator::new(reqwest::Client::new(), &server.url(), "my-key");
        auth.token().await.unwrap();
        auth.token().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_api_key_is_an_auth_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/identity/token")
            .with_status(400)
            .with_body(r#"{"errorCode":"BXNIM0415E","errorMessage":"Provided API key could not be found"}"#)
            .create_async()
            .await;

        let auth = IamAuthenticator::new(reqwest::Client::new(), &server.url(), "bad");
        match auth.token().await {
            Err(ApiError::AuthError(msg)) => assert!(msg.contains("HTTP 400")),
            other => panic!("expected AuthError, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn bearer_prefix_is_stripped() {
        let auth = BearerAuthenticator::new("Bearer abc");
        assert_eq!(auth.token().await.unwrap(), "abc");
    }
}
