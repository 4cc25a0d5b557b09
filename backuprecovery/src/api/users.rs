//! Connector user API implementation
//!
//! The connector authenticates with the session cookie of a logged-in user
//! instead of an IAM token alone.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, RequestOptions};
use super::error::ApiError;

/// A local or directory user on the connector; also the body of PUT /users
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_group_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_account_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time_msecs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_time_msecs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_time_msecs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_time_msecs: Option<i64>,
}

/// Filters for GET /users
#[derive(Debug, Clone, Default)]
pub struct ListUsersParams {
    pub tenant_ids: Option<Vec<String>>,
    pub all_under_hierarchy: Option<bool>,
    pub usernames: Option<Vec<String>>,
    pub email_addresses: Option<Vec<String>>,
    pub domain: Option<String>,
    pub partial_match: Option<bool>,
}

impl ListUsersParams {
    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_list("tenantIds", self.tenant_ids.as_deref())
            .add_optional("allUnderHierarchy", self.all_under_hierarchy)
            .add_list("usernames", self.usernames.as_deref())
            .add_list("emailAddresses", self.email_addresses.as_deref())
            .add_optional("domain", self.domain.as_deref())
            .add_optional("partialMatch", self.partial_match)
    }
}

pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /users
    pub async fn list(
        &self,
        session_cookie: &str,
        params: &ListUsersParams,
    ) -> Result<Vec<UserDetails>, ApiError> {
        let users: Option<Vec<UserDetails>> = self
            .client
            .get_with_params("/users", &params.to_query(), &RequestOptions::session(session_cookie))
            .await?;
        Ok(users.unwrap_or_default())
    }

    /// PUT /users
    pub async fn update(
        &self,
        session_cookie: &str,
        user: &UserDetails,
    ) -> Result<UserDetails, ApiError> {
        self.client
            .put("/users", user, &RequestOptions::session(session_cookie))
            .await
    }
}
