//! Alert resolution API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, RequestOptions};
use super::error::ApiError;

const RESOLUTIONS_PATH: &str = "/alert-resolutions";

/// Body of POST /alert-resolutions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertResolutionRequest {
    pub alert_id_list: Vec<String>,
    pub resolution_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResolution {
    pub resolution_id: Option<String>,
    pub resolution_summary: Option<String>,
    pub resolution_details: Option<String>,
    pub timestamp_usecs: Option<i64>,
    pub user_name: Option<String>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub alert_id_list: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertResolutionList {
    #[serde(default)]
    alert_resolutions: Option<Vec<AlertResolution>>,
}

#[derive(Debug, Clone, Default)]
pub struct ListAlertResolutionsParams {
    pub max_resolutions: Option<i64>,
    pub resolution_ids: Option<Vec<String>>,
    pub alert_ids: Option<Vec<String>>,
    pub scope_identifier: Option<String>,
}

impl ListAlertResolutionsParams {
    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional("maxResolutions", self.max_resolutions)
            .add_list("resolutionIds", self.resolution_ids.as_deref())
            .add_list("alertIds", self.alert_ids.as_deref())
    }
}

pub struct AlertResolutionsApi<'a> {
    client: &'a Client,
}

impl<'a> AlertResolutionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /alert-resolutions
    pub async fn create(
        &self,
        scope_identifier: &str,
        request: &CreateAlertResolutionRequest,
    ) -> Result<AlertResolution, ApiError> {
        self.client
            .post(RESOLUTIONS_PATH, request, &RequestOptions::scope(scope_identifier))
            .await
    }

    /// GET /alert-resolutions/{id}
    pub async fn get(&self, scope_identifier: &str, id: &str) -> Result<AlertResolution, ApiError> {
        let path = format!("{}/{}", RESOLUTIONS_PATH, id);
        self.client
            .get(&path, &RequestOptions::scope(scope_identifier))
            .await
    }

    /// GET /alert-resolutions
    pub async fn list(
        &self,
        params: &ListAlertResolutionsParams,
    ) -> Result<Vec<AlertResolution>, ApiError> {
        let options = RequestOptions {
            scope_identifier: params.scope_identifier.clone(),
            ..Default::default()
        };
        let response: Option<AlertResolutionList> = self
            .client
            .get_with_params(RESOLUTIONS_PATH, &params.to_query(), &options)
            .await?;
        Ok(response.and_then(|r| r.alert_resolutions).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::auth::BearerAuthenticator;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    fn client(url: &str) -> Client {
        Client::new(url, Arc::new(BearerAuthenticator::new("tok"))).unwrap()
    }

    #[tokio::test]
    async fn create_posts_alert_ids() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/alert-resolutions")
            .match_header("x-scope-identifier", "scope-1")
            .match_body(Matcher::Json(serde_json::json!({
                "alertIdList": ["a-1", "a-2"],
                "resolutionSummary": "disk replaced"
            })))
            .with_body(
                r#"{"resolutionId":"r-9","resolutionSummary":"disk replaced",
                    "timestampUsecs":1700000000000000,"createdBy":"admin",
                    "alertIdList":["a-1","a-2"]}"#,
            )
            .create_async()
            .await;

        let resolution = client(&server.url())
            .alert_resolutions()
            .create(
                "scope-1",
                &CreateAlertResolutionRequest {
                    alert_id_list: vec!["a-1".to_string(), "a-2".to_string()],
                    resolution_summary: "disk replaced".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(resolution.resolution_id.as_deref(), Some("r-9"));
        assert_eq!(resolution.created_by.as_deref(), Some("admin"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_reads_alert_resolutions_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/alert-resolutions")
            .match_query(Matcher::UrlEncoded("maxResolutions".into(), "5".into()))
            .with_body(r#"{"alertResolutions":[{"resolutionId":"r-1"},{"resolutionId":"r-2"}]}"#)
            .create_async()
            .await;

        let resolutions = client(&server.url())
            .alert_resolutions()
            .list(&ListAlertResolutionsParams {
                max_resolutions: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resolutions.len(), 2);
        assert!(resolutions[1].alert_id_list.is_empty());
    }
}
