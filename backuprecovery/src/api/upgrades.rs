//! Cluster upgrade status

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, RequestOptions};
use super::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeInfo {
    pub cluster_id: Option<i64>,
    pub cluster_incarnation_id: Option<i64>,
    pub patch_software_version: Option<String>,
    pub software_version: Option<String>,
    pub current_version: Option<String>,
    pub current_patch_version: Option<String>,
    pub upgrade_status: Option<String>,
    #[serde(rename = "type")]
    pub upgrade_type: Option<Vec<String>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpgradesInfoResponse {
    #[serde(default)]
    upgrades_info: Option<Vec<UpgradeInfo>>,
}

pub struct UpgradesApi<'a> {
    client: &'a Client,
}

impl<'a> UpgradesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /upgrades/info
    pub async fn info(&self, cluster_identifiers: &[String]) -> Result<Vec<UpgradeInfo>, ApiError> {
        let params = ApiQueryParams::new().add_list("clusterIdentifiers", Some(cluster_identifiers));
        let response: Option<UpgradesInfoResponse> = self
            .client
            .get_with_params("/upgrades/info", &params, &RequestOptions::new())
            .await?;
        Ok(response.and_then(|r| r.upgrades_info).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::auth::BearerAuthenticator;
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    #[tokio::test]
    async fn info_filters_by_cluster_identifier() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/upgrades/info")
            .match_query(Matcher::UrlEncoded(
                "clusterIdentifiers".into(),
                "8841:17".into(),
            ))
            .with_body(
                r#"{"upgradesInfo":[{"clusterId":8841,"clusterIncarnationId":17,
                    "softwareVersion":"7.1.2","upgradeStatus":"InProgress","type":["Upgrade"]}]}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Arc::new(BearerAuthenticator::new("tok"))).unwrap();
        let info = client
            .upgrades()
            .info(&["8841:17".to_string()])
            .await
            .unwrap();

        assert_eq!(info.len(), 1);
        assert_eq!(info[0].upgrade_status.as_deref(), Some("InProgress"));
        assert_eq!(info[0].upgrade_type.as_deref(), Some(&["Upgrade".to_string()][..]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn info_without_filter_sends_no_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/upgrades/info")
            .match_query(Matcher::Missing)
            .with_body("{}")
            .create_async()
            .await;

        let client = Client::new(&server.url(), Arc::new(BearerAuthenticator::new("tok"))).unwrap();
        assert!(client.upgrades().info(&[]).await.unwrap().is_empty());
        mock.assert_async().await;
    }
}
