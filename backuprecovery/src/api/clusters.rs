//! Cluster inventory for the manager instance

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::RequestOptions;
use super::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableReleaseVersion {
    pub version: Option<String>,
    pub release_type: Option<String>,
    pub release_stage: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub cluster_id: Option<i64>,
    pub cluster_incarnation_id: Option<i64>,
    pub cluster_name: Option<String>,
    pub current_version: Option<String>,
    pub current_patch_version: Option<String>,
    pub health: Option<String>,
    pub is_connected_to_helios: Option<bool>,
    pub location: Option<String>,
    pub multi_tenancy_enabled: Option<bool>,
    pub node_ips: Option<Vec<String>>,
    pub number_of_nodes: Option<i64>,
    pub provider_type: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub cluster_type: Option<String>,
    pub total_capacity: Option<i64>,
    pub used_capacity: Option<i64>,
    pub target_version: Option<String>,
    pub update_type: Option<String>,
    pub available_versions: Option<Vec<AvailableReleaseVersion>>,
}

/// A cluster running on the service's own infrastructure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpClusterInfo {
    pub cluster_id: Option<i64>,
    pub cluster_incarnation_id: Option<i64>,
    pub cluster_name: Option<String>,
    pub current_version: Option<String>,
    pub health: Option<String>,
    pub is_connected_to_helios: Option<bool>,
    pub moved_to_sp: Option<bool>,
    pub node_ips: Option<Vec<String>>,
    pub number_of_nodes: Option<i64>,
    pub provider_type: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub cluster_type: Option<String>,
    pub total_capacity: Option<i64>,
    pub used_capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDetails {
    pub cohesity_clusters: Vec<ClusterInfo>,
    pub sp_clusters: Vec<SpClusterInfo>,
}

pub struct ClustersApi<'a> {
    client: &'a Client,
}

impl<'a> ClustersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /clusters/info
    pub async fn info(&self) -> Result<ClusterDetails, ApiError> {
        let details: Option<ClusterDetails> = self
            .client
            .get("/clusters/info", &RequestOptions::new())
            .await?;
        Ok(details.unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::auth::BearerAuthenticator;
    use mockito::Server;
    use std::sync::Arc;

    #[tokio::test]
    async fn info_splits_cluster_kinds() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/clusters/info")
            .with_body(
                r#"{
                    "cohesityClusters": [{
                        "clusterId": 8841, "clusterName": "onprem-a", "numberOfNodes": 4,
                        "nodeIps": ["10.0.0.1", "10.0.0.2"], "type": "Physical",
                        "availableVersions": [{"version": "7.2.1", "releaseType": "LTS"}]
                    }],
                    "spClusters": [{"clusterId": 99, "movedToSp": true, "status": "Active"}]
                }"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), Arc::new(BearerAuthenticator::new("tok"))).unwrap();
        let details = client.clusters().info().await.unwrap();

        let onprem = &details.cohesity_clusters[0];
        assert_eq!(onprem.cluster_type.as_deref(), Some("Physical"));
        assert_eq!(onprem.node_ips.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            onprem.available_versions.as_ref().unwrap()[0].release_type.as_deref(),
            Some("LTS")
        );
        assert_eq!(details.sp_clusters[0].moved_to_sp, Some(true));
    }

    #[tokio::test]
    async fn missing_lists_default_to_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/clusters/info")
            .with_body(r#"{"spClusters": []}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), Arc::new(BearerAuthenticator::new("tok"))).unwrap();
        let details = client.clusters().info().await.unwrap();
        assert!(details.cohesity_clusters.is_empty());
    }
}
