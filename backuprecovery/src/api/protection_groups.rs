//! Protection group API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, KeyValuePair, RequestOptions};
use super::error::ApiError;

const GROUPS_PATH: &str = "/data-protect/protection-groups";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    pub hour: i64,
    pub minute: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTarget {
    pub email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingPolicy {
    #[serde(default)]
    pub backup_run_status: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_targets: Option<Vec<AlertTarget>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raise_object_level_failure_alert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raise_object_level_failure_alert_after_last_attempt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raise_object_level_failure_alert_after_each_attempt: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_run_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePath {
    pub included_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_nested_volumes: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProtectionObject {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_paths: Option<Vec<FilePath>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProtectionTypeParams {
    #[serde(default)]
    pub objects: Vec<FileProtectionObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProtectionObject {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_guids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_system_backup: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProtectionTypeParams {
    #[serde(default)]
    pub objects: Vec<VolumeProtectionObject>,
}

/// `protectionType` selects which of the two parameter sets is used
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalParams {
    pub protection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_protection_type_params: Option<FileProtectionTypeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_protection_type_params: Option<VolumeProtectionTypeParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleDatabaseHost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

/// RMAN channel layout for one database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleDbChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_log_retention_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_log_retention_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_unique_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_channel_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_node_list: Option<Vec<OracleDatabaseHost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_host_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dg_primary_backup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rman_backup_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleDbParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_channels: Option<Vec<OracleDbChannel>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleProtectionObject {
    pub source_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_params: Option<Vec<OracleDbParams>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_vlan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleParams {
    #[serde(default)]
    pub objects: Vec<OracleProtectionObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_mountpoints: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_params: Option<VlanParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_auto_kill_timeout_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incr_auto_kill_timeout_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_auto_kill_timeout_secs: Option<i64>,
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtectionGroupRequest {
    pub name: String,
    pub policy_id: String,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_domain_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time_usecs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_policy: Option<AlertingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<Vec<SlaRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_in_blackouts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_in_blackouts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_configs: Option<Vec<KeyValuePair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_params: Option<PhysicalParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_params: Option<OracleParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_source_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub permission_type: Option<String>,
}

/// A protection group as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionGroup {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_protect_once: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_protected_objects: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_timestamp_usecs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_entities: Option<Vec<MissingEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_entities: Option<Vec<MissingEntity>>,
    #[serde(flatten)]
    pub spec: ProtectionGroupRequest,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectionGroupList {
    #[serde(default)]
    protection_groups: Option<Vec<ProtectionGroup>>,
}

/// Filters for GET /data-protect/protection-groups
#[derive(Debug, Clone, Default)]
pub struct ListProtectionGroupsParams {
    pub ids: Option<Vec<String>>,
    pub names: Option<Vec<String>>,
    pub policy_ids: Option<Vec<String>>,
    pub environments: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_deleted: Option<bool>,
    pub is_paused: Option<bool>,
}

impl ListProtectionGroupsParams {
    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_list("ids", self.ids.as_deref())
            .add_list("names", self.names.as_deref())
            .add_list("policyIds", self.policy_ids.as_deref())
            .add_list("environments", self.environments.as_deref())
            .add_optional("isActive", self.is_active)
            .add_optional("isDeleted", self.is_deleted)
            .add_optional("isPaused", self.is_paused)
    }
}

/// Protection groups API, scoped per tenant
pub struct ProtectionGroupsApi<'a> {
    client: &'a Client,
}

impl<'a> ProtectionGroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /data-protect/protection-groups
    pub async fn create(
        &self,
        tenant_id: &str,
        request: &ProtectionGroupRequest,
    ) -> Result<ProtectionGroup, ApiError> {
        self.client
            .post(GROUPS_PATH, request, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// GET /data-protect/protection-groups/{id}
    pub async fn get(&self, tenant_id: &str, id: &str) -> Result<ProtectionGroup, ApiError> {
        let path = format!("{}/{}", GROUPS_PATH, id);
        self.client
            .get(&path, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// PUT /data-protect/protection-groups/{id}
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        request: &ProtectionGroupRequest,
    ) -> Result<ProtectionGroup, ApiError> {
        let path = format!("{}/{}", GROUPS_PATH, id);
        self.client
            .put(&path, request, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// DELETE /data-protect/protection-groups/{id}
    pub async fn delete(&self, tenant_id: &str, id: &str) -> Result<(), ApiError> {
        let path = format!("{}/{}", GROUPS_PATH, id);
        self.client
            .delete::<serde_json::Value>(&path, &RequestOptions::tenant(tenant_id))
            .await
            .map(|_| ())
    }

    /// GET /data-protect/protection-groups
    pub async fn list(
        &self,
        tenant_id: &str,
        params: &ListProtectionGroupsParams,
    ) -> Result<Vec<ProtectionGroup>, ApiError> {
        let response: Option<ProtectionGroupList> = self
            .client
            .get_with_params(GROUPS_PATH, &params.to_query(), &RequestOptions::tenant(tenant_id))
            .await?;
        Ok(response
            .and_then(|r| r.protection_groups)
            .unwrap_or_default())
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

    fn file_group() -> ProtectionGroupRequest {
        ProtectionGroupRequest {
            name: "daily-files".to_string(),
            policy_id: "policy-1".to_string(),
            environment: "kPhysical".to_string(),
            start_time: Some(TimeOfDay {
                hour: 2,
                minute: 30,
                time_zone: Some("America/Los_Angeles".to_string()),
            }),
            physical_params: Some(PhysicalParams {
                protection_type: "kFile".to_string(),
                file_protection_type_params: Some(FileProtectionTypeParams {
                    objects: vec![FileProtectionObject {
                        id: 17,
                        name: None,
                        file_paths: Some(vec![FilePath {
                            included_path: "/var/data".to_string(),
                            excluded_paths: Some(vec!["/var/data/tmp".to_string()]),
                            skip_nested_volumes: Some(true),
                        }]),
                    }],
                }),
                volume_protection_type_params: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn request_serializes_camel_case_and_skips_unset() {
        let body = serde_json::to_value(file_group()).unwrap();
        assert_eq!(body["policyId"], "policy-1");
        assert_eq!(body["startTime"]["timeZone"], "America/Los_Angeles");
        assert_eq!(
            body["physicalParams"]["fileProtectionTypeParams"]["objects"][0]["filePaths"][0]
                ["skipNestedVolumes"],
            true
        );
        assert!(body.get("description").is_none());
        assert!(body["physicalParams"].get("volumeProtectionTypeParams").is_none());
    }

    #[tokio::test]
    async fn create_sends_tenant_header_and_parses_group() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/data-protect/protection-groups")
            .match_header("x-ibm-tenant-id", "tenant-a/")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "daily-files",
                "environment": "kPhysical"
            })))
            .with_body(
                r#"{"id":"5:1:42","clusterId":"5","name":"daily-files","policyId":"policy-1",
                    "environment":"kPhysical","isActive":true,"numProtectedObjects":1,
                    "permissions":[{"id":"t1","name":"tenant","type":"tenant"}]}"#,
            )
            .create_async()
            .await;

        let group = client(&server.url())
            .protection_groups()
            .create("tenant-a/", &file_group())
            .await
            .unwrap();

        assert_eq!(group.id, "5:1:42");
        assert_eq!(group.spec.name, "daily-files");
        assert_eq!(group.is_active, Some(true));
        assert_eq!(
            group.permissions.unwrap()[0].permission_type.as_deref(),
            Some("tenant")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_applies_filters_and_tolerates_missing_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/data-protect/protection-groups")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("environments".into(), "kPhysical".into()),
                Matcher::UrlEncoded("isPaused".into(), "false".into()),
            ]))
            .with_body("{}")
            .create_async()
            .await;

        let params = ListProtectionGroupsParams {
            environments: Some(vec!["kPhysical".to_string()]),
            is_paused: Some(false),
            ..Default::default()
        };
        let groups = client(&server.url())
            .protection_groups()
            .list("tenant-a/", &params)
            .await
            .unwrap();
        assert!(groups.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_of_missing_group_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/data-protect/protection-groups/5:1:42")
            .with_status(404)
            .with_body(r#"{"errorCode":"KStatusNotFound","message":"not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .protection_groups()
            .get("tenant-a/", "5:1:42")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
