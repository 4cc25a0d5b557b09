//! Source registration API implementation

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiQueryParams, KeyValuePair, RequestOptions};
use super::error::ApiError;

const REGISTRATIONS_PATH: &str = "/data-protect/sources/registrations";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_connection_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalSourceParams {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_register: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<String>>,
}

/// Body of register and update requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRegistrationRequest {
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_internal_encrypted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<ConnectionConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_configs: Option<Vec<KeyValuePair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_params: Option<PhysicalSourceParams>,
}

/// Body of PATCH, which only moves a registration to another environment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSourceRegistrationRequest {
    pub environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// A source registration as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRegistration {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
    #[serde(flatten)]
    pub spec: SourceRegistrationRequest,
}

#[derive(Debug, Default, Deserialize)]
struct SourceRegistrationList {
    #[serde(default)]
    registrations: Option<Vec<SourceRegistration>>,
}

/// Filters for GET /data-protect/sources/registrations
#[derive(Debug, Clone, Default)]
pub struct ListSourceRegistrationsParams {
    pub ids: Option<Vec<i64>>,
    pub include_source_credentials: Option<bool>,
    pub encryption_key: Option<String>,
    pub use_cached_data: Option<bool>,
    pub include_external_metadata: Option<bool>,
    pub ignore_tenant_migration_in_progress_check: Option<bool>,
}

impl ListSourceRegistrationsParams {
    fn to_query(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_list("ids", self.ids.as_deref())
            .add_optional("includeSourceCredentials", self.include_source_credentials)
            .add_optional("encryptionKey", self.encryption_key.as_deref())
            .add_optional("useCachedData", self.use_cached_data)
            .add_optional("includeExternalMetadata", self.include_external_metadata)
            .add_optional(
                "ignoreTenantMigrationInProgressCheck",
                self.ignore_tenant_migration_in_progress_check,
            )
    }
}

pub struct SourcesApi<'a> {
    client: &'a Client,
}

impl<'a> SourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /data-protect/sources/registrations
    pub async fn register(
        &self,
        tenant_id: &str,
        request: &SourceRegistrationRequest,
    ) -> Result<SourceRegistration, ApiError> {
        self.client
            .post(REGISTRATIONS_PATH, request, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// GET /data-protect/sources/registrations/{id}
    pub async fn get(&self, tenant_id: &str, id: i64) -> Result<SourceRegistration, ApiError> {
        let path = format!("{}/{}", REGISTRATIONS_PATH, id);
        self.client
            .get(&path, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// PUT /data-protect/sources/registrations/{id}
    pub async fn update(
        &self,
        tenant_id: &str,
        id: i64,
        request: &SourceRegistrationRequest,
    ) -> Result<SourceRegistration, ApiError> {
        let path = format!("{}/{}", REGISTRATIONS_PATH, id);
        self.client
            .put(&path, request, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// PATCH /data-protect/sources/registrations/{id}
    pub async fn patch(
        &self,
        tenant_id: &str,
        id: i64,
        request: &PatchSourceRegistrationRequest,
    ) -> Result<SourceRegistration, ApiError> {
        let path = format!("{}/{}", REGISTRATIONS_PATH, id);
        self.client
            .patch(&path, request, &RequestOptions::tenant(tenant_id))
            .await
    }

    /// DELETE /data-protect/sources/registrations/{id}
    pub async fn delete(&self, tenant_id: &str, id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", REGISTRATIONS_PATH, id);
        self.client
            .delete::<serde_json::Value>(&path, &RequestOptions::tenant(tenant_id))
            .await
            .map(|_| ())
    }

    /// GET /data-protect/sources/registrations
    pub async fn list(
        &self,
        tenant_id: &str,
        params: &ListSourceRegistrationsParams,
    ) -> Result<Vec<SourceRegistration>, ApiError> {
        let response: Option<SourceRegistrationList> = self
            .client
            .get_with_params(
                REGISTRATIONS_PATH,
                &params.to_query(),
                &RequestOptions::tenant(tenant_id),
            )
            .await?;
        Ok(response.and_then(|r| r.registrations).unwrap_or_default())
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

    const REGISTRATION: &str = r#"{
        "id": 12,
        "sourceId": 300,
        "sourceInfo": {"id": 300, "name": "db-host-01", "environment": "kPhysical"},
        "environment": "kPhysical",
        "name": "db-host-01",
        "connectionId": 5128356219792164864,
        "physicalParams": {"endpoint": "10.0.0.5", "hostType": "kLinux", "physicalType": "kHost"}
    }"#;

    #[tokio::test]
    async fn register_returns_source_info() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/data-protect/sources/registrations")
            .match_header("x-ibm-tenant-id", "tenant-a/")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "environment": "kPhysical",
                "physicalParams": {"endpoint": "10.0.0.5"}
            })))
            .with_body(REGISTRATION)
            .create_async()
            .await;

        let request = SourceRegistrationRequest {
            environment: "kPhysical".to_string(),
            connection_id: Some(5128356219792164864),
            physical_params: Some(PhysicalSourceParams {
                endpoint: "10.0.0.5".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let registration = client(&server.url())
            .sources()
            .register("tenant-a/", &request)
            .await
            .unwrap();

        assert_eq!(registration.id, 12);
        assert_eq!(registration.source_id, Some(300));
        assert_eq!(
            registration.source_info.unwrap().name.as_deref(),
            Some("db-host-01")
        );
        assert_eq!(
            registration.spec.physical_params.unwrap().host_type.as_deref(),
            Some("kLinux")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn patch_sends_only_environment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/data-protect/sources/registrations/12")
            .match_body(Matcher::Json(serde_json::json!({"environment": "kSQL"})))
            .with_body(REGISTRATION)
            .create_async()
            .await;

        client(&server.url())
            .sources()
            .patch(
                "tenant-a/",
                12,
                &PatchSourceRegistrationRequest {
                    environment: "kSQL".to_string(),
                },
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_reads_registrations_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/data-protect/sources/registrations")
            .match_query(Matcher::UrlEncoded("ids".into(), "12,13".into()))
            .with_body(format!(r#"{{"registrations":[{}]}}"#, REGISTRATION))
            .create_async()
            .await;

        let params = ListSourceRegistrationsParams {
            ids: Some(vec![12, 13]),
            ..Default::default()
        };
        let registrations = client(&server.url())
            .sources()
            .list("tenant-a/", &params)
            .await
            .unwrap();
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].spec.connection_id, Some(5128356219792164864));
    }
}
