pub mod api;
pub mod data_sources;
pub mod logging;
pub mod provider_data;
pub mod resources;

pub use provider_data::BackupRecoveryProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue, ServerCapabilities};
use tfplug::validator::{NumberRangeValidator, StringOneOf};

use api::pool::{ConnectionPoolConfig, ConnectionPoolManager};
use api::{
    endpoints, Authenticator, BearerAuthenticator, Client, EndpointType, IamAuthenticator,
    RetryConfig, DEFAULT_IAM_URL,
};

pub const PROVIDER_TYPE_NAME: &str = "ibm";

#[derive(Default)]
pub struct BackupRecoveryProvider {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl BackupRecoveryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_data(&self) -> Option<&BackupRecoveryProviderData> {
        self.provider_data.as_ref()
    }
}

/// A provider setting from config, falling back to the first env var set
fn setting(config: &DynamicValue, name: &str, env_vars: &[&str]) -> Option<String> {
    config
        .get_string_opt(&AttributePath::new(name))
        .filter(|v| !v.is_empty())
        .or_else(|| {
            env_vars
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        })
}

fn provider_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Provider for the IBM Backup Recovery service")
        .attribute(
            AttributeBuilder::string("ibmcloud_api_key")
                .description("IBM Cloud API key, exchanged for IAM tokens")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("iam_token")
                .description("IAM access token used as is instead of an API key")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("iam_url")
                .description("IAM token service URL")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("endpoint")
                .description("Backup Recovery service URL")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("instance_id")
                .description("Backup Recovery instance ID, used with region when no endpoint is set")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::string("region").optional().build())
        .attribute(
            AttributeBuilder::string("endpoint_type")
                .description("public or private")
                .optional()
                .validator(StringOneOf::create(&["public", "private"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("manager_endpoint")
                .description("Manager URL for alerts, upgrades and cluster info")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("connector_endpoint")
                .description("Data source connector URL")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::number("max_retries")
                .optional()
                .validator(NumberRangeValidator::between(0.0, 10.0))
                .build(),
        )
        .attribute(
            AttributeBuilder::number("timeout_seconds")
                .optional()
                .validator(NumberRangeValidator::between(1.0, 3600.0))
                .build(),
        )
        .attribute(
            AttributeBuilder::bool("insecure")
                .description("Skip TLS certificate verification")
                .optional()
                .build(),
        )
        .build()
}

enum Credentials {
    Token(String),
    ApiKey(String),
}

fn build_provider_data(config: &DynamicValue) -> Result<BackupRecoveryProviderData, Diagnostic> {
    let api_key = setting(config, "ibmcloud_api_key", &["IBMCLOUD_API_KEY", "IC_API_KEY"]);
    let iam_token = setting(config, "iam_token", &["IBMCLOUD_IAM_TOKEN"]);
    let credentials = match (iam_token, api_key) {
        (Some(token), _) => Credentials::Token(token),
        (None, Some(api_key)) => Credentials::ApiKey(api_key),
        (None, None) => {
            return Err(Diagnostic::error(
                "ibmcloud_api_key is required (set in provider config or IBMCLOUD_API_KEY env var)",
                "Either ibmcloud_api_key or iam_token must be set",
            ))
        }
    };

    let endpoint_type = match setting(config, "endpoint_type", &["IBMCLOUD_ENDPOINT_TYPE"]) {
        Some(value) => value.parse::<EndpointType>().map_err(|e| {
            Diagnostic::error("Invalid endpoint_type", e.to_string())
                .with_attribute(AttributePath::new("endpoint_type"))
        })?,
        None => EndpointType::default(),
    };

    let endpoint = setting(config, "endpoint", &["IBMCLOUD_BACKUP_RECOVERY_ENDPOINT"]);
    let instance_id = setting(
        config,
        "instance_id",
        &["IBMCLOUD_BACKUP_RECOVERY_INSTANCE_ID"],
    );
    let region = setting(config, "region", &["IBMCLOUD_REGION"]);
    let endpoint = endpoints::resolve(
        endpoint.as_deref(),
        instance_id.as_deref(),
        region.as_deref(),
        endpoint_type,
    )
    .map_err(|e| {
        Diagnostic::error(
            "endpoint is required (set in provider config or IBMCLOUD_BACKUP_RECOVERY_ENDPOINT env var)",
            e.to_string(),
        )
    })?;

    let mut retry_config = RetryConfig::default();
    if let Some(retries) = config.get_i64_opt(&AttributePath::new("max_retries")) {
        retry_config.max_retries = retries.max(0) as u32;
    }
    if let Some(timeout) = config.get_i64_opt(&AttributePath::new("timeout_seconds")) {
        retry_config.timeout_seconds = timeout.max(1) as u64;
    }
    let insecure = config
        .get_bool_opt(&AttributePath::new("insecure"))
        .unwrap_or(false);

    let authenticator: Arc<dyn Authenticator> = match credentials {
        Credentials::Token(token) => Arc::new(BearerAuthenticator::new(token)),
        Credentials::ApiKey(api_key) => {
            let iam_url = setting(config, "iam_url", &["IBMCLOUD_IAM_API_ENDPOINT"])
                .unwrap_or_else(|| DEFAULT_IAM_URL.to_string());
            let http_client = ConnectionPoolManager::new(ConnectionPoolConfig {
                request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
                ..Default::default()
            })
            .build_client()
            .map_err(|e| Diagnostic::error("Failed to create IAM client", e.to_string()))?;
            Arc::new(IamAuthenticator::new(http_client, &iam_url, &api_key))
        }
    };

    let client = Client::with_config(&endpoint, authenticator, retry_config, insecure)
        .map_err(|e| Diagnostic::error("Failed to create API client", e.to_string()))?;

    let derived = |name: &str, env_var: &str| -> Result<Client, Diagnostic> {
        match setting(config, name, &[env_var]) {
            Some(url) => client.with_base_url(&url).map_err(|e| {
                Diagnostic::error(format!("Invalid {}", name), e.to_string())
                    .with_attribute(AttributePath::new(name))
            }),
            None => Ok(client.clone()),
        }
    };
    let manager_client = derived(
        "manager_endpoint",
        "IBMCLOUD_BACKUP_RECOVERY_MANAGER_ENDPOINT",
    )?;
    let connector_client = derived(
        "connector_endpoint",
        "IBMCLOUD_BACKUP_RECOVERY_CONNECTOR_ENDPOINT",
    )?;

    tracing::info!(
        "configured Backup Recovery provider: service={} manager={} connector={}",
        client.base_url(),
        manager_client.base_url(),
        connector_client.base_url()
    );
    Ok(BackupRecoveryProviderData::new(
        client,
        manager_client,
        connector_client,
    ))
}

#[async_trait]
impl Provider for BackupRecoveryProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];
        let has = |name: &str| {
            request
                .config
                .get_string_opt(&AttributePath::new(name))
                .is_some()
        };
        if has("endpoint") && (has("instance_id") || has("region")) {
            diagnostics.push(
                Diagnostic::warning(
                    "Conflicting endpoint settings",
                    "endpoint is set, so instance_id and region are ignored",
                )
                .with_attribute(AttributePath::new("endpoint")),
            );
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        match build_provider_data(&request.config) {
            Ok(data) => {
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(diag) => ConfigureProviderResponse {
                diagnostics: vec![diag],
                provider_data: None,
            },
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "ibm_protection_group".to_string(),
            Box::new(|| Box::new(resources::ProtectionGroupResource::new())),
        );
        resources.insert(
            "ibm_backup_recovery_source_registration".to_string(),
            Box::new(|| Box::new(resources::SourceRegistrationResource::new())),
        );
        resources.insert(
            "ibm_backup_recovery_connector_update_user".to_string(),
            Box::new(|| Box::new(resources::ConnectorUpdateUserResource::new())),
        );
        resources.insert(
            "ibm_backup_recovery_alert_resolution".to_string(),
            Box::new(|| Box::new(resources::AlertResolutionResource::new())),
        );
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert(
            "ibm_backup_recovery_manager_get_alerts".to_string(),
            Box::new(|| Box::new(data_sources::AlertsDataSource::new())),
        );
        data_sources.insert(
            "ibm_backup_recovery_manager_get_alert_resolutions".to_string(),
            Box::new(|| Box::new(data_sources::AlertResolutionsDataSource::new())),
        );
        data_sources.insert(
            "ibm_backup_recovery_manager_get_upgrades_info".to_string(),
            Box::new(|| Box::new(data_sources::UpgradesInfoDataSource::new())),
        );
        data_sources.insert(
            "ibm_backup_recovery_manager_sre_get_cluster_info".to_string(),
            Box::new(|| Box::new(data_sources::ClusterInfoDataSource::new())),
        );
        data_sources.insert(
            "ibm_backup_recovery_connector_get_users".to_string(),
            Box::new(|| Box::new(data_sources::ConnectorUsersDataSource::new())),
        );
        data_sources.insert(
            "ibm_protection_groups".to_string(),
            Box::new(|| Box::new(data_sources::ProtectionGroupsDataSource::new())),
        );
        data_sources.insert(
            "ibm_backup_recovery_source_registrations".to_string(),
            Box::new(|| Box::new(data_sources::SourceRegistrationsDataSource::new())),
        );
        data_sources
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::ClientCapabilities;

    const ENV_VARS: [&str; 10] = [
        "IBMCLOUD_API_KEY",
        "IC_API_KEY",
        "IBMCLOUD_IAM_TOKEN",
        "IBMCLOUD_IAM_API_ENDPOINT",
        "IBMCLOUD_BACKUP_RECOVERY_ENDPOINT",
        "IBMCLOUD_BACKUP_RECOVERY_INSTANCE_ID",
        "IBMCLOUD_REGION",
        "IBMCLOUD_ENDPOINT_TYPE",
        "IBMCLOUD_BACKUP_RECOVERY_MANAGER_ENDPOINT",
        "IBMCLOUD_BACKUP_RECOVERY_CONNECTOR_ENDPOINT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_successfully_with_env_vars() {
        clear_env();
        std::env::set_var("IBMCLOUD_API_KEY", "test-api-key");
        std::env::set_var(
            "IBMCLOUD_BACKUP_RECOVERY_ENDPOINT",
            "https://brs.example.com/v2",
        );
        std::env::set_var(
            "IBMCLOUD_BACKUP_RECOVERY_MANAGER_ENDPOINT",
            "https://manager.example.com/v2",
        );

        let mut provider = BackupRecoveryProvider::new();
        let response = provider
            .configure(Context::new(), request(DynamicValue::object()))
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.provider_data.is_some());
        let data = provider.provider_data().unwrap();
        assert_eq!(data.client.base_url(), "https://brs.example.com/v2");
        assert_eq!(data.manager_client.base_url(), "https://manager.example.com/v2");
        assert_eq!(data.connector_client.base_url(), "https://brs.example.com/v2");

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn env_endpoint_wins_over_configured_instance() {
        clear_env();
        std::env::set_var("IBMCLOUD_BACKUP_RECOVERY_ENDPOINT", "https://env.example.com/v2");

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("iam_token"), "token".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("instance_id"), "inst1".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("region"), "us-east".to_string())
            .unwrap();

        let mut provider = BackupRecoveryProvider::new();
        let response = provider.configure(Context::new(), request(config)).await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            provider.provider_data().unwrap().client.base_url(),
            "https://env.example.com/v2"
        );

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_builds_endpoint_from_instance_and_region() {
        clear_env();
        std::env::set_var("IC_API_KEY", "test-api-key");
        std::env::set_var("IBMCLOUD_BACKUP_RECOVERY_INSTANCE_ID", "inst1");
        std::env::set_var("IBMCLOUD_REGION", "eu-de");
        std::env::set_var("IBMCLOUD_ENDPOINT_TYPE", "private");

        let mut provider = BackupRecoveryProvider::new();
        let response = provider
            .configure(Context::new(), request(DynamicValue::object()))
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            provider.provider_data().unwrap().client.base_url(),
            "https://inst1.private.eu-de.backup-recovery.cloud.ibm.com/v2"
        );

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_endpoint() {
        clear_env();
        std::env::set_var("IBMCLOUD_API_KEY", "test-api-key");

        let mut provider = BackupRecoveryProvider::new();
        let response = provider
            .configure(Context::new(), request(DynamicValue::object()))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("endpoint is required"));
        assert!(provider.provider_data().is_none());

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_configure_requires_credentials() {
        clear_env();
        std::env::set_var("IBMCLOUD_BACKUP_RECOVERY_ENDPOINT", "https://brs.example.com/v2");

        let mut provider = BackupRecoveryProvider::new();
        let response = provider
            .configure(Context::new(), request(DynamicValue::object()))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("ibmcloud_api_key is required"));

        clear_env();
    }

    #[tokio::test]
    async fn validate_warns_when_endpoint_overrides_instance() {
        let provider = BackupRecoveryProvider::new();
        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("endpoint"), "https://a.example.com".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("region"), "us-south".to_string())
            .unwrap();

        let response = provider
            .validate(Context::new(), ValidateProviderConfigRequest { config })
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Conflicting endpoint settings");
    }

    #[test]
    fn provider_registers_every_type() {
        let provider = BackupRecoveryProvider::new();

        let resources = provider.resources();
        assert_eq!(resources.len(), 4);
        for (name, factory) in &resources {
            assert_eq!(factory().type_name(), name);
        }

        let data_sources = provider.data_sources();
        assert_eq!(data_sources.len(), 7);
        for (name, factory) in &data_sources {
            assert_eq!(factory().type_name(), name);
        }
    }
}
