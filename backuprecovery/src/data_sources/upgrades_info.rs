//! Upgrades info data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::Dynamic;

use crate::api::upgrades::UpgradeInfo;
use crate::resources::common::{
    api_error, not_configured, object, opt, provider_data, set, string_list, strings_at,
    timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct UpgradesInfoDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl UpgradesInfoDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn upgrades_info_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Reports upgrade and patch progress of managed clusters")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(
            AttributeBuilder::string_list("cluster_identifiers")
                .description("Clusters as <cluster_id>:<cluster_incarnation_id>; all when unset")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "upgrades_info",
                AttributeType::list(AttributeType::object([
                    ("cluster_id", AttributeType::Number),
                    ("cluster_incarnation_id", AttributeType::Number),
                    ("patch_software_version", AttributeType::String),
                    ("software_version", AttributeType::String),
                    ("current_version", AttributeType::String),
                    ("current_patch_version", AttributeType::String),
                    ("upgrade_status", AttributeType::String),
                    ("type", AttributeType::list(AttributeType::String)),
                    ("error_message", AttributeType::String),
                ])),
            )
            .computed()
            .build(),
        )
        .build()
}

fn upgrade_value(info: &UpgradeInfo) -> Dynamic {
    object([
        ("cluster_id", opt(info.cluster_id)),
        ("cluster_incarnation_id", opt(info.cluster_incarnation_id)),
        ("patch_software_version", opt(info.patch_software_version.clone())),
        ("software_version", opt(info.software_version.clone())),
        ("current_version", opt(info.current_version.clone())),
        ("current_patch_version", opt(info.current_patch_version.clone())),
        ("upgrade_status", opt(info.upgrade_status.clone())),
        ("type", string_list(info.upgrade_type.clone())),
        ("error_message", opt(info.error_message.clone())),
    ])
}

#[async_trait]
impl DataSource for UpgradesInfoDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_manager_get_upgrades_info"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: upgrades_info_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(request.config, not_configured());
        };

        let clusters = strings_at(&request.config, "cluster_identifiers").unwrap_or_default();
        tracing::debug!("reading upgrades info for {} clusters", clusters.len());
        let upgrades = match provider_data.manager_client.upgrades().info(&clusters).await {
            Ok(upgrades) => upgrades,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to get upgrades info", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "upgrades_info",
                Dynamic::List(upgrades.iter().map(upgrade_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for UpgradesInfoDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
