//! Cluster info data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};

use crate::api::clusters::{ClusterDetails, ClusterInfo, SpClusterInfo};
use crate::resources::common::{
    api_error, block_list, not_configured, object, opt, provider_data, set, string_list,
    timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct ClusterInfoDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl ClusterInfoDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cluster_info_schema() -> Schema {
    let cohesity_cluster = AttributeType::object([
        ("cluster_id", AttributeType::Number),
        ("cluster_incarnation_id", AttributeType::Number),
        ("cluster_name", AttributeType::String),
        ("current_version", AttributeType::String),
        ("current_patch_version", AttributeType::String),
        ("health", AttributeType::String),
        ("is_connected_to_helios", AttributeType::Bool),
        ("location", AttributeType::String),
        ("multi_tenancy_enabled", AttributeType::Bool),
        ("node_ips", AttributeType::list(AttributeType::String)),
        ("number_of_nodes", AttributeType::Number),
        ("provider_type", AttributeType::String),
        ("status", AttributeType::String),
        ("type", AttributeType::String),
        ("total_capacity", AttributeType::Number),
        ("used_capacity", AttributeType::Number),
        ("target_version", AttributeType::String),
        ("update_type", AttributeType::String),
        (
            "available_versions",
            AttributeType::list(AttributeType::object([
                ("version", AttributeType::String),
                ("release_type", AttributeType::String),
                ("release_stage", AttributeType::String),
                ("notes", AttributeType::String),
            ])),
        ),
    ]);

    let sp_cluster = AttributeType::object([
        ("cluster_id", AttributeType::Number),
        ("cluster_incarnation_id", AttributeType::Number),
        ("cluster_name", AttributeType::String),
        ("current_version", AttributeType::String),
        ("health", AttributeType::String),
        ("is_connected_to_helios", AttributeType::Bool),
        ("moved_to_sp", AttributeType::Bool),
        ("node_ips", AttributeType::list(AttributeType::String)),
        ("number_of_nodes", AttributeType::Number),
        ("provider_type", AttributeType::String),
        ("status", AttributeType::String),
        ("type", AttributeType::String),
        ("total_capacity", AttributeType::Number),
        ("used_capacity", AttributeType::Number),
    ]);

    SchemaBuilder::new()
        .version(0)
        .description("Lists the clusters managed by the manager instance")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(
            AttributeBuilder::new("cohesity_clusters", AttributeType::list(cohesity_cluster))
                .description("Clusters deployed by the customer")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("sp_clusters", AttributeType::list(sp_cluster))
                .description("Clusters hosted by the service provider")
                .computed()
                .build(),
        )
        .build()
}

fn cohesity_cluster_value(cluster: &ClusterInfo) -> Dynamic {
    object([
        ("cluster_id", opt(cluster.cluster_id)),
        ("cluster_incarnation_id", opt(cluster.cluster_incarnation_id)),
        ("cluster_name", opt(cluster.cluster_name.clone())),
        ("current_version", opt(cluster.current_version.clone())),
        ("current_patch_version", opt(cluster.current_patch_version.clone())),
        ("health", opt(cluster.health.clone())),
        ("is_connected_to_helios", opt(cluster.is_connected_to_helios)),
        ("location", opt(cluster.location.clone())),
        ("multi_tenancy_enabled", opt(cluster.multi_tenancy_enabled)),
        ("node_ips", string_list(cluster.node_ips.clone())),
        ("number_of_nodes", opt(cluster.number_of_nodes)),
        ("provider_type", opt(cluster.provider_type.clone())),
        ("status", opt(cluster.status.clone())),
        ("type", opt(cluster.cluster_type.clone())),
        ("total_capacity", opt(cluster.total_capacity)),
        ("used_capacity", opt(cluster.used_capacity)),
        ("target_version", opt(cluster.target_version.clone())),
        ("update_type", opt(cluster.update_type.clone())),
        (
            "available_versions",
            block_list(cluster.available_versions.as_deref(), |v| {
                object([
                    ("version", opt(v.version.clone())),
                    ("release_type", opt(v.release_type.clone())),
                    ("release_stage", opt(v.release_stage.clone())),
                    ("notes", opt(v.notes.clone())),
                ])
            }),
        ),
    ])
}

fn sp_cluster_value(cluster: &SpClusterInfo) -> Dynamic {
    object([
        ("cluster_id", opt(cluster.cluster_id)),
        ("cluster_incarnation_id", opt(cluster.cluster_incarnation_id)),
        ("cluster_name", opt(cluster.cluster_name.clone())),
        ("current_version", opt(cluster.current_version.clone())),
        ("health", opt(cluster.health.clone())),
        ("is_connected_to_helios", opt(cluster.is_connected_to_helios)),
        ("moved_to_sp", opt(cluster.moved_to_sp)),
        ("node_ips", string_list(cluster.node_ips.clone())),
        ("number_of_nodes", opt(cluster.number_of_nodes)),
        ("provider_type", opt(cluster.provider_type.clone())),
        ("status", opt(cluster.status.clone())),
        ("type", opt(cluster.cluster_type.clone())),
        ("total_capacity", opt(cluster.total_capacity)),
        ("used_capacity", opt(cluster.used_capacity)),
    ])
}

pub fn apply_details(state: &mut DynamicValue, details: &ClusterDetails) -> Result<(), Diagnostic> {
    set(
        state,
        "cohesity_clusters",
        Dynamic::List(details.cohesity_clusters.iter().map(cohesity_cluster_value).collect()),
    )?;
    set(
        state,
        "sp_clusters",
        Dynamic::List(details.sp_clusters.iter().map(sp_cluster_value).collect()),
    )
}

#[async_trait]
impl DataSource for ClusterInfoDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_manager_sre_get_cluster_info"
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
            schema: cluster_info_schema(),
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

        tracing::debug!("reading cluster info");
        let details = match provider_data.manager_client.clusters().info().await {
            Ok(details) => details,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to get cluster info", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id()))
            .and_then(|_| apply_details(&mut state, &details));
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ClusterInfoDataSource {
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
