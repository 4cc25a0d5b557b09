//! Protection groups data source implementation

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

use crate::api::protection_groups::{ListProtectionGroupsParams, ProtectionGroup};
use crate::resources::common::{
    api_error, bool_at, instance_attributes, instance_client, not_configured, object, opt,
    provider_data, set, string_at, strings_at, timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct ProtectionGroupsDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl ProtectionGroupsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn protection_groups_schema() -> Schema {
    let builder = SchemaBuilder::new()
        .version(0)
        .description("Lists the protection groups of a tenant")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(AttributeBuilder::string("x_ibm_tenant_id").required().build())
        .attribute(AttributeBuilder::string_list("ids").optional().build())
        .attribute(AttributeBuilder::string_list("names").optional().build())
        .attribute(AttributeBuilder::string_list("policy_ids").optional().build())
        .attribute(AttributeBuilder::string_list("environments").optional().build())
        .attribute(AttributeBuilder::bool("is_active").optional().build())
        .attribute(AttributeBuilder::bool("is_deleted").optional().build())
        .attribute(AttributeBuilder::bool("is_paused").optional().build())
        .attribute(
            AttributeBuilder::new(
                "protection_groups",
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("policy_id", AttributeType::String),
                    ("environment", AttributeType::String),
                    ("priority", AttributeType::String),
                    ("description", AttributeType::String),
                    ("is_active", AttributeType::Bool),
                    ("is_deleted", AttributeType::Bool),
                    ("is_paused", AttributeType::Bool),
                    ("cluster_id", AttributeType::String),
                    ("region_id", AttributeType::String),
                    ("num_protected_objects", AttributeType::Number),
                ])),
            )
            .computed()
            .build(),
        );
    instance_attributes(builder).build()
}

pub fn list_params(config: &DynamicValue) -> ListProtectionGroupsParams {
    ListProtectionGroupsParams {
        ids: strings_at(config, "ids"),
        names: strings_at(config, "names"),
        policy_ids: strings_at(config, "policy_ids"),
        environments: strings_at(config, "environments"),
        is_active: bool_at(config, "is_active"),
        is_deleted: bool_at(config, "is_deleted"),
        is_paused: bool_at(config, "is_paused"),
    }
}

fn group_value(group: &ProtectionGroup) -> Dynamic {
    object([
        ("id", Dynamic::String(group.id.clone())),
        ("name", Dynamic::String(group.spec.name.clone())),
        ("policy_id", Dynamic::String(group.spec.policy_id.clone())),
        ("environment", Dynamic::String(group.spec.environment.clone())),
        ("priority", opt(group.spec.priority.clone())),
        ("description", opt(group.spec.description.clone())),
        ("is_active", opt(group.is_active)),
        ("is_deleted", opt(group.is_deleted)),
        ("is_paused", opt(group.spec.is_paused)),
        ("cluster_id", opt(group.cluster_id.clone())),
        ("region_id", opt(group.region_id.clone())),
        ("num_protected_objects", opt(group.num_protected_objects)),
    ])
}

#[async_trait]
impl DataSource for ProtectionGroupsDataSource {
    fn type_name(&self) -> &str {
        "ibm_protection_groups"
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
            schema: protection_groups_schema(),
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
        let config = &request.config;

        let Some(tenant_id) = string_at(config, "x_ibm_tenant_id") else {
            return ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error(
                    "Missing x_ibm_tenant_id",
                    "The 'x_ibm_tenant_id' attribute is required",
                ),
            );
        };
        let client = match instance_client(&provider_data.client, config) {
            Ok(client) => client,
            Err(diag) => return ReadDataSourceResponse::failed(request.config, diag),
        };

        tracing::debug!("listing protection groups for tenant {}", tenant_id);
        let groups = match client
            .protection_groups()
            .list(&tenant_id, &list_params(config))
            .await
        {
            Ok(groups) => groups,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to list protection groups", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "protection_groups",
                Dynamic::List(groups.iter().map(group_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ProtectionGroupsDataSource {
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
