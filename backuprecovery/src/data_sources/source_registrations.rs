//! Source registrations data source implementation

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

use crate::api::sources::{ListSourceRegistrationsParams, SourceRegistration};
use crate::resources::common::{
    api_error, bool_at, i64s_at, instance_attributes, instance_client, not_configured, object,
    opt, provider_data, set, string_at, timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct SourceRegistrationsDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl SourceRegistrationsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn source_registrations_schema() -> Schema {
    let builder = SchemaBuilder::new()
        .version(0)
        .description("Lists the protection sources registered by a tenant")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(AttributeBuilder::string("x_ibm_tenant_id").required().build())
        .attribute(
            AttributeBuilder::new("ids", AttributeType::list(AttributeType::Number))
                .description("Registration IDs to return")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::bool("include_source_credentials")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::string("encryption_key")
                .description("Key used to encrypt returned credentials")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(AttributeBuilder::bool("use_cached_data").optional().build())
        .attribute(AttributeBuilder::bool("include_external_metadata").optional().build())
        .attribute(
            AttributeBuilder::bool("ignore_tenant_migration_in_progress_check")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "registrations",
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::Number),
                    ("source_id", AttributeType::Number),
                    ("name", AttributeType::String),
                    ("environment", AttributeType::String),
                    ("connection_id", AttributeType::String),
                    ("connector_group_id", AttributeType::Number),
                    ("data_source_connection_id", AttributeType::String),
                ])),
            )
            .computed()
            .build(),
        );
    instance_attributes(builder).build()
}

pub fn list_params(config: &DynamicValue) -> ListSourceRegistrationsParams {
    ListSourceRegistrationsParams {
        ids: i64s_at(config, "ids"),
        include_source_credentials: bool_at(config, "include_source_credentials"),
        encryption_key: string_at(config, "encryption_key"),
        use_cached_data: bool_at(config, "use_cached_data"),
        include_external_metadata: bool_at(config, "include_external_metadata"),
        ignore_tenant_migration_in_progress_check: bool_at(
            config,
            "ignore_tenant_migration_in_progress_check",
        ),
    }
}

fn registration_value(registration: &SourceRegistration) -> Dynamic {
    let name = registration
        .spec
        .name
        .clone()
        .or_else(|| registration.source_info.as_ref().and_then(|i| i.name.clone()));
    object([
        ("id", Dynamic::from(registration.id)),
        ("source_id", opt(registration.source_id)),
        ("name", opt(name)),
        (
            "environment",
            Dynamic::String(registration.spec.environment.clone()),
        ),
        (
            "connection_id",
            opt(registration.spec.connection_id.map(|id| id.to_string())),
        ),
        ("connector_group_id", opt(registration.spec.connector_group_id)),
        (
            "data_source_connection_id",
            opt(registration.spec.data_source_connection_id.clone()),
        ),
    ])
}

#[async_trait]
impl DataSource for SourceRegistrationsDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_source_registrations"
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
            schema: source_registrations_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];
        if bool_at(&request.config, "include_source_credentials") == Some(true)
            && string_at(&request.config, "encryption_key").is_none()
        {
            diagnostics.push(Diagnostic::warning(
                "Credentials returned unencrypted",
                "include_source_credentials is set without an encryption_key",
            ));
        }
        ValidateDataSourceConfigResponse { diagnostics }
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

        tracing::debug!("listing source registrations for tenant {}", tenant_id);
        let registrations = match client
            .sources()
            .list(&tenant_id, &list_params(config))
            .await
        {
            Ok(registrations) => registrations,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to list source registrations", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "registrations",
                Dynamic::List(registrations.iter().map(registration_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for SourceRegistrationsDataSource {
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
