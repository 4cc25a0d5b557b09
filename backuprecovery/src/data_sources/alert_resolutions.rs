//! Alert resolutions data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Dynamic, DynamicValue};

use crate::api::alert_resolutions::{AlertResolution, ListAlertResolutionsParams};
use crate::resources::common::{
    api_error, i64_at, not_configured, object, opt, provider_data, set, string_at, string_list,
    strings_at, timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct AlertResolutionsDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl AlertResolutionsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn alert_resolutions_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Lists alert resolutions")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(
            AttributeBuilder::number("max_resolutions")
                .description("Maximum number of resolutions to return")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::string_list("resolution_ids").optional().build())
        .attribute(
            AttributeBuilder::string_list("alert_ids")
                .description("Only resolutions covering these alerts")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::string("x_scope_identifier").optional().build())
        .attribute(
            AttributeBuilder::new(
                "alert_resolutions",
                AttributeType::list(AttributeType::object([
                    ("resolution_id", AttributeType::String),
                    ("resolution_summary", AttributeType::String),
                    ("resolution_details", AttributeType::String),
                    ("timestamp_usecs", AttributeType::Number),
                    ("user_name", AttributeType::String),
                    ("alert_id_list", AttributeType::list(AttributeType::String)),
                ])),
            )
            .computed()
            .build(),
        )
        .build()
}

pub fn list_params(config: &DynamicValue) -> ListAlertResolutionsParams {
    ListAlertResolutionsParams {
        max_resolutions: i64_at(config, "max_resolutions"),
        resolution_ids: strings_at(config, "resolution_ids"),
        alert_ids: strings_at(config, "alert_ids"),
        scope_identifier: string_at(config, "x_scope_identifier"),
    }
}

fn resolution_value(resolution: &AlertResolution) -> Dynamic {
    object([
        ("resolution_id", opt(resolution.resolution_id.clone())),
        ("resolution_summary", opt(resolution.resolution_summary.clone())),
        ("resolution_details", opt(resolution.resolution_details.clone())),
        ("timestamp_usecs", opt(resolution.timestamp_usecs)),
        ("user_name", opt(resolution.user_name.clone())),
        (
            "alert_id_list",
            string_list(Some(resolution.alert_id_list.clone())),
        ),
    ])
}

#[async_trait]
impl DataSource for AlertResolutionsDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_manager_get_alert_resolutions"
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
            schema: alert_resolutions_schema(),
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

        tracing::debug!("listing alert resolutions");
        let resolutions = match provider_data
            .manager_client
            .alert_resolutions()
            .list(&list_params(&request.config))
            .await
        {
            Ok(resolutions) => resolutions,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to list alert resolutions", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "alert_resolutions",
                Dynamic::List(resolutions.iter().map(resolution_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AlertResolutionsDataSource {
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
