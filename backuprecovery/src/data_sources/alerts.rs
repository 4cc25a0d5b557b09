//! Alerts data source implementation

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
use tfplug::validator::NumberRangeValidator;

use crate::api::alerts::{AlertInfo, ListAlertsParams};
use crate::resources::common::{
    api_error, bool_at, i64_at, i64s_at, key_values, not_configured, object, opt, provider_data,
    set, string_at, string_list, strings_at, timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct AlertsDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl AlertsDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn alert_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("alert_category", AttributeType::String),
        ("alert_code", AttributeType::String),
        (
            "alert_document",
            AttributeType::list(AttributeType::object([
                ("alert_cause", AttributeType::String),
                ("alert_description", AttributeType::String),
                ("alert_help_text", AttributeType::String),
                ("alert_name", AttributeType::String),
                ("alert_summary", AttributeType::String),
            ])),
        ),
        ("alert_state", AttributeType::String),
        ("alert_type", AttributeType::Number),
        ("alert_type_bucket", AttributeType::String),
        ("cluster_id", AttributeType::Number),
        ("cluster_name", AttributeType::String),
        ("dedup_count", AttributeType::Number),
        ("first_timestamp_usecs", AttributeType::Number),
        ("latest_timestamp_usecs", AttributeType::Number),
        (
            "property_list",
            AttributeType::list(AttributeType::object([
                ("key", AttributeType::String),
                ("value", AttributeType::String),
            ])),
        ),
        ("region_id", AttributeType::String),
        ("resolution_id_string", AttributeType::String),
        ("severity", AttributeType::String),
        ("tenant_ids", AttributeType::list(AttributeType::String)),
    ])
}

pub fn alerts_schema() -> Schema {
    let string_filter = |name: &str, description: &str| {
        AttributeBuilder::string_list(name)
            .description(description)
            .optional()
            .build()
    };

    SchemaBuilder::new()
        .version(0)
        .description("Lists alerts raised by the clusters of a manager instance")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(string_filter("alert_ids", "Filter by list of alert ids"))
        .attribute(
            AttributeBuilder::new("alert_types", AttributeType::list(AttributeType::Number))
                .description("Filter by list of alert types")
                .optional()
                .build(),
        )
        .attribute(string_filter("alert_categories", "Filter by list of alert categories"))
        .attribute(string_filter("alert_states", "Filter by list of alert states"))
        .attribute(string_filter("alert_severities", "Filter by list of alert severities"))
        .attribute(string_filter("alert_type_buckets", "Filter by list of alert type buckets"))
        .attribute(AttributeBuilder::number("start_time_usecs").optional().build())
        .attribute(AttributeBuilder::number("end_time_usecs").optional().build())
        .attribute(
            AttributeBuilder::number("max_alerts")
                .description("Maximum number of alerts to return, 100 when unset")
                .optional()
                .validator(NumberRangeValidator::between(1.0, 1000.0))
                .build(),
        )
        .attribute(AttributeBuilder::string("property_key").optional().build())
        .attribute(AttributeBuilder::string("property_value").optional().build())
        .attribute(AttributeBuilder::string("alert_name").optional().build())
        .attribute(
            AttributeBuilder::new("resolution_ids", AttributeType::list(AttributeType::Number))
                .optional()
                .build(),
        )
        .attribute(string_filter("tenant_ids", "Filter by tenant ids"))
        .attribute(AttributeBuilder::bool("all_under_hierarchy").optional().build())
        .attribute(
            AttributeBuilder::string("x_scope_identifier")
                .description("Scope the alerts belong to")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("alerts", AttributeType::list(alert_type()))
                .description("Matching alerts")
                .computed()
                .build(),
        )
        .build()
}

pub fn list_params(config: &DynamicValue) -> ListAlertsParams {
    ListAlertsParams {
        alert_ids: strings_at(config, "alert_ids"),
        alert_types: i64s_at(config, "alert_types"),
        alert_categories: strings_at(config, "alert_categories"),
        alert_states: strings_at(config, "alert_states"),
        alert_severities: strings_at(config, "alert_severities"),
        alert_type_buckets: strings_at(config, "alert_type_buckets"),
        start_time_usecs: i64_at(config, "start_time_usecs"),
        end_time_usecs: i64_at(config, "end_time_usecs"),
        max_alerts: i64_at(config, "max_alerts"),
        property_key: string_at(config, "property_key"),
        property_value: string_at(config, "property_value"),
        alert_name: string_at(config, "alert_name"),
        resolution_ids: i64s_at(config, "resolution_ids"),
        tenant_ids: strings_at(config, "tenant_ids"),
        all_under_hierarchy: bool_at(config, "all_under_hierarchy"),
        scope_identifier: string_at(config, "x_scope_identifier"),
    }
}

pub fn alert_value(alert: &AlertInfo) -> Dynamic {
    let document = alert.alert_document.as_ref().map(|d| {
        object([
            ("alert_cause", opt(d.alert_cause.clone())),
            ("alert_description", opt(d.alert_description.clone())),
            ("alert_help_text", opt(d.alert_help_text.clone())),
            ("alert_name", opt(d.alert_name.clone())),
            ("alert_summary", opt(d.alert_summary.clone())),
        ])
    });

    object([
        ("id", opt(alert.id.clone())),
        ("alert_category", opt(alert.alert_category.clone())),
        ("alert_code", opt(alert.alert_code.clone())),
        ("alert_document", Dynamic::List(document.into_iter().collect())),
        ("alert_state", opt(alert.alert_state.clone())),
        ("alert_type", opt(alert.alert_type)),
        ("alert_type_bucket", opt(alert.alert_type_bucket.clone())),
        ("cluster_id", opt(alert.cluster_id)),
        ("cluster_name", opt(alert.cluster_name.clone())),
        ("dedup_count", opt(alert.dedup_count)),
        ("first_timestamp_usecs", opt(alert.first_timestamp_usecs)),
        ("latest_timestamp_usecs", opt(alert.latest_timestamp_usecs)),
        ("property_list", key_values(alert.property_list.as_deref())),
        ("region_id", opt(alert.region_id.clone())),
        ("resolution_id_string", opt(alert.resolution_id_string.clone())),
        ("severity", opt(alert.severity.clone())),
        ("tenant_ids", string_list(alert.tenant_ids.clone())),
    ])
}

#[async_trait]
impl DataSource for AlertsDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_manager_get_alerts"
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
            schema: alerts_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];
        if let (Some(start), Some(end)) = (
            i64_at(&request.config, "start_time_usecs"),
            i64_at(&request.config, "end_time_usecs"),
        ) {
            if start > end {
                diagnostics.push(Diagnostic::error(
                    "Invalid time range",
                    "start_time_usecs must not be after end_time_usecs",
                ));
            }
        }
        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::failed(request.config, not_configured());
        };

        let params = list_params(&request.config);
        tracing::debug!("listing alerts");
        let alerts = match provider_data.manager_client.alerts().list(&params).await {
            Ok(alerts) => alerts,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to list alerts", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "alerts",
                Dynamic::List(alerts.iter().map(alert_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AlertsDataSource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfplug::types::AttributePath;

    #[test]
    fn list_params_reads_number_lists() {
        let mut config = DynamicValue::object();
        config
            .set_list(
                &AttributePath::new("alert_types"),
                vec![Dynamic::from(1007i64), Dynamic::from(1008i64)],
            )
            .unwrap();
        config
            .set_string(&AttributePath::new("x_scope_identifier"), "scope-1".to_string())
            .unwrap();

        let params = list_params(&config);
        assert_eq!(params.alert_types, Some(vec![1007, 1008]));
        assert_eq!(params.scope_identifier.as_deref(), Some("scope-1"));
        assert!(params.alert_ids.is_none());
    }

    #[test]
    fn alert_value_flattens_document() {
        let alert: AlertInfo = serde_json::from_str(
            r#"{"id":"a-1","alertType":1007,"alertDocument":{"alertName":"BackupFailed"}}"#,
        )
        .unwrap();
        let value = DynamicValue::new(alert_value(&alert));

        assert_eq!(
            value.get_string_opt(
                &AttributePath::new("alert_document")
                    .index(0)
                    .attribute("alert_name")
            ),
            Some("BackupFailed".to_string())
        );
        assert_eq!(value.get_i64_opt(&AttributePath::new("alert_type")), Some(1007));
        assert!(value
            .get_list_opt(&AttributePath::new("property_list"))
            .is_none());
    }
}
