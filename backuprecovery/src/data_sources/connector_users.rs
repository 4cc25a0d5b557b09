//! Connector users data source implementation

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

use crate::api::users::{ListUsersParams, UserDetails};
use crate::resources::common::{
    api_error, bool_at, not_configured, object, opt, provider_data, set, string_at, string_list,
    strings_at, timestamp_id,
};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct ConnectorUsersDataSource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl ConnectorUsersDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn connector_users_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Lists users on a data source connector")
        .attribute(AttributeBuilder::string("id").computed().build())
        .attribute(
            AttributeBuilder::string("session_name_cookie")
                .description("Session cookie of a logged in connector user")
                .required()
                .sensitive()
                .build(),
        )
        .attribute(AttributeBuilder::string_list("tenant_ids").optional().build())
        .attribute(AttributeBuilder::bool("all_under_hierarchy").optional().build())
        .attribute(AttributeBuilder::string_list("usernames").optional().build())
        .attribute(AttributeBuilder::string_list("email_addresses").optional().build())
        .attribute(AttributeBuilder::string("domain").optional().build())
        .attribute(
            AttributeBuilder::bool("partial_match")
                .description("Match usernames and email addresses by prefix")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "users",
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::String),
                    ("sid", AttributeType::String),
                    ("username", AttributeType::String),
                    ("domain", AttributeType::String),
                    ("description", AttributeType::String),
                    ("email_address", AttributeType::String),
                    ("roles", AttributeType::list(AttributeType::String)),
                    ("primary_group_name", AttributeType::String),
                    ("additional_group_names", AttributeType::list(AttributeType::String)),
                    ("restricted", AttributeType::Bool),
                    ("is_account_locked", AttributeType::Bool),
                    ("created_time_msecs", AttributeType::Number),
                    ("last_updated_time_msecs", AttributeType::Number),
                    ("effective_time_msecs", AttributeType::Number),
                    ("expired_time_msecs", AttributeType::Number),
                ])),
            )
            .computed()
            .build(),
        )
        .build()
}

pub fn list_params(config: &DynamicValue) -> ListUsersParams {
    ListUsersParams {
        tenant_ids: strings_at(config, "tenant_ids"),
        all_under_hierarchy: bool_at(config, "all_under_hierarchy"),
        usernames: strings_at(config, "usernames"),
        email_addresses: strings_at(config, "email_addresses"),
        domain: string_at(config, "domain"),
        partial_match: bool_at(config, "partial_match"),
    }
}

fn user_value(user: &UserDetails) -> Dynamic {
    object([
        ("id", opt(user.id.clone())),
        ("sid", opt(user.sid.clone())),
        ("username", opt(user.username.clone())),
        ("domain", opt(user.domain.clone())),
        ("description", opt(user.description.clone())),
        ("email_address", opt(user.email_address.clone())),
        ("roles", string_list(user.roles.clone())),
        ("primary_group_name", opt(user.primary_group_name.clone())),
        (
            "additional_group_names",
            string_list(user.additional_group_names.clone()),
        ),
        ("restricted", opt(user.restricted)),
        ("is_account_locked", opt(user.is_account_locked)),
        ("created_time_msecs", opt(user.created_time_msecs)),
        ("last_updated_time_msecs", opt(user.last_updated_time_msecs)),
        ("effective_time_msecs", opt(user.effective_time_msecs)),
        ("expired_time_msecs", opt(user.expired_time_msecs)),
    ])
}

#[async_trait]
impl DataSource for ConnectorUsersDataSource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_connector_get_users"
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
            schema: connector_users_schema(),
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
        let Some(cookie) = string_at(&request.config, "session_name_cookie") else {
            return ReadDataSourceResponse::failed(
                request.config,
                Diagnostic::error(
                    "Missing session_name_cookie",
                    "The 'session_name_cookie' attribute is required",
                ),
            );
        };

        tracing::debug!("listing connector users");
        let users = match provider_data
            .connector_client
            .users()
            .list(&cookie, &list_params(&request.config))
            .await
        {
            Ok(users) => users,
            Err(e) => {
                return ReadDataSourceResponse::failed(
                    request.config,
                    api_error("Failed to list connector users", &e),
                )
            }
        };

        let mut state = request.config.clone();
        let result = set(&mut state, "id", Dynamic::String(timestamp_id())).and_then(|_| {
            set(
                &mut state,
                "users",
                Dynamic::List(users.iter().map(user_value).collect()),
            )
        });
        match result {
            Ok(()) => ReadDataSourceResponse::new(state),
            Err(diag) => ReadDataSourceResponse::failed(request.config, diag),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ConnectorUsersDataSource {
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
