//! Connector user resource implementation
//!
//! Users on a connector cannot be created or deleted through the API, only
//! updated. Creating the resource takes over an existing user and destroying
//! it only forgets the user.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::common::{
    api_error, bool_at, i64_at, not_configured, opt, provider_data, set, string_at, string_list,
    strings_at,
};
use crate::api::users::{ListUsersParams, UserDetails};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct ConnectorUpdateUserResource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl ConnectorUpdateUserResource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn connector_user_schema() -> Schema {
    let optional_string = |name: &str, description: &str| {
        AttributeBuilder::string(name)
            .description(description)
            .optional()
            .build()
    };

    SchemaBuilder::new()
        .version(0)
        .description("Updates the details of a user on a data source connector")
        .attribute(
            AttributeBuilder::string("id")
                .description("<sid>:<username>")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("session_name_cookie")
                .description("Session cookie of a logged in connector user")
                .required()
                .sensitive()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(optional_string("username", "Login name of the user"))
        .attribute(optional_string("domain", "Domain of the user, LOCAL for local users"))
        .attribute(optional_string("description", "Description of the user"))
        .attribute(optional_string("email_address", "Email address of the user"))
        .attribute(
            AttributeBuilder::string_list("roles")
                .description("Roles assigned to the user")
                .optional()
                .build(),
        )
        .attribute(optional_string("primary_group_name", "Primary group of the user"))
        .attribute(
            AttributeBuilder::string_list("additional_group_names")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::number("effective_time_msecs")
                .description("Time the account becomes usable")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::number("expired_time_msecs")
                .description("Time the account expires")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::bool("restricted").optional().build())
        .attribute(AttributeBuilder::bool("locked").optional().build())
        .attribute(
            AttributeBuilder::string("sid")
                .description("Security identifier of the user")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::number("created_time_msecs")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(AttributeBuilder::number("last_updated_time_msecs").computed().build())
        .attribute(AttributeBuilder::bool("is_account_locked").computed().build())
        .build()
}

pub fn build_user(config: &DynamicValue) -> UserDetails {
    UserDetails {
        username: string_at(config, "username"),
        domain: string_at(config, "domain"),
        description: string_at(config, "description"),
        email_address: string_at(config, "email_address"),
        roles: strings_at(config, "roles"),
        primary_group_name: string_at(config, "primary_group_name"),
        additional_group_names: strings_at(config, "additional_group_names"),
        effective_time_msecs: i64_at(config, "effective_time_msecs"),
        expired_time_msecs: i64_at(config, "expired_time_msecs"),
        restricted: bool_at(config, "restricted"),
        locked: bool_at(config, "locked"),
        ..Default::default()
    }
}

pub fn user_id(user: &UserDetails) -> String {
    format!(
        "{}:{}",
        user.sid.as_deref().unwrap_or_default(),
        user.username.as_deref().unwrap_or_default()
    )
}

/// Username from state, or the part of `sid:username` after the first colon
fn state_username(state: &DynamicValue) -> Option<String> {
    string_at(state, "username").or_else(|| {
        string_at(state, "id")
            .and_then(|id| id.split_once(':').map(|(_, name)| name.to_string()))
            .filter(|name| !name.is_empty())
    })
}

pub fn apply_user(state: &mut DynamicValue, user: &UserDetails) -> Result<(), Diagnostic> {
    let optional_strings = [
        ("username", &user.username),
        ("domain", &user.domain),
        ("description", &user.description),
        ("email_address", &user.email_address),
        ("primary_group_name", &user.primary_group_name),
    ];
    for (name, value) in optional_strings {
        if let Some(value) = value {
            set(state, name, Dynamic::String(value.clone()))?;
        }
    }
    if user.roles.is_some() {
        set(state, "roles", string_list(user.roles.clone()))?;
    }
    if user.additional_group_names.is_some() {
        set(
            state,
            "additional_group_names",
            string_list(user.additional_group_names.clone()),
        )?;
    }
    for (name, value) in [
        ("effective_time_msecs", user.effective_time_msecs),
        ("expired_time_msecs", user.expired_time_msecs),
    ] {
        if let Some(value) = value {
            set(state, name, Dynamic::from(value))?;
        }
    }
    for (name, value) in [("restricted", user.restricted), ("locked", user.locked)] {
        if let Some(value) = value {
            set(state, name, Dynamic::Bool(value))?;
        }
    }

    set(state, "sid", opt(user.sid.clone()))?;
    set(state, "created_time_msecs", opt(user.created_time_msecs))?;
    set(state, "last_updated_time_msecs", opt(user.last_updated_time_msecs))?;
    set(state, "is_account_locked", opt(user.is_account_locked))?;
    Ok(())
}

impl ConnectorUpdateUserResource {
    async fn put_user(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(not_configured)?;
        let cookie = string_at(planned, "session_name_cookie").ok_or_else(|| {
            Diagnostic::error(
                "Missing session_name_cookie",
                "The 'session_name_cookie' attribute is required",
            )
        })?;

        let user = build_user(planned);
        tracing::debug!(
            "updating connector user {}",
            user.username.as_deref().unwrap_or_default()
        );
        let updated = provider_data
            .connector_client
            .users()
            .update(&cookie, &user)
            .await
            .map_err(|e| api_error("Failed to update connector user", &e))?;

        let mut state = planned.clone();
        let id = if updated.username.is_some() {
            user_id(&updated)
        } else {
            user_id(&UserDetails {
                username: user.username.clone(),
                ..updated.clone()
            })
        };
        set(&mut state, "id", Dynamic::String(id))?;
        apply_user(&mut state, &updated)?;
        Ok(state)
    }
}

#[async_trait]
impl Resource for ConnectorUpdateUserResource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_connector_update_user"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: connector_user_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.put_user(&request.planned_state).await {
            Ok(state) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse::failed(diag),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse::failed(request.current_state, not_configured());
        };
        let current = &request.current_state;

        let (Some(cookie), Some(username)) = (
            string_at(current, "session_name_cookie"),
            state_username(current),
        ) else {
            return ReadResourceResponse::removed();
        };

        tracing::debug!("reading connector user {}", username);
        let params = ListUsersParams {
            usernames: Some(vec![username.clone()]),
            ..Default::default()
        };
        let users = match provider_data
            .connector_client
            .users()
            .list(&cookie, &params)
            .await
        {
            Ok(users) => users,
            Err(e) if e.is_not_found() => return ReadResourceResponse::removed(),
            Err(e) => {
                return ReadResourceResponse::failed(
                    request.current_state,
                    api_error("Failed to read connector user", &e),
                )
            }
        };

        let Some(user) = users
            .iter()
            .find(|u| u.username.as_deref() == Some(username.as_str()))
            .or_else(|| users.first())
        else {
            tracing::debug!("connector user {} not found", username);
            return ReadResourceResponse::removed();
        };

        let mut state = request.current_state.clone();
        match apply_user(&mut state, user) {
            Ok(()) => ReadResourceResponse::found(state, request.private),
            Err(diag) => ReadResourceResponse::failed(request.current_state, diag),
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.put_user(&request.planned_state).await {
            Ok(state) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
                new_identity: None,
            },
            Err(diag) => UpdateResourceResponse::failed(request.prior_state, diag),
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::debug!(
            "removing connector user {} from state only",
            string_at(&request.prior_state, "id").unwrap_or_default()
        );
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ConnectorUpdateUserResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}
