//! Alert resolution resource implementation

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
use tfplug::validator::{ListLengthValidator, StringLengthValidator};

use super::common::{
    api_error, not_configured, opt, provider_data, set, string_at, string_list, strings_at,
};
use crate::api::alert_resolutions::{AlertResolution, CreateAlertResolutionRequest};
use crate::BackupRecoveryProviderData;

#[derive(Default)]
pub struct AlertResolutionResource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl AlertResolutionResource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn alert_resolution_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Resolves one or more alerts. Resolutions cannot be changed or removed")
        .attribute(
            AttributeBuilder::string("id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("x_scope_identifier")
                .description("Scope the alerts belong to")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("resolution_summary")
                .description("Short description of the resolution")
                .required()
                .validator(StringLengthValidator::create(Some(1), None))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string_list("alert_id_list")
                .description("Alerts resolved by this resolution")
                .required()
                .validator(ListLengthValidator::create(Some(1), None))
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("resolution_details")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("user_name")
                .description("User resolving the alerts")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("resolution_id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::number("timestamp_usecs")
                .description("Time the resolution was created")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("created_by")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .build()
}

pub fn build_request(config: &DynamicValue) -> Result<CreateAlertResolutionRequest, Diagnostic> {
    let resolution_summary = string_at(config, "resolution_summary").ok_or_else(|| {
        Diagnostic::error(
            "Missing resolution_summary",
            "The 'resolution_summary' attribute is required",
        )
        .with_attribute(AttributePath::new("resolution_summary"))
    })?;

    Ok(CreateAlertResolutionRequest {
        alert_id_list: strings_at(config, "alert_id_list").unwrap_or_default(),
        resolution_summary,
        resolution_details: string_at(config, "resolution_details"),
        user_name: string_at(config, "user_name"),
    })
}

pub fn apply_resolution(
    state: &mut DynamicValue,
    resolution: &AlertResolution,
) -> Result<(), Diagnostic> {
    if let Some(summary) = &resolution.resolution_summary {
        set(state, "resolution_summary", Dynamic::String(summary.clone()))?;
    }
    if let Some(details) = &resolution.resolution_details {
        set(state, "resolution_details", Dynamic::String(details.clone()))?;
    }
    if let Some(user) = &resolution.user_name {
        set(state, "user_name", Dynamic::String(user.clone()))?;
    }
    if !resolution.alert_id_list.is_empty() {
        set(
            state,
            "alert_id_list",
            string_list(Some(resolution.alert_id_list.clone())),
        )?;
    }
    set(state, "resolution_id", opt(resolution.resolution_id.clone()))?;
    set(state, "timestamp_usecs", opt(resolution.timestamp_usecs))?;
    set(state, "created_by", opt(resolution.created_by.clone()))?;
    Ok(())
}

#[async_trait]
impl Resource for AlertResolutionResource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_alert_resolution"
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
            schema: alert_resolution_schema(),
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
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse::failed(not_configured());
        };
        let planned = &request.planned_state;

        let Some(scope) = string_at(planned, "x_scope_identifier") else {
            return CreateResourceResponse::failed(Diagnostic::error(
                "Missing x_scope_identifier",
                "The 'x_scope_identifier' attribute is required",
            ));
        };
        let body = match build_request(planned) {
            Ok(body) => body,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };

        tracing::debug!("resolving {} alerts", body.alert_id_list.len());
        let resolution = match provider_data
            .manager_client
            .alert_resolutions()
            .create(&scope, &body)
            .await
        {
            Ok(resolution) => resolution,
            Err(e) => {
                return CreateResourceResponse::failed(api_error(
                    "Failed to create alert resolution",
                    &e,
                ))
            }
        };

        let Some(resolution_id) = resolution.resolution_id.clone() else {
            return CreateResourceResponse::failed(Diagnostic::error(
                "Failed to create alert resolution",
                "the service did not return a resolution ID",
            ));
        };

        let mut state = planned.clone();
        let mut diagnostics = vec![];
        if let Err(diag) = set(&mut state, "id", Dynamic::String(resolution_id))
            .and_then(|_| apply_resolution(&mut state, &resolution))
        {
            diagnostics.push(diag);
        }

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse::failed(request.current_state, not_configured());
        };
        let current = &request.current_state;

        let Some(id) = string_at(current, "id") else {
            return ReadResourceResponse::removed();
        };
        let scope = string_at(current, "x_scope_identifier").unwrap_or_default();

        tracing::debug!("reading alert resolution {}", id);
        match provider_data
            .manager_client
            .alert_resolutions()
            .get(&scope, &id)
            .await
        {
            Ok(resolution) => {
                let mut state = request.current_state.clone();
                match apply_resolution(&mut state, &resolution) {
                    Ok(()) => ReadResourceResponse::found(state, request.private),
                    Err(diag) => ReadResourceResponse::failed(request.current_state, diag),
                }
            }
            Err(e) if e.is_not_found() => ReadResourceResponse::removed(),
            Err(e) => ReadResourceResponse::failed(
                request.current_state,
                api_error("Failed to read alert resolution", &e),
            ),
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // every configurable attribute forces replacement
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: request.planned_private,
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::debug!(
            "alert resolution {} cannot be deleted, removing from state",
            string_at(&request.prior_state, "id").unwrap_or_default()
        );
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertResolutionResource {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn build_request_copies_alert_ids() {
        let mut config = DynamicValue::object();
        config
            .set_string(
                &AttributePath::new("resolution_summary"),
                "disk replaced".to_string(),
            )
            .unwrap();
        config
            .set_list(
                &AttributePath::new("alert_id_list"),
                vec![Dynamic::from("a1"), Dynamic::from("a2")],
            )
            .unwrap();

        let request = build_request(&config).unwrap();
        assert_eq!(request.alert_id_list, vec!["a1", "a2"]);
        assert_eq!(request.resolution_summary, "disk replaced");
        assert!(request.user_name.is_none());
    }

    #[test]
    fn build_request_requires_summary() {
        let diag = build_request(&DynamicValue::object()).unwrap_err();
        assert_eq!(diag.summary, "Missing resolution_summary");
    }

    #[tokio::test]
    async fn create_fails_when_unconfigured() {
        let resource = AlertResolutionResource::new();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "ibm_backup_recovery_alert_resolution".to_string(),
                    planned_state: DynamicValue::object(),
                    config: DynamicValue::object(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
