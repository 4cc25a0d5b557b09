//! Source registration resource implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOf;

use super::common::{
    api_error, block_list, blocks, bool_at, composite_id, first_block, i64_at,
    import_tenant_scoped, instance_attributes, instance_client, key_values, key_values_at,
    not_configured, object, opt, parse_composite_id, provider_data, set, string_at, string_list,
    strings_at,
};
use crate::api::sources::{
    ConnectionConfig, PatchSourceRegistrationRequest, PhysicalSourceParams, SourceRegistration,
    SourceRegistrationRequest,
};
use crate::BackupRecoveryProviderData;

const ENVIRONMENTS: [&str; 3] = ["kPhysical", "kSQL", "kOracle"];
const HOST_TYPES: [&str; 7] = [
    "kLinux", "kWindows", "kAix", "kSolaris", "kSapHana", "kSapOracle", "kOther",
];
const PHYSICAL_TYPES: [&str; 6] = [
    "kGroup",
    "kHost",
    "kWindowsCluster",
    "kOracleRACCluster",
    "kOracleAPCluster",
    "kUnixCluster",
];

#[derive(Default)]
pub struct SourceRegistrationResource {
    provider_data: Option<BackupRecoveryProviderData>,
}

impl SourceRegistrationResource {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn source_registration_schema() -> Schema {
    let builder = SchemaBuilder::new()
        .version(0)
        .description("Registers a protection source with the service")
        .attribute(
            AttributeBuilder::string("id")
                .description("Composite ID: <tenant_id>::<registration_id>")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("x_ibm_tenant_id")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("environment")
                .description("Environment of the source")
                .required()
                .validator(StringOneOf::create(&ENVIRONMENTS))
                .build(),
        )
        .attribute(
            AttributeBuilder::string("name")
                .description("User specified name of the source")
                .optional()
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("connection_id")
                .description("Connection used to reach the source")
                .optional()
                .build(),
        )
        .attribute(AttributeBuilder::bool("is_internal_encrypted").optional().build())
        .attribute(
            AttributeBuilder::string("encryption_key")
                .description("Key used to encrypt the source credentials")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(AttributeBuilder::number("connector_group_id").optional().build())
        .attribute(
            AttributeBuilder::string("data_source_connection_id")
                .optional()
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::number("registration_id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::number("source_id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "source_info",
                AttributeType::list(AttributeType::object([
                    ("id", AttributeType::Number),
                    ("name", AttributeType::String),
                    ("environment", AttributeType::String),
                ])),
            )
            .description("The registered protection source")
            .computed()
            .build(),
        )
        .block(
            NestedBlockBuilder::list("connections")
                .description("Connections between the source and connector groups")
                .attribute(AttributeBuilder::string("connection_id").optional().build())
                .attribute(AttributeBuilder::number("entity_id").optional().build())
                .attribute(AttributeBuilder::number("connector_group_id").optional().build())
                .attribute(
                    AttributeBuilder::string("data_source_connection_id")
                        .optional()
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::list("advanced_configs")
                .attribute(AttributeBuilder::string("key").required().build())
                .attribute(AttributeBuilder::string("value").required().build())
                .build(),
        )
        .block(
            NestedBlockBuilder::list("physical_params")
                .max_items(1)
                .attribute(
                    AttributeBuilder::string("endpoint")
                        .description("Hostname or IP of the physical host")
                        .required()
                        .build(),
                )
                .attribute(AttributeBuilder::bool("force_register").optional().build())
                .attribute(
                    AttributeBuilder::string("host_type")
                        .optional()
                        .validator(StringOneOf::create(&HOST_TYPES))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::string("physical_type")
                        .optional()
                        .validator(StringOneOf::create(&PHYSICAL_TYPES))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::string_list("applications")
                        .description("Applications to register on the host: kSQL, kOracle")
                        .optional()
                        .build(),
                )
                .build(),
        );

    instance_attributes(builder).build()
}

/// Connection IDs are int64 on the wire and strings in state; they do not
/// fit the 2^53 range of a Terraform number
fn connection_id_at(value: &DynamicValue, path: AttributePath) -> Result<Option<i64>, Diagnostic> {
    let Some(raw) = string_at(value, "connection_id") else {
        return Ok(None);
    };
    raw.trim().parse::<i64>().map(Some).map_err(|_| {
        Diagnostic::error(
            "Invalid connection_id",
            format!("connection_id must be an integer, got \"{}\"", raw),
        )
        .with_attribute(path)
    })
}

pub fn build_request(config: &DynamicValue) -> Result<SourceRegistrationRequest, Diagnostic> {
    let environment = string_at(config, "environment").ok_or_else(|| {
        Diagnostic::error(
            "Missing environment",
            "The 'environment' attribute is required",
        )
        .with_attribute(AttributePath::new("environment"))
    })?;

    let connections = blocks(config, "connections")
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Ok(ConnectionConfig {
                connection_id: connection_id_at(
                    c,
                    AttributePath::new("connections").index(i as i64).attribute("connection_id"),
                )?,
                entity_id: i64_at(c, "entity_id"),
                connector_group_id: i64_at(c, "connector_group_id"),
                data_source_connection_id: string_at(c, "data_source_connection_id"),
            })
        })
        .collect::<Result<Vec<_>, Diagnostic>>()?;

    let physical_params = match first_block(config, "physical_params") {
        Some(params) => Some(PhysicalSourceParams {
            endpoint: string_at(&params, "endpoint").ok_or_else(|| {
                Diagnostic::error(
                    "Missing endpoint",
                    "physical_params requires an endpoint",
                )
                .with_attribute(AttributePath::new("physical_params").index(0).attribute("endpoint"))
            })?,
            force_register: bool_at(&params, "force_register"),
            host_type: string_at(&params, "host_type"),
            physical_type: string_at(&params, "physical_type"),
            applications: strings_at(&params, "applications"),
        }),
        None => None,
    };

    Ok(SourceRegistrationRequest {
        environment,
        name: string_at(config, "name"),
        is_internal_encrypted: bool_at(config, "is_internal_encrypted"),
        encryption_key: string_at(config, "encryption_key"),
        connection_id: connection_id_at(config, AttributePath::new("connection_id"))?,
        connections: (!connections.is_empty()).then_some(connections),
        connector_group_id: i64_at(config, "connector_group_id"),
        advanced_configs: key_values_at(config, "advanced_configs"),
        data_source_connection_id: string_at(config, "data_source_connection_id"),
        physical_params,
    })
}

/// True when the two bodies differ in `environment` and nothing else
pub fn only_environment_changed(
    prior: &SourceRegistrationRequest,
    planned: &SourceRegistrationRequest,
) -> bool {
    if prior.environment == planned.environment {
        return false;
    }
    let mut moved = prior.clone();
    moved.environment = planned.environment.clone();
    moved == *planned
}

/// Copies a registration returned by the service into `state`; the
/// encryption key is never returned and keeps its configured value
pub fn apply_registration(
    state: &mut DynamicValue,
    registration: &SourceRegistration,
) -> Result<(), Diagnostic> {
    let spec = &registration.spec;

    set(state, "registration_id", Dynamic::from(registration.id))?;
    set(state, "source_id", opt(registration.source_id))?;
    if !spec.environment.is_empty() {
        set(state, "environment", Dynamic::String(spec.environment.clone()))?;
    }
    let name = spec
        .name
        .clone()
        .or_else(|| registration.source_info.as_ref().and_then(|i| i.name.clone()));
    set(state, "name", opt(name))?;
    if let Some(id) = spec.connection_id {
        set(state, "connection_id", Dynamic::String(id.to_string()))?;
    }
    if let Some(encrypted) = spec.is_internal_encrypted {
        set(state, "is_internal_encrypted", Dynamic::Bool(encrypted))?;
    }
    if let Some(id) = spec.connector_group_id {
        set(state, "connector_group_id", Dynamic::from(id))?;
    }
    set(
        state,
        "data_source_connection_id",
        opt(spec.data_source_connection_id.clone()),
    )?;
    if let Some(connections) = &spec.connections {
        set(
            state,
            "connections",
            block_list(Some(connections), |c| {
                object([
                    ("connection_id", opt(c.connection_id.map(|id| id.to_string()))),
                    ("entity_id", opt(c.entity_id)),
                    ("connector_group_id", opt(c.connector_group_id)),
                    (
                        "data_source_connection_id",
                        opt(c.data_source_connection_id.clone()),
                    ),
                ])
            }),
        )?;
    }
    if let Some(configs) = &spec.advanced_configs {
        set(state, "advanced_configs", key_values(Some(configs)))?;
    }
    if let Some(params) = &spec.physical_params {
        set(
            state,
            "physical_params",
            Dynamic::List(vec![object([
                ("endpoint", Dynamic::String(params.endpoint.clone())),
                ("force_register", opt(params.force_register)),
                ("host_type", opt(params.host_type.clone())),
                ("physical_type", opt(params.physical_type.clone())),
                ("applications", string_list(params.applications.clone())),
            ])]),
        )?;
    }
    set(
        state,
        "source_info",
        Dynamic::List(
            registration
                .source_info
                .iter()
                .map(|info| {
                    object([
                        ("id", opt(info.id)),
                        ("name", opt(info.name.clone())),
                        ("environment", opt(info.environment.clone())),
                    ])
                })
                .collect(),
        ),
    )?;
    Ok(())
}

fn registration_id(id: &str) -> Result<i64, Diagnostic> {
    id.parse::<i64>().map_err(|_| {
        Diagnostic::error(
            "Invalid resource ID",
            format!("registration ID must be numeric, got \"{}\"", id),
        )
        .with_attribute(AttributePath::new("id"))
    })
}

/// Tenant and numeric registration ID from the state's `id`
fn state_ids(state: &DynamicValue) -> Result<(String, i64), Diagnostic> {
    let id = string_at(state, "id").unwrap_or_default();
    let (tenant_id, raw) = parse_composite_id(&id, string_at(state, "x_ibm_tenant_id"))?;
    Ok((tenant_id, registration_id(&raw)?))
}

#[async_trait]
impl Resource for SourceRegistrationResource {
    fn type_name(&self) -> &str {
        "ibm_backup_recovery_source_registration"
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
            schema: source_registration_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if string_at(&request.config, "environment").as_deref() == Some("kPhysical")
            && first_block(&request.config, "physical_params").is_none()
        {
            diagnostics.push(
                Diagnostic::error(
                    "Missing physical_params",
                    "kPhysical sources require a physical_params block",
                )
                .with_attribute(AttributePath::new("physical_params")),
            );
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse::failed(not_configured());
        };
        let planned = &request.planned_state;

        let Some(tenant_id) = string_at(planned, "x_ibm_tenant_id") else {
            return CreateResourceResponse::failed(Diagnostic::error(
                "Missing x_ibm_tenant_id",
                "The 'x_ibm_tenant_id' attribute is required",
            ));
        };
        let client = match instance_client(&provider_data.client, planned) {
            Ok(client) => client,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };
        let body = match build_request(planned) {
            Ok(body) => body,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };

        tracing::debug!(
            "registering {} source for tenant {}",
            body.environment,
            tenant_id
        );
        let created = match client.sources().register(&tenant_id, &body).await {
            Ok(registration) => registration,
            Err(e) => {
                return CreateResourceResponse::failed(api_error(
                    "Failed to register source",
                    &e,
                ))
            }
        };

        let mut diagnostics = vec![];
        let registration = match client.sources().get(&tenant_id, created.id).await {
            Ok(registration) => registration,
            Err(e) => {
                diagnostics.push(Diagnostic::warning(
                    "Failed to read back source registration",
                    format!("API error: {}", e),
                ));
                created
            }
        };

        let mut state = planned.clone();
        if let Err(diag) = set(
            &mut state,
            "id",
            Dynamic::String(composite_id(&tenant_id, &registration.id.to_string())),
        )
        .and_then(|_| apply_registration(&mut state, &registration))
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
        if string_at(current, "id").is_none() {
            return ReadResourceResponse::removed();
        }

        let (tenant_id, id) = match state_ids(current) {
            Ok(ids) => ids,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };
        let client = match instance_client(&provider_data.client, current) {
            Ok(client) => client,
            Err(diag) => return ReadResourceResponse::failed(request.current_state, diag),
        };

        tracing::debug!("reading source registration {}", id);
        match client.sources().get(&tenant_id, id).await {
            Ok(registration) => {
                let mut state = request.current_state.clone();
                let result = set(&mut state, "x_ibm_tenant_id", Dynamic::String(tenant_id))
                    .and_then(|_| apply_registration(&mut state, &registration));
                match result {
                    Ok(()) => ReadResourceResponse::found(state, request.private),
                    Err(diag) => ReadResourceResponse::failed(request.current_state, diag),
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("source registration {} no longer exists", id);
                ReadResourceResponse::removed()
            }
            Err(e) => ReadResourceResponse::failed(
                request.current_state,
                api_error("Failed to read source registration", &e),
            ),
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse::failed(request.prior_state, not_configured());
        };
        let planned = &request.planned_state;

        let (tenant_id, id) = match state_ids(&request.prior_state) {
            Ok(ids) => ids,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };
        let client = match instance_client(&provider_data.client, planned) {
            Ok(client) => client,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };
        let body = match build_request(planned) {
            Ok(body) => body,
            Err(diag) => return UpdateResourceResponse::failed(request.prior_state, diag),
        };
        let environment_only = build_request(&request.prior_state)
            .map(|prior| only_environment_changed(&prior, &body))
            .unwrap_or(false);

        let result = if environment_only {
            tracing::debug!(
                "patching source registration {} to {}",
                id,
                body.environment
            );
            let patch = PatchSourceRegistrationRequest {
                environment: body.environment.clone(),
            };
            client.sources().patch(&tenant_id, id, &patch).await
        } else {
            tracing::debug!("updating source registration {}", id);
            client.sources().update(&tenant_id, id, &body).await
        };

        match result {
            Ok(registration) => {
                let mut state = planned.clone();
                let mut diagnostics = vec![];
                if let Err(diag) = set(
                    &mut state,
                    "id",
                    Dynamic::String(composite_id(&tenant_id, &id.to_string())),
                )
                .and_then(|_| apply_registration(&mut state, &registration))
                {
                    diagnostics.push(diag);
                }
                UpdateResourceResponse {
                    new_state: state,
                    private: vec![],
                    diagnostics,
                    new_identity: None,
                }
            }
            Err(e) => UpdateResourceResponse::failed(
                request.prior_state,
                api_error("Failed to update source registration", &e),
            ),
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };
        let prior = &request.prior_state;

        let (tenant_id, id) = match state_ids(prior) {
            Ok(ids) => ids,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };
        let client = match instance_client(&provider_data.client, prior) {
            Ok(client) => client,
            Err(diag) => return DeleteResourceResponse { diagnostics: vec![diag] },
        };

        tracing::debug!("unregistering source {}", id);
        match client.sources().delete(&tenant_id, id).await {
            Ok(()) => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) if e.is_not_found() => DeleteResourceResponse { diagnostics: vec![] },
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![api_error("Failed to delete source registration", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SourceRegistrationResource {
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

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for SourceRegistrationResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = import_tenant_scoped(&request);
        if let Some((_, raw)) = request.id.split_once(super::common::ID_SEPARATOR) {
            if let Err(diag) = registration_id(raw) {
                response.imported_resources.clear();
                response.diagnostics.push(diag);
            }
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn physical_config() -> DynamicValue {
        DynamicValue::new(object([
            ("x_ibm_tenant_id", Dynamic::from("tenant-a/")),
            ("environment", Dynamic::from("kPhysical")),
            ("name", Dynamic::from("db-host-01")),
            ("connection_id", Dynamic::from("5128356219792164864")),
            (
                "physical_params",
                Dynamic::List(vec![object([
                    ("endpoint", Dynamic::from("10.0.4.20")),
                    ("host_type", Dynamic::from("kLinux")),
                    ("physical_type", Dynamic::from("kHost")),
                    ("applications", Dynamic::List(vec![Dynamic::from("kSQL")])),
                ])]),
            ),
        ]))
    }

    #[test]
    fn build_request_maps_physical_params() {
        let request = build_request(&physical_config()).unwrap();
        assert_eq!(request.environment, "kPhysical");
        assert_eq!(request.connection_id, Some(5128356219792164864));
        let params = request.physical_params.unwrap();
        assert_eq!(params.endpoint, "10.0.4.20");
        assert_eq!(params.applications, Some(vec!["kSQL".to_string()]));
        assert!(request.connections.is_none());
    }

    #[test]
    fn connection_ids_go_over_the_wire_as_numbers() {
        let mut config = physical_config();
        config
            .set_value(
                &AttributePath::new("connections"),
                Dynamic::List(vec![object([("connection_id", Dynamic::from("42"))])]),
            )
            .unwrap();

        let body = serde_json::to_value(build_request(&config).unwrap()).unwrap();
        assert_eq!(body["connectionId"], serde_json::json!(5128356219792164864i64));
        assert_eq!(body["connections"][0]["connectionId"], serde_json::json!(42));
    }

    #[test]
    fn non_numeric_connection_id_is_rejected() {
        let mut config = physical_config();
        config
            .set_string(&AttributePath::new("connection_id"), "conn-a".to_string())
            .unwrap();

        let diag = build_request(&config).unwrap_err();
        assert_eq!(diag.summary, "Invalid connection_id");
        assert_eq!(diag.attribute, Some(AttributePath::new("connection_id")));
    }

    #[test]
    fn environment_only_change_is_detected() {
        let prior = build_request(&physical_config()).unwrap();

        let mut planned = prior.clone();
        planned.environment = "kSQL".to_string();
        assert!(only_environment_changed(&prior, &planned));

        planned.name = Some("renamed".to_string());
        assert!(!only_environment_changed(&prior, &planned));

        assert!(!only_environment_changed(&prior, &prior));
    }

    #[test]
    fn apply_registration_keeps_encryption_key() {
        let registration: SourceRegistration = serde_json::from_str(
            r#"{"id":77,"sourceId":12,"environment":"kPhysical",
                "sourceInfo":{"id":12,"name":"db-host-01","environment":"kPhysical"},
                "physicalParams":{"endpoint":"10.0.4.20","hostType":"kLinux"}}"#,
        )
        .unwrap();

        let mut state = physical_config();
        state
            .set_string(&AttributePath::new("encryption_key"), "secret".to_string())
            .unwrap();
        apply_registration(&mut state, &registration).unwrap();

        assert_eq!(i64_at(&state, "registration_id"), Some(77));
        assert_eq!(i64_at(&state, "source_id"), Some(12));
        assert_eq!(string_at(&state, "name").as_deref(), Some("db-host-01"));
        assert_eq!(string_at(&state, "encryption_key").as_deref(), Some("secret"));
        let info = blocks(&state, "source_info");
        assert_eq!(string_at(&info[0], "environment").as_deref(), Some("kPhysical"));
    }

    #[test]
    fn apply_registration_formats_connection_ids() {
        let registration: SourceRegistration = serde_json::from_str(
            r#"{"id":77,"environment":"kPhysical","connectionId":5128356219792164864,
                "connections":[{"connectionId":5128356219792164865,"entityId":3}]}"#,
        )
        .unwrap();

        let mut state = physical_config();
        apply_registration(&mut state, &registration).unwrap();

        assert_eq!(
            string_at(&state, "connection_id").as_deref(),
            Some("5128356219792164864")
        );
        let connections = blocks(&state, "connections");
        assert_eq!(
            string_at(&connections[0], "connection_id").as_deref(),
            Some("5128356219792164865")
        );
    }

    #[tokio::test]
    async fn import_rejects_non_numeric_id() {
        let resource = SourceRegistrationResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "ibm_backup_recovery_source_registration".to_string(),
                    id: "tenant-a/::abc".to_string(),
                    client_capabilities: Default::default(),
                    identity: None,
                },
            )
            .await;
        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid resource ID");
    }
}
