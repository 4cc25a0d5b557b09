//! gRPC service implementation of the tfplugin6 Provider service
//!
//! Resources and data sources are created through the provider's factories
//! for every call and configured with the stored provider data, so the only
//! shared mutable state is the provider itself and its configure output.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::proto::{self, ProviderService};
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Block, DefaultRequest, NestingMode, PlanModifierRequest, Schema, ValidatorRequest,
};
use crate::types::{
    has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue, ResourceIdentityData,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;
type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct GrpcProviderServer<P: Provider> {
    provider: RwLock<P>,
    provider_data: RwLock<ProviderData>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    ctx: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: RwLock::new(provider),
            provider_data: RwLock::new(None),
            resources,
            data_sources,
            ctx: Context::new(),
        }
    }

    /// Root context handed to every call; cancelled by StopProvider
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    fn new_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>, Status> {
        self.resources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| Status::not_found(format!("unknown resource type: {}", type_name)))
    }

    fn new_data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceWithConfigure>, Status> {
        self.data_sources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| Status::not_found(format!("unknown data source type: {}", type_name)))
    }

    async fn configured_resource(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceWithConfigure>, Vec<Diagnostic>), Status> {
        let mut resource = self.new_resource(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(self.context(), ConfigureResourceRequest { provider_data })
            .await;
        Ok((resource, response.diagnostics))
    }

    async fn configured_data_source(
        &self,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), Status> {
        let mut data_source = self.new_data_source(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(self.context(), ConfigureDataSourceRequest { provider_data })
            .await;
        Ok((data_source, response.diagnostics))
    }

    async fn resource_schema(&self, resource: &dyn ResourceWithConfigure) -> Schema {
        resource
            .schema(self.context(), ResourceSchemaRequest)
            .await
            .schema
    }
}

fn decode(value: Option<&proto::DynamicValue>) -> Result<DynamicValue, Status> {
    proto::decode_dynamic(value).map_err(|e| Status::invalid_argument(e.to_string()))
}

fn encode(value: &DynamicValue) -> Result<proto::DynamicValue, Status> {
    proto::encode_dynamic(value).map_err(|e| Status::internal(e.to_string()))
}

/// Shapes a state to the schema and encodes it for the wire
fn encode_state(schema: &Schema, state: &DynamicValue) -> Result<proto::DynamicValue, Status> {
    encode(&DynamicValue::new(schema.block.conform(&state.value)))
}

fn decode_identity(
    identity: Option<&proto::ResourceIdentityData>,
) -> Result<Option<ResourceIdentityData>, Status> {
    identity
        .map(|i| ResourceIdentityData::try_from(i).map_err(|e| Status::invalid_argument(e.to_string())))
        .transpose()
}

static NULL: Dynamic = Dynamic::Null;

fn child<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    value.as_map().and_then(|m| m.get(name)).unwrap_or(&NULL)
}

fn element(value: &Dynamic, idx: usize) -> &Dynamic {
    value.as_list().and_then(|l| l.get(idx)).unwrap_or(&NULL)
}

/// Checks required attributes, block item counts and attribute validators
pub fn validate_config(block: &Block, value: &Dynamic, path: &AttributePath) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    validate_block(block, value, path, &mut diagnostics);
    diagnostics
}

fn validate_block(
    block: &Block,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !matches!(value, Dynamic::Map(_)) {
        return;
    }

    for attr in &block.attributes {
        let attr_path = path.clone().attribute(&attr.name);
        let v = child(value, &attr.name);
        if attr.required && v.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", attr_path),
                )
                .with_attribute(attr_path.clone()),
            );
            continue;
        }
        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(v.clone()),
                path: attr_path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    for nested in &block.block_types {
        let nested_path = path.clone().attribute(&nested.type_name);
        match child(value, &nested.type_name) {
            Dynamic::Unknown => {}
            Dynamic::List(items) => {
                let count = items.len() as i64;
                if count < nested.min_items {
                    diagnostics.push(
                        Diagnostic::error(
                            "Insufficient blocks",
                            format!(
                                "At least {} \"{}\" blocks are required.",
                                nested.min_items, nested.type_name
                            ),
                        )
                        .with_attribute(nested_path.clone()),
                    );
                }
                if nested.max_items > 0 && count > nested.max_items {
                    diagnostics.push(
                        Diagnostic::error(
                            "Too many blocks",
                            format!(
                                "No more than {} \"{}\" blocks are allowed.",
                                nested.max_items, nested.type_name
                            ),
                        )
                        .with_attribute(nested_path.clone()),
                    );
                }
                for (i, item) in items.iter().enumerate() {
                    validate_block(&nested.block, item, &nested_path.clone().index(i as i64), diagnostics);
                }
            }
            Dynamic::Null if nested.min_items > 0 => {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required block",
                        format!("A \"{}\" block is required.", nested.type_name),
                    )
                    .with_attribute(nested_path),
                );
            }
            item @ Dynamic::Map(_) => validate_block(&nested.block, item, &nested_path, diagnostics),
            _ => {}
        }
    }
}

type ObjectVisitor<'v> =
    dyn FnMut(&Block, &mut HashMap<String, Dynamic>, &Dynamic, &Dynamic, &AttributePath) + 'v;

/// Visits every object of `planned` described by `block`, parents before
/// children, together with the config and prior values at the same position
fn visit_objects(
    block: &Block,
    planned: &mut Dynamic,
    config: &Dynamic,
    prior: &Dynamic,
    path: &AttributePath,
    f: &mut ObjectVisitor<'_>,
) {
    let Dynamic::Map(map) = planned else {
        return;
    };
    f(block, map, config, prior, path);

    for nested in &block.block_types {
        let name = &nested.type_name;
        let cfg = child(config, name);
        let pri = child(prior, name);
        let nested_path = path.clone().attribute(name);
        match (nested.nesting, map.get_mut(name)) {
            (NestingMode::List | NestingMode::Set, Some(Dynamic::List(items))) => {
                for (i, item) in items.iter_mut().enumerate() {
                    visit_objects(
                        &nested.block,
                        item,
                        element(cfg, i),
                        element(pri, i),
                        &nested_path.clone().index(i as i64),
                        f,
                    );
                }
            }
            (NestingMode::Single | NestingMode::Group, Some(item)) => {
                visit_objects(&nested.block, item, cfg, pri, &nested_path, f)
            }
            _ => {}
        }
    }
}

/// Outcome of the framework's planning pass
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plans a create or update:
/// 1. defaults fill optional+computed attributes left null in config
/// 2. on create, or when the plan differs from prior state, computed
///    attributes left null in config become unknown
/// 3. attribute plan modifiers run and collect replacement paths
pub fn plan_change(
    schema: &Schema,
    prior: &DynamicValue,
    proposed: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let root = AttributePath::root();
    let config = &config.value;
    let prior = &schema.block.conform(&prior.value);
    let mut planned = schema.block.conform(&proposed.value);

    visit_objects(&schema.block, &mut planned, config, prior, &root, &mut |block, map, cfg, _, path| {
        for attr in &block.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            if child(cfg, &attr.name).is_null() {
                let response = default.default_value(DefaultRequest {
                    path: path.clone().attribute(&attr.name),
                });
                map.insert(attr.name.clone(), response.value.value);
            }
        }
    });

    if prior.is_null() || !values_equal(prior, &planned) {
        visit_objects(&schema.block, &mut planned, config, prior, &root, &mut |block, map, cfg, _, _| {
            for attr in &block.attributes {
                if attr.computed && attr.default.is_none() && child(cfg, &attr.name).is_null() {
                    map.insert(attr.name.clone(), Dynamic::Unknown);
                }
            }
        });
    }

    let mut requires_replace = vec![];
    let mut diagnostics = vec![];
    visit_objects(&schema.block, &mut planned, config, prior, &root, &mut |block, map, cfg, pri, path| {
        for attr in &block.attributes {
            if attr.plan_modifiers.is_empty() {
                continue;
            }
            let attr_path = path.clone().attribute(&attr.name);
            let mut plan_value = map.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: DynamicValue::new(child(cfg, &attr.name).clone()),
                    state_value: DynamicValue::new(child(pri, &attr.name).clone()),
                    plan_value: DynamicValue::new(plan_value),
                    path: attr_path.clone(),
                });
                plan_value = response.plan_value.value;
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(&attr_path) {
                    requires_replace.push(attr_path.clone());
                }
            }
            map.insert(attr.name.clone(), plan_value);
        }
    });

    PlannedChange {
        planned_state: DynamicValue::new(planned),
        requires_replace,
        diagnostics,
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let provider = self.provider.read().await;
        let metadata = provider
            .metadata(self.context(), ProviderMetadataRequest)
            .await;

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some((&metadata.server_capabilities).into()),
            diagnostics: vec![],
            data_sources: self
                .data_sources
                .keys()
                .map(|name| proto::get_metadata::DataSourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
            resources: self
                .resources
                .keys()
                .map(|name| proto::get_metadata::ResourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let ctx = self.context();
        let provider = self.provider.read().await;
        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let meta_schema = provider
            .meta_schema(ctx.clone(), ProviderMetaSchemaRequest)
            .await;
        let metadata = provider.metadata(ctx.clone(), ProviderMetadataRequest).await;

        let mut diagnostics = provider_schema.diagnostics;
        diagnostics.extend(meta_schema.diagnostics);

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name.clone(), proto::Schema::from(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), proto::Schema::from(&response.schema));
        }

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(proto::Schema::from(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: proto::diagnostics(&diagnostics),
            provider_meta: meta_schema.schema.as_ref().map(proto::Schema::from),
            server_capabilities: Some((&metadata.server_capabilities).into()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let req = request.into_inner();
        let config = decode(req.config.as_ref())?;
        let provider = self.provider.read().await;

        let schema = provider
            .schema(self.context(), ProviderSchemaRequest)
            .await
            .schema;
        let mut diagnostics = validate_config(&schema.block, &config.value, &AttributePath::root());
        if !has_errors(&diagnostics) {
            let response = provider
                .validate(self.context(), ValidateProviderConfigRequest { config })
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: proto::diagnostics(&diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateResourceConfig");
        let config = decode(req.config.as_ref())?;
        let resource = self.new_resource(&req.type_name)?;

        let schema = self.resource_schema(resource.as_ref()).await;
        let mut diagnostics = validate_config(&schema.block, &config.value, &AttributePath::root());
        if !has_errors(&diagnostics) {
            let response = resource
                .validate(
                    self.context(),
                    ValidateResourceConfigRequest {
                        type_name: req.type_name,
                        config,
                        client_capabilities: req.client_capabilities.into(),
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: proto::diagnostics(&diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ValidateDataResourceConfig");
        let config = decode(req.config.as_ref())?;
        let data_source = self.new_data_source(&req.type_name)?;

        let schema = data_source
            .schema(self.context(), DataSourceSchemaRequest)
            .await
            .schema;
        let mut diagnostics = validate_config(&schema.block, &config.value, &AttributePath::root());
        if !has_errors(&diagnostics) {
            let response = data_source
                .validate(
                    self.context(),
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: proto::diagnostics(&diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, version = req.version, "UpgradeResourceState");
        let resource = self.new_resource(&req.type_name)?;
        let schema = self.resource_schema(resource.as_ref()).await;

        let raw = req.raw_state.unwrap_or_default();
        if raw.json.is_empty() {
            let diagnostics = if raw.flatmap.is_empty() {
                vec![]
            } else {
                proto::error_diagnostics(
                    "Unsupported state format",
                    "flatmap state from Terraform 0.11 and earlier cannot be upgraded",
                )
            };
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics,
            }));
        }

        if req.version > schema.version {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: proto::error_diagnostics(
                    "State from a newer provider",
                    format!(
                        "stored schema version {} is newer than {}",
                        req.version, schema.version
                    ),
                ),
            }));
        }

        let state = match DynamicValue::decode_json(&raw.json) {
            Ok(state) => state,
            Err(e) => {
                return Ok(Response::new(proto::upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: proto::error_diagnostics("Failed to decode stored state", e),
                }))
            }
        };

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_state(&schema, &state)?),
            diagnostics: vec![],
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> RpcResult<proto::get_resource_identity_schemas::Response> {
        Ok(Response::new(proto::get_resource_identity_schemas::Response {
            identity_schemas: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let req = request.into_inner();
        let config = decode(req.config.as_ref())?;
        tracing::debug!(terraform_version = %req.terraform_version, "ConfigureProvider");

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    self.context(),
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: req.client_capabilities.into(),
                    },
                )
                .await
        };

        if response.provider_data.is_some() {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: proto::diagnostics(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadResource");
        let current_state = decode(req.current_state.as_ref())?;
        let provider_meta = req.provider_meta.as_ref().map(|m| decode(Some(m))).transpose()?;
        let current_identity = decode_identity(req.current_identity.as_ref())?;

        let (resource, mut diagnostics) = self.configured_resource(&req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: req.current_state,
                diagnostics: proto::diagnostics(&diagnostics),
                private: req.private,
                deferred: None,
                new_identity: req.current_identity,
            }));
        }

        let schema = self.resource_schema(resource.as_ref()).await;
        let response = resource
            .read(
                self.context(),
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state,
                    private: req.private,
                    provider_meta,
                    client_capabilities: req.client_capabilities.into(),
                    current_identity,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        // A null new_state tells Terraform the object is gone
        let new_state = match &response.new_state {
            Some(state) => encode_state(&schema, state)?,
            None => encode(&DynamicValue::null())?,
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(new_state),
            diagnostics: proto::diagnostics(&diagnostics),
            private: response.private,
            deferred: None,
            new_identity: response.new_identity.as_ref().map(Into::into),
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "PlanResourceChange");
        let prior_state = decode(req.prior_state.as_ref())?;
        let proposed = decode(req.proposed_new_state.as_ref())?;
        let config = decode(req.config.as_ref())?;
        let provider_meta = req.provider_meta.as_ref().map(|m| decode(Some(m))).transpose()?;

        // destroy plans pass through untouched
        if proposed.is_null() {
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: req.proposed_new_state,
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
                deferred: None,
                planned_identity: req.prior_identity,
            }));
        }

        let (resource, mut diagnostics) = self.configured_resource(&req.type_name).await?;
        let schema = self.resource_schema(resource.as_ref()).await;

        let planned = plan_change(&schema, &prior_state, &proposed, &config);
        let mut planned_state = planned.planned_state;
        let mut requires_replace = planned.requires_replace;
        let mut planned_private = req.prior_private;
        diagnostics.extend(planned.diagnostics);

        if let Some(modifier) = resource.as_modify_plan() {
            if !has_errors(&diagnostics) {
                let response = modifier
                    .modify_plan(
                        self.context(),
                        ModifyPlanRequest {
                            type_name: req.type_name,
                            config,
                            prior_state,
                            proposed_new_state: planned_state.clone(),
                            prior_private: planned_private.clone(),
                            provider_meta,
                        },
                    )
                    .await;
                planned_state = response.planned_state;
                planned_private = response.planned_private;
                for path in response.requires_replace {
                    if !requires_replace.contains(&path) {
                        requires_replace.push(path);
                    }
                }
                diagnostics.extend(response.diagnostics);
            }
        }

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_state(&schema, &planned_state)?),
            requires_replace: requires_replace.iter().map(Into::into).collect(),
            planned_private,
            diagnostics: proto::diagnostics(&diagnostics),
            legacy_type_system: false,
            deferred: None,
            planned_identity: req.prior_identity,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let req = request.into_inner();
        let prior_state = decode(req.prior_state.as_ref())?;
        let planned_state = decode(req.planned_state.as_ref())?;
        let config = decode(req.config.as_ref())?;
        let provider_meta = req.provider_meta.as_ref().map(|m| decode(Some(m))).transpose()?;
        let planned_identity = decode_identity(req.planned_identity.as_ref())?;

        let (resource, mut diagnostics) = self.configured_resource(&req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: req.prior_state,
                private: req.planned_private,
                diagnostics: proto::diagnostics(&diagnostics),
                legacy_type_system: false,
                new_identity: None,
            }));
        }
        let schema = self.resource_schema(resource.as_ref()).await;

        let (new_state, private, new_identity) = if planned_state.is_null() {
            tracing::debug!(type_name = %req.type_name, "ApplyResourceChange: delete");
            let response = resource
                .delete(
                    self.context(),
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);
            let state = if failed { prior_state } else { DynamicValue::null() };
            (state, vec![], None)
        } else if prior_state.is_null() {
            tracing::debug!(type_name = %req.type_name, "ApplyResourceChange: create");
            let response = resource
                .create(
                    self.context(),
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state: planned_state.clone(),
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);
            if failed {
                (DynamicValue::null(), vec![], None)
            } else {
                let mut state = planned_state;
                state.fill_unknowns(&response.new_state);
                (state, response.private, None)
            }
        } else {
            tracing::debug!(type_name = %req.type_name, "ApplyResourceChange: update");
            let response = resource
                .update(
                    self.context(),
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_state: planned_state.clone(),
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                        planned_identity,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);
            if failed {
                (prior_state, vec![], None)
            } else {
                let mut state = planned_state;
                state.fill_unknowns(&response.new_state);
                (state, response.private, response.new_identity)
            }
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_state(&schema, &new_state)?),
            private,
            diagnostics: proto::diagnostics(&diagnostics),
            legacy_type_system: false,
            new_identity: new_identity.as_ref().map(Into::into),
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, id = %req.id, "ImportResourceState");
        let identity = decode_identity(req.identity.as_ref())?;

        let (resource, mut diagnostics) = self.configured_resource(&req.type_name).await?;
        let Some(importer) = resource.as_import_state() else {
            diagnostics.push(Diagnostic::error(
                "Resource import not supported",
                format!("{} does not support terraform import", req.type_name),
            ));
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: proto::diagnostics(&diagnostics),
                deferred: None,
            }));
        };

        let schema = self.resource_schema(resource.as_ref()).await;
        let response = importer
            .import_state(
                self.context(),
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: req.client_capabilities.into(),
                    identity,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in &response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name.clone(),
                state: Some(encode_state(&schema, &imported.state)?),
                private: imported.private.clone(),
                identity: imported.identity.as_ref().map(Into::into),
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: proto::diagnostics(&diagnostics),
            deferred: None,
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let req = request.into_inner();
        tracing::debug!(type_name = %req.type_name, "ReadDataSource");
        let config = decode(req.config.as_ref())?;
        let provider_meta = req.provider_meta.as_ref().map(|m| decode(Some(m))).transpose()?;

        let (data_source, mut diagnostics) = self.configured_data_source(&req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: req.config,
                diagnostics: proto::diagnostics(&diagnostics),
                deferred: None,
            }));
        }

        let schema = data_source
            .schema(self.context(), DataSourceSchemaRequest)
            .await
            .schema;
        let response = data_source
            .read(
                self.context(),
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta,
                    client_capabilities: req.client_capabilities.into(),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_state(&schema, &response.state)?),
            diagnostics: proto::diagnostics(&diagnostics),
            deferred: None,
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        tracing::debug!("StopProvider");
        let response = {
            let provider = self.provider.read().await;
            provider.stop(self.context(), StopProviderRequest).await
        };
        self.ctx.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}
