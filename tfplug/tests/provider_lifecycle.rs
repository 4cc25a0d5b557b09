#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::data_source::*;
use tfplug::grpc::GrpcProviderServer;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::proto::{self, ProviderService};
use tfplug::provider::*;
use tfplug::resource::*;
use tfplug::schema::{AttributeBuilder, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};
use tfplug::validator::NumberRangeValidator;
use tonic::Request;

type Store = Arc<Mutex<HashMap<String, DynamicValue>>>;

/// A provider backed by an in-memory object store
#[derive(Default)]
struct StoreProvider {
    store: Store,
}

#[async_trait]
impl Provider for StoreProvider {
    fn type_name(&self) -> &str {
        "store"
    }

    async fn metadata(&self, _ctx: Context, _req: ProviderMetadataRequest) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "store".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(&self, _ctx: Context, _req: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(AttributeBuilder::string("endpoint").required().build())
                .build(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _req: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _req: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        req: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        if req.config.get_string_opt(&AttributePath::new("endpoint")).is_none() {
            return ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error("Missing endpoint", "endpoint is required")],
                provider_data: None,
            };
        }
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(self.store.clone())),
        }
    }

    async fn stop(&self, _ctx: Context, _req: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut map: HashMap<String, ResourceFactory> = HashMap::new();
        map.insert(
            "store_object".to_string(),
            Box::new(|| Box::new(ObjectResource::default()) as Box<dyn ResourceWithConfigure>),
        );
        map
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut map: HashMap<String, DataSourceFactory> = HashMap::new();
        map.insert(
            "store_objects".to_string(),
            Box::new(|| Box::new(ObjectsDataSource::default()) as Box<dyn DataSourceWithConfigure>),
        );
        map
    }
}

#[derive(Default)]
struct ObjectResource {
    store: Option<Store>,
}

fn object_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::string("id")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("bucket")
                .required()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(AttributeBuilder::string("label").optional().build())
        .attribute(AttributeBuilder::number("revision").computed().build())
        .block(
            NestedBlockBuilder::list("retention")
                .max_items(1)
                .attribute(
                    AttributeBuilder::number("days")
                        .required()
                        .validator(NumberRangeValidator::between(1.0, 365.0))
                        .build(),
                )
                .build(),
        )
        .build()
}

impl ObjectResource {
    fn store(&self) -> Result<&Store, Diagnostic> {
        self.store
            .as_ref()
            .ok_or_else(|| Diagnostic::error("Provider not configured", "no store"))
    }
}

#[async_trait]
impl Resource for ObjectResource {
    fn type_name(&self) -> &str {
        "store_object"
    }

    async fn metadata(&self, _ctx: Context, _req: ResourceMetadataRequest) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "store_object".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _req: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: object_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _req: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, req: CreateResourceRequest) -> CreateResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => return CreateResourceResponse::failed(diag),
        };
        let bucket = req
            .planned_state
            .get_string_opt(&AttributePath::new("bucket"))
            .unwrap_or_default();
        let id = format!("{}::{}", bucket, store.lock().unwrap().len() + 1);

        let mut state = req.planned_state.clone();
        state.set_string(&AttributePath::new("id"), id.clone()).unwrap();
        state.set_i64(&AttributePath::new("revision"), 1).unwrap();
        store.lock().unwrap().insert(id, state.clone());

        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, req: ReadResourceRequest) -> ReadResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => return ReadResourceResponse::failed(req.current_state, diag),
        };
        let id = req
            .current_state
            .get_string_opt(&AttributePath::new("id"))
            .unwrap_or_default();
        let found = store.lock().unwrap().get(&id).cloned();
        match found {
            Some(state) => ReadResourceResponse::found(state, req.private),
            None => ReadResourceResponse::removed(),
        }
    }

    async fn update(&self, _ctx: Context, req: UpdateResourceRequest) -> UpdateResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => return UpdateResourceResponse::failed(req.prior_state, diag),
        };
        let id = req
            .prior_state
            .get_string_opt(&AttributePath::new("id"))
            .unwrap_or_default();
        let revision = req
            .prior_state
            .get_i64_opt(&AttributePath::new("revision"))
            .unwrap_or(0);

        let mut state = req.planned_state.clone();
        state.set_i64(&AttributePath::new("revision"), revision + 1).unwrap();
        store.lock().unwrap().insert(id, state.clone());

        UpdateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
            new_identity: None,
        }
    }

    async fn delete(&self, _ctx: Context, req: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];
        match self.store() {
            Ok(store) => {
                let id = req
                    .prior_state
                    .get_string_opt(&AttributePath::new("id"))
                    .unwrap_or_default();
                store.lock().unwrap().remove(&id);
            }
            Err(diag) => diagnostics.push(diag),
        }
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ObjectResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        req: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.store = req
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[derive(Default)]
struct ObjectsDataSource {
    store: Option<Store>,
}

#[async_trait]
impl DataSource for ObjectsDataSource {
    fn type_name(&self) -> &str {
        "store_objects"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _req: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "store_objects".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _req: DataSourceSchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(AttributeBuilder::string("id").computed().build())
                .attribute(AttributeBuilder::string_list("ids").computed().build())
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _req: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, req: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(store) = &self.store else {
            return ReadDataSourceResponse::failed(
                req.config,
                Diagnostic::error("Provider not configured", "no store"),
            );
        };
        let mut ids: Vec<String> = store.lock().unwrap().keys().cloned().collect();
        ids.sort();

        let mut state = req.config.clone();
        state.set_string(&AttributePath::new("id"), "all".to_string()).unwrap();
        state
            .set_list(
                &AttributePath::new("ids"),
                ids.into_iter().map(Dynamic::String).collect(),
            )
            .unwrap();
        ReadDataSourceResponse::new(state)
    }
}

#[async_trait]
impl DataSourceWithConfigure for ObjectsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        req: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.store = req
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

fn wire(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::encode_dynamic(value).unwrap())
}

fn unwire(value: Option<proto::DynamicValue>) -> DynamicValue {
    proto::decode_dynamic(value.as_ref()).unwrap()
}

fn object(pairs: &[(&str, Dynamic)]) -> DynamicValue {
    let mut value = DynamicValue::object();
    for (key, v) in pairs {
        value.set_value(&AttributePath::new(key), v.clone()).unwrap();
    }
    value
}

async fn configure(server: &GrpcProviderServer<StoreProvider>, endpoint: Option<&str>) -> Vec<proto::Diagnostic> {
    let config = object(&[("endpoint", endpoint.into())]);
    server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: wire(&config),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner()
        .diagnostics
}

async fn plan(
    server: &GrpcProviderServer<StoreProvider>,
    prior: Option<&DynamicValue>,
    config: &DynamicValue,
) -> proto::plan_resource_change::Response {
    // Terraform proposes prior values for computed attributes left out of config
    let mut proposed = config.clone();
    if let Some(prior) = prior {
        for name in ["id", "revision"] {
            if let Some(v) = prior.get(&AttributePath::new(name)) {
                proposed.set_value(&AttributePath::new(name), v.clone()).unwrap();
            }
        }
    }
    server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "store_object".to_string(),
            prior_state: prior.and_then(wire),
            proposed_new_state: wire(&proposed),
            config: wire(config),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

async fn apply(
    server: &GrpcProviderServer<StoreProvider>,
    prior: Option<&DynamicValue>,
    planned: Option<proto::DynamicValue>,
    config: &DynamicValue,
) -> proto::apply_resource_change::Response {
    server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "store_object".to_string(),
            prior_state: prior.and_then(wire),
            planned_state: planned,
            config: wire(config),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test(flavor = "multi_thread")]
async fn configure_requires_endpoint() {
    let server = GrpcProviderServer::new(StoreProvider::default());

    let validation = server
        .validate_provider_config(Request::new(proto::validate_provider_config::Request {
            config: wire(&DynamicValue::object()),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(validation.diagnostics.len(), 1);
    assert_eq!(validation.diagnostics[0].summary, "Missing required argument");

    let diagnostics = configure(&server, None).await;
    assert_eq!(diagnostics[0].summary, "Missing endpoint");

    // resources still get built but report that the provider is unconfigured
    let config = object(&[("bucket", "b".into())]);
    let planned = plan(&server, None, &config).await.planned_state;
    let response = apply(&server, None, planned, &config).await;
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    assert!(unwire(response.new_state).is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn full_resource_lifecycle() {
    let server = GrpcProviderServer::new(StoreProvider::default());
    assert!(configure(&server, Some("memory://")).await.is_empty());

    // create
    let config = object(&[("bucket", "logs".into()), ("label", "v1".into())]);
    let planned = plan(&server, None, &config).await;
    let planned_state = unwire(planned.planned_state.clone());
    assert!(planned_state.get(&AttributePath::new("id")).unwrap().is_unknown());
    assert!(planned_state.get(&AttributePath::new("revision")).unwrap().is_unknown());

    let created = apply(&server, None, planned.planned_state, &config).await;
    assert!(created.diagnostics.is_empty());
    let state = unwire(created.new_state);
    assert_eq!(state.get_string_opt(&AttributePath::new("id")).as_deref(), Some("logs::1"));
    assert_eq!(state.get_i64_opt(&AttributePath::new("revision")), Some(1));

    // read
    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "store_object".to_string(),
            current_state: wire(&state),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(unwire(read.new_state), state);

    // in-place update keeps the id and bumps the revision
    let config = object(&[("bucket", "logs".into()), ("label", "v2".into())]);
    let planned = plan(&server, Some(&state), &config).await;
    assert!(planned.requires_replace.is_empty());
    let planned_state = unwire(planned.planned_state.clone());
    assert_eq!(
        planned_state.get_string_opt(&AttributePath::new("id")).as_deref(),
        Some("logs::1")
    );
    let updated = apply(&server, Some(&state), planned.planned_state, &config).await;
    let state = unwire(updated.new_state);
    assert_eq!(state.get_i64_opt(&AttributePath::new("revision")), Some(2));
    assert_eq!(state.get_string_opt(&AttributePath::new("label")).as_deref(), Some("v2"));

    // changing the bucket forces replacement
    let config = object(&[("bucket", "archive".into()), ("label", "v2".into())]);
    let planned = plan(&server, Some(&state), &config).await;
    assert_eq!(planned.requires_replace.len(), 1);

    // delete, after which a read drops the object
    let deleted = apply(&server, Some(&state), wire(&DynamicValue::null()), &config).await;
    assert!(deleted.diagnostics.is_empty());
    assert!(unwire(deleted.new_state).is_null());

    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "store_object".to_string(),
            current_state: wire(&state),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(unwire(read.new_state).is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_block_validators_run() {
    let server = GrpcProviderServer::new(StoreProvider::default());
    let retention = Dynamic::List(vec![object(&[("days", Dynamic::from(400i64))]).value]);
    let config = object(&[("bucket", "logs".into()), ("retention", retention)]);

    let response = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "store_object".to_string(),
            config: wire(&config),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    let steps = &response.diagnostics[0].attribute.as_ref().unwrap().steps;
    assert_eq!(steps.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_reads_share_configured_data() {
    let server = Arc::new(GrpcProviderServer::new(StoreProvider::default()));
    configure(&server, Some("memory://")).await;

    let config = object(&[("bucket", "logs".into())]);
    let planned = plan(&server, None, &config).await;
    apply(&server, None, planned.planned_state, &config).await;

    let reads = (0..8).map(|_| {
        let server = server.clone();
        async move {
            server
                .read_data_source(Request::new(proto::read_data_source::Request {
                    type_name: "store_objects".to_string(),
                    config: wire(&DynamicValue::object()),
                    ..Default::default()
                }))
                .await
                .unwrap()
                .into_inner()
        }
    });

    for response in futures::future::join_all(reads).await {
        let state = unwire(response.state);
        assert_eq!(
            state.get_string_list(&AttributePath::new("ids")),
            Some(vec!["logs::1".to_string()])
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn metadata_lists_every_type() {
    let server = GrpcProviderServer::new(StoreProvider::default());
    let metadata = server
        .get_metadata(Request::new(proto::get_metadata::Request {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(metadata.resources[0].type_name, "store_object");
    assert_eq!(metadata.data_sources[0].type_name, "store_objects");
}
