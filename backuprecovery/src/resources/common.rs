//! Helpers shared by resources and data sources

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tfplug::plan_modifier::RequiresReplace;
use tfplug::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use tfplug::schema::{AttributeBuilder, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOf;

use crate::api::{endpoints, ApiError, Client, EndpointType, KeyValuePair};
use crate::BackupRecoveryProviderData;

pub const ID_SEPARATOR: &str = "::";

/// Extracts the provider data handed to `configure`
pub fn provider_data(
    data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<BackupRecoveryProviderData, Diagnostic> {
    let data = data.ok_or_else(|| {
        Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )
    })?;
    data.downcast_ref::<BackupRecoveryProviderData>()
        .cloned()
        .ok_or_else(|| {
            Diagnostic::error(
                "Invalid provider data",
                "Failed to extract BackupRecoveryProviderData from provider data",
            )
        })
}

pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub fn api_error(summary: &str, err: &ApiError) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", err))
}

pub fn composite_id(tenant_id: &str, id: &str) -> String {
    format!("{}{}{}", tenant_id, ID_SEPARATOR, id)
}

/// Splits `tenant::id`; a bare ID takes its tenant from `fallback_tenant`
pub fn parse_composite_id(
    id: &str,
    fallback_tenant: Option<String>,
) -> Result<(String, String), Diagnostic> {
    match id.split_once(ID_SEPARATOR) {
        Some((tenant, rest)) if !tenant.is_empty() && !rest.is_empty() => {
            Ok((tenant.to_string(), rest.to_string()))
        }
        Some(_) => Err(invalid_id(id)),
        None => match fallback_tenant {
            Some(tenant) if !id.is_empty() => Ok((tenant, id.to_string())),
            _ => Err(invalid_id(id)),
        },
    }
}

fn invalid_id(id: &str) -> Diagnostic {
    Diagnostic::error(
        "Invalid resource ID",
        format!(
            "expected an ID of the form <tenant_id>{}<id>, got \"{}\"",
            ID_SEPARATOR, id
        ),
    )
    .with_attribute(AttributePath::new("id"))
}

/// Current UTC time, used as the ID of data source reads
pub fn timestamp_id() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Adds `instance_id`, `region` and `endpoint_type`, which point one resource
/// at another service instance than the provider's default
pub fn instance_attributes(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .attribute(
            AttributeBuilder::string("instance_id")
                .description("Backup Recovery instance ID; overrides the provider endpoint")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("region")
                .description("Region of the Backup Recovery instance")
                .optional()
                .plan_modifier(RequiresReplace::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::string("endpoint_type")
                .description("public or private")
                .optional()
                .validator(StringOneOf::create(&["public", "private"]))
                .build(),
        )
}

/// The provider's client, or one derived for the instance named in `config`
pub fn instance_client(
    default: &Arc<Client>,
    config: &DynamicValue,
) -> Result<Arc<Client>, Diagnostic> {
    let instance_id = config.get_string_opt(&AttributePath::new("instance_id"));
    let region = config.get_string_opt(&AttributePath::new("region"));
    let (Some(instance_id), Some(region)) = (instance_id, region) else {
        return Ok(default.clone());
    };

    let endpoint_type = match config.get_string_opt(&AttributePath::new("endpoint_type")) {
        Some(value) => value.parse::<EndpointType>().map_err(|e| {
            Diagnostic::error("Invalid endpoint_type", e.to_string())
                .with_attribute(AttributePath::new("endpoint_type"))
        })?,
        None => EndpointType::default(),
    };

    let url = endpoints::instance_url(&instance_id, &region, endpoint_type);
    tracing::debug!("using instance endpoint {}", url);
    default
        .with_base_url(&url)
        .map(Arc::new)
        .map_err(|e| Diagnostic::error("Invalid service endpoint", e.to_string()))
}

/// Items of a list block, each wrapped for path access
pub fn blocks(value: &DynamicValue, name: &str) -> Vec<DynamicValue> {
    value
        .get_list_opt(&AttributePath::new(name))
        .unwrap_or_default()
        .into_iter()
        .map(DynamicValue::new)
        .collect()
}

/// The single item of a `max_items = 1` block
pub fn first_block(value: &DynamicValue, name: &str) -> Option<DynamicValue> {
    blocks(value, name).into_iter().next()
}

pub fn string_at(value: &DynamicValue, name: &str) -> Option<String> {
    value.get_string_opt(&AttributePath::new(name))
}

pub fn i64_at(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get_i64_opt(&AttributePath::new(name))
}

pub fn bool_at(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool_opt(&AttributePath::new(name))
}

pub fn strings_at(value: &DynamicValue, name: &str) -> Option<Vec<String>> {
    value.get_string_list(&AttributePath::new(name))
}

pub fn i64s_at(value: &DynamicValue, name: &str) -> Option<Vec<i64>> {
    value.get_i64_list(&AttributePath::new(name))
}

pub fn key_values_at(value: &DynamicValue, name: &str) -> Option<Vec<KeyValuePair>> {
    let pairs: Vec<KeyValuePair> = blocks(value, name)
        .iter()
        .filter_map(|item| {
            Some(KeyValuePair {
                key: string_at(item, "key")?,
                value: string_at(item, "value").unwrap_or_default(),
            })
        })
        .collect();
    (!pairs.is_empty()).then_some(pairs)
}

/// An absent value becomes null
pub fn opt<T: Into<Dynamic>>(value: Option<T>) -> Dynamic {
    value.map(Into::into).unwrap_or(Dynamic::Null)
}

pub fn string_list(values: Option<Vec<String>>) -> Dynamic {
    values
        .map(|v| Dynamic::List(v.into_iter().map(Dynamic::String).collect()))
        .unwrap_or(Dynamic::Null)
}

pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Dynamic)>) -> Dynamic {
    Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}

/// A nested list block; an absent list becomes an empty one
pub fn block_list<T>(items: Option<&[T]>, to_object: impl Fn(&T) -> Dynamic) -> Dynamic {
    Dynamic::List(items.unwrap_or_default().iter().map(to_object).collect())
}

pub fn key_values(pairs: Option<&[KeyValuePair]>) -> Dynamic {
    block_list(pairs, |p| {
        object([
            ("key", Dynamic::String(p.key.clone())),
            ("value", Dynamic::String(p.value.clone())),
        ])
    })
}

/// Writes a value computed by the service into `state`
pub fn set(state: &mut DynamicValue, name: &str, value: Dynamic) -> Result<(), Diagnostic> {
    state.set_value(&AttributePath::new(name), value).map_err(|e| {
        Diagnostic::error("Failed to set state", format!("{}: {}", name, e))
            .with_attribute(AttributePath::new(name))
    })
}

/// Imports `tenant::id`, seeding both `id` and `x_ibm_tenant_id` so the
/// following read can locate the object
pub fn import_tenant_scoped(request: &ImportResourceStateRequest) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse {
        imported_resources: vec![],
        diagnostics: vec![],
        deferred: None,
    };

    let (tenant_id, _) = match parse_composite_id(&request.id, None) {
        Ok(parts) => parts,
        Err(diag) => {
            response.diagnostics.push(diag);
            return response;
        }
    };

    let mut state = DynamicValue::object();
    let result = set(&mut state, "id", Dynamic::String(request.id.clone()))
        .and_then(|_| set(&mut state, "x_ibm_tenant_id", Dynamic::String(tenant_id)));
    if let Err(diag) = result {
        response.diagnostics.push(diag);
        return response;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: vec![],
        identity: request.identity.clone(),
    });
    response
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::BearerAuthenticator;

    #[test]
    fn composite_id_round_trips_tenant() {
        let id = composite_id("tenant-a/", "5:1:42");
        assert_eq!(id, "tenant-a/::5:1:42");
        assert_eq!(
            parse_composite_id(&id, None).unwrap(),
            ("tenant-a/".to_string(), "5:1:42".to_string())
        );
    }

    #[test]
    fn bare_id_uses_fallback_tenant() {
        assert_eq!(
            parse_composite_id("42", Some("tenant-b/".to_string())).unwrap(),
            ("tenant-b/".to_string(), "42".to_string())
        );
        assert!(parse_composite_id("42", None).is_err());
        assert!(parse_composite_id("::42", None).is_err());
    }

    #[test]
    fn instance_client_follows_config() {
        let default = Arc::new(
            Client::new(
                "https://default.example.com/v2",
                Arc::new(BearerAuthenticator::new("tok")),
            )
            .unwrap(),
        );

        let mut config = DynamicValue::object();
        assert_eq!(
            instance_client(&default, &config).unwrap().base_url(),
            "https://default.example.com/v2"
        );

        config
            .set_string(&AttributePath::new("instance_id"), "inst1".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("region"), "eu-de".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("endpoint_type"), "private".to_string())
            .unwrap();
        assert_eq!(
            instance_client(&default, &config).unwrap().base_url(),
            "https://inst1.private.eu-de.backup-recovery.cloud.ibm.com/v2"
        );
    }

    #[test]
    fn key_values_skip_pairs_without_key() {
        let mut config = DynamicValue::object();
        config
            .set_list(
                &AttributePath::new("advanced_configs"),
                vec![
                    object([("key", Dynamic::from("retries")), ("value", Dynamic::from("3"))]),
                    object([("key", Dynamic::Null), ("value", Dynamic::from("x"))]),
                ],
            )
            .unwrap();
        let pairs = key_values_at(&config, "advanced_configs").unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "retries");
    }

    #[test]
    fn import_seeds_tenant() {
        let response = import_tenant_scoped(&ImportResourceStateRequest {
            type_name: "ibm_protection_group".to_string(),
            id: "tenant-a/::5:1:42".to_string(),
            client_capabilities: Default::default(),
            identity: None,
        });
        let state = &response.imported_resources[0].state;
        assert_eq!(string_at(state, "x_ibm_tenant_id").as_deref(), Some("tenant-a/"));
        assert_eq!(string_at(state, "id").as_deref(), Some("tenant-a/::5:1:42"));
    }
}
