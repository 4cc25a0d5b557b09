//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! Generated at build time from `proto/tfplugin6.proto` by tonic-build.
//! Several generated names collide with framework types (`DynamicValue`,
//! `Diagnostic`, `Schema`), so refer to these as `proto::Name`.
//!
//! This module also holds the conversions between framework and wire types.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};

use crate::error::{Result, TfplugError};
use crate::types;

/// Decodes a wire value, preferring msgpack. A missing value is null.
pub fn decode_dynamic(value: Option<&DynamicValue>) -> Result<types::DynamicValue> {
    match value {
        Some(v) if !v.msgpack.is_empty() => types::DynamicValue::decode_msgpack(&v.msgpack),
        Some(v) if !v.json.is_empty() => types::DynamicValue::decode_json(&v.json),
        _ => Ok(types::DynamicValue::null()),
    }
}

pub fn encode_dynamic(value: &types::DynamicValue) -> Result<DynamicValue> {
    Ok(DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

impl From<&types::AttributePath> for AttributePath {
    fn from(path: &types::AttributePath) -> Self {
        use attribute_path::step::Selector;
        let steps = path
            .steps
            .iter()
            .map(|step| attribute_path::Step {
                selector: Some(match step {
                    types::AttributePathStep::AttributeName(n) => Selector::AttributeName(n.clone()),
                    types::AttributePathStep::ElementKeyString(k) => {
                        Selector::ElementKeyString(k.clone())
                    }
                    types::AttributePathStep::ElementKeyInt(i) => Selector::ElementKeyInt(*i),
                }),
            })
            .collect();
        AttributePath { steps }
    }
}

impl From<&types::Diagnostic> for Diagnostic {
    fn from(diag: &types::Diagnostic) -> Self {
        let severity = match diag.severity {
            types::DiagnosticSeverity::Invalid => diagnostic::Severity::Invalid,
            types::DiagnosticSeverity::Error => diagnostic::Severity::Error,
            types::DiagnosticSeverity::Warning => diagnostic::Severity::Warning,
        };
        Diagnostic {
            severity: severity as i32,
            summary: diag.summary.clone(),
            detail: diag.detail.clone(),
            attribute: diag.attribute.as_ref().map(AttributePath::from),
        }
    }
}

pub fn diagnostics(diags: &[types::Diagnostic]) -> Vec<Diagnostic> {
    diags.iter().map(Diagnostic::from).collect()
}

/// A single error diagnostic, for failures the framework detects itself
pub fn error_diagnostics(summary: &str, err: impl std::fmt::Display) -> Vec<Diagnostic> {
    diagnostics(&[types::Diagnostic::error(summary, err.to_string())])
}

impl From<&types::ServerCapabilities> for ServerCapabilities {
    fn from(caps: &types::ServerCapabilities) -> Self {
        ServerCapabilities {
            plan_destroy: caps.plan_destroy,
            get_provider_schema_optional: caps.get_provider_schema_optional,
            move_resource_state: caps.move_resource_state,
        }
    }
}

impl From<Option<ClientCapabilities>> for types::ClientCapabilities {
    fn from(caps: Option<ClientCapabilities>) -> Self {
        caps.map(|c| types::ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
    }
}

fn string_kind(kind: crate::schema::StringKind) -> i32 {
    match kind {
        crate::schema::StringKind::Plain => StringKind::Plain as i32,
        crate::schema::StringKind::Markdown => StringKind::Markdown as i32,
    }
}

fn convert_block(block: &crate::schema::Block) -> schema::Block {
    use crate::schema::NestingMode;
    use schema::nested_block::NestingMode as WireNesting;

    let attributes = block
        .attributes
        .iter()
        .map(|attr| schema::Attribute {
            name: attr.name.clone(),
            r#type: attr.r#type.to_json_bytes(),
            nested_type: None,
            description: attr.description.clone(),
            required: attr.required,
            optional: attr.optional,
            computed: attr.computed,
            sensitive: attr.sensitive,
            description_kind: StringKind::Plain as i32,
            deprecated: attr.deprecated,
            write_only: false,
        })
        .collect();

    let block_types = block
        .block_types
        .iter()
        .map(|nested| schema::NestedBlock {
            type_name: nested.type_name.clone(),
            block: Some(convert_block(&nested.block)),
            nesting: match nested.nesting {
                NestingMode::Invalid => WireNesting::Invalid,
                NestingMode::Single => WireNesting::Single,
                NestingMode::List => WireNesting::List,
                NestingMode::Set => WireNesting::Set,
                NestingMode::Map => WireNesting::Map,
                NestingMode::Group => WireNesting::Group,
            } as i32,
            min_items: nested.min_items,
            max_items: nested.max_items,
        })
        .collect();

    schema::Block {
        version: block.version,
        attributes,
        block_types,
        description: block.description.clone(),
        description_kind: string_kind(block.description_kind),
        deprecated: block.deprecated,
    }
}

impl From<&crate::schema::Schema> for Schema {
    fn from(s: &crate::schema::Schema) -> Self {
        Schema {
            version: s.version,
            block: Some(convert_block(&s.block)),
        }
    }
}

impl From<&types::ResourceIdentityData> for ResourceIdentityData {
    fn from(identity: &types::ResourceIdentityData) -> Self {
        ResourceIdentityData {
            identity_data: encode_dynamic(&identity.identity_data).ok(),
        }
    }
}

impl TryFrom<&ResourceIdentityData> for types::ResourceIdentityData {
    type Error = TfplugError;

    fn try_from(identity: &ResourceIdentityData) -> Result<Self> {
        Ok(types::ResourceIdentityData {
            identity_data: decode_dynamic(identity.identity_data.as_ref())?,
        })
    }
}
