//! Schema types and builders for tfplug
//!
//! Schemas describe the attributes and nested blocks of providers, resources
//! and data sources, along with the validators, plan modifiers and defaults
//! the framework runs against them.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;
use std::sync::Arc;

/// AttributeType mirrors the cty type system Terraform uses
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    /// Builds an object type from (name, type) pairs
    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, AttributeType)>) -> Self {
        AttributeType::Object(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }

    /// JSON type constraint as Terraform expects it:
    /// `"string"`, `["list","string"]`, `["object",{"a":"number"}]`
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.to_json()))
                    .collect();
                json!(["object", fields])
            }
        }
    }

    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Shapes `value` to this type: objects gain missing fields as null and
    /// lose fields the type does not declare
    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => value.clone(),
            (AttributeType::Object(fields), Dynamic::Map(map)) => Dynamic::Map(
                fields
                    .iter()
                    .map(|(name, ty)| {
                        let v = map.get(name).map(|v| ty.conform(v)).unwrap_or(Dynamic::Null);
                        (name.clone(), v)
                    })
                    .collect(),
            ),
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                Dynamic::List(items.iter().map(|item| elem.conform(item)).collect())
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => Dynamic::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), elem.conform(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    /// The object type of one instance of this block
    pub fn object_type(&self) -> AttributeType {
        let mut fields: HashMap<String, AttributeType> = self
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.r#type.clone()))
            .collect();
        for nested in &self.block_types {
            fields.insert(nested.type_name.clone(), nested.value_type());
        }
        AttributeType::Object(fields)
    }

    /// Shapes an object value to this block: every attribute is present
    /// (null when unset), list and set blocks default to empty lists, and
    /// keys the schema does not know are dropped
    pub fn conform(&self, value: &Dynamic) -> Dynamic {
        let map = match value {
            Dynamic::Map(map) => map,
            other => return other.clone(),
        };

        let mut out = HashMap::with_capacity(self.attributes.len() + self.block_types.len());
        for attr in &self.attributes {
            let v = map
                .get(&attr.name)
                .map(|v| attr.r#type.conform(v))
                .unwrap_or(Dynamic::Null);
            out.insert(attr.name.clone(), v);
        }
        for nested in &self.block_types {
            let v = match (nested.nesting, map.get(&nested.type_name)) {
                (NestingMode::List | NestingMode::Set, Some(Dynamic::List(items))) => {
                    Dynamic::List(items.iter().map(|i| nested.block.conform(i)).collect())
                }
                (NestingMode::List | NestingMode::Set, Some(Dynamic::Unknown)) => Dynamic::Unknown,
                (NestingMode::List | NestingMode::Set, _) => Dynamic::List(vec![]),
                (NestingMode::Map, Some(Dynamic::Map(entries))) => Dynamic::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), nested.block.conform(v)))
                        .collect(),
                ),
                (NestingMode::Map, _) => Dynamic::Map(HashMap::new()),
                (_, Some(v)) => nested.block.conform(v),
                (_, None) => Dynamic::Null,
            };
            out.insert(nested.type_name.clone(), v);
        }
        Dynamic::Map(out)
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub deprecated: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("validators", &self.validators.len())
            .field("plan_modifiers", &self.plan_modifiers.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    /// Type of the value this block occupies in its parent object
    pub fn value_type(&self) -> AttributeType {
        let object = self.block.object_type();
        match self.nesting {
            NestingMode::List => AttributeType::list(object),
            NestingMode::Set => AttributeType::set(object),
            NestingMode::Map => AttributeType::map(object),
            NestingMode::Single | NestingMode::Group | NestingMode::Invalid => object,
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StringKind {
    #[default]
    Plain,
    Markdown,
}

/// Validator checks a configured attribute value
pub trait Validator: Send + Sync {
    fn description(&self) -> String;
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier adjusts planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> String;
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    /// Prior state value, null on create
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default supplies a value for an optional+computed attribute left unset
pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

pub struct DefaultRequest {
    pub path: AttributePath,
}

pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                deprecated: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn string_list(name: &str) -> Self {
        Self::new(name, AttributeType::list(AttributeType::String))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Setting a default also makes the attribute computed, which Terraform
    /// requires for provider-supplied values
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self.attribute.computed = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds repeated or single nested blocks
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: <Block as std::default::Default>::default(),
                nesting,
                min_items: 0,
                max_items: 0,
            },
        }
    }

    pub fn list(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::List)
    }

    pub fn set(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::Set)
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: <Block as std::default::Default>::default(),
            },
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(AttributeBuilder::string("name").required().build())
            .block(
                NestedBlockBuilder::list("start_time")
                    .max_items(1)
                    .attribute(AttributeBuilder::number("hour").required().build())
                    .attribute(AttributeBuilder::number("minute").required().build())
                    .build(),
            )
            .build()
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::new("name", AttributeType::String)
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
        assert_eq!(attr.description, "The name of the resource");
    }

    #[test]
    fn cloned_attribute_keeps_validators() {
        struct Noop;
        impl Validator for Noop {
            fn description(&self) -> String {
                "noop".to_string()
            }
            fn validate(&self, _request: ValidatorRequest) -> ValidatorResponse {
                ValidatorResponse {
                    diagnostics: vec![],
                }
            }
        }

        let attr = AttributeBuilder::string("name")
            .optional()
            .validator(Box::new(Noop))
            .build();
        assert_eq!(attr.clone().validators.len(), 1);
    }

    #[test]
    fn type_json_encoding() {
        assert_eq!(AttributeType::String.to_json_bytes(), b"\"string\"".to_vec());
        assert_eq!(
            AttributeType::list(AttributeType::Number).to_json(),
            serde_json::json!(["list", "number"])
        );
        assert_eq!(
            AttributeType::object([("key", AttributeType::String)]).to_json(),
            serde_json::json!(["object", {"key": "string"}])
        );
    }

    #[test]
    fn block_object_type_includes_nested_blocks() {
        let ty = group_schema().block.object_type();
        let AttributeType::Object(fields) = ty else {
            panic!("expected object type");
        };
        assert_eq!(fields.get("name"), Some(&AttributeType::String));
        assert_eq!(
            fields.get("start_time"),
            Some(&AttributeType::list(AttributeType::object([
                ("hour", AttributeType::Number),
                ("minute", AttributeType::Number),
            ])))
        );
    }

    #[test]
    fn conform_fills_missing_and_drops_unknown_keys() {
        let schema = group_schema();
        let mut input = HashMap::new();
        input.insert("name".to_string(), Dynamic::from("pg"));
        input.insert("stray".to_string(), Dynamic::from("x"));

        let out = schema.block.conform(&Dynamic::Map(input));
        let map = out.as_map().unwrap();

        assert_eq!(map.get("id"), Some(&Dynamic::Null));
        assert_eq!(map.get("start_time"), Some(&Dynamic::List(vec![])));
        assert!(!map.contains_key("stray"));
    }

    #[test]
    fn conform_shapes_object_list_attributes() {
        let ty = AttributeType::list(AttributeType::object([
            ("id", AttributeType::String),
            ("name", AttributeType::String),
        ]));
        let mut item = HashMap::new();
        item.insert("id".to_string(), Dynamic::from("1"));

        let out = ty.conform(&Dynamic::List(vec![Dynamic::Map(item)]));
        let first = out.as_list().unwrap()[0].as_map().unwrap();
        assert_eq!(first.get("name"), Some(&Dynamic::Null));
    }
}
