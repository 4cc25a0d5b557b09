//! Default value providers for attributes
//!
//! Defaults are evaluated during planning for optional+computed attributes
//! whose configuration value is null.
//!
//! ```rust,ignore
//! use tfplug::defaults::StaticDefault;
//! use tfplug::schema::AttributeBuilder;
//!
//! let time_zone = AttributeBuilder::string("time_zone")
//!     .optional()
//!     .default(StaticDefault::string("America/Los_Angeles"))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;

/// StaticDefault provides a fixed value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Box<dyn Default> {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// EnvDefault reads the default from an environment variable
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// No fallback: the attribute stays null when the variable is unset
    pub fn create_optional(env_var: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!("defaults to ${} or \"{}\"", self.env_var, fallback),
            None => format!("defaults to ${}", self.env_var),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = env::var(&self.env_var)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.fallback.clone())
            .map(Dynamic::String)
            .unwrap_or(Dynamic::Null);

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn request() -> DefaultRequest {
        DefaultRequest {
            path: AttributePath::new("test"),
        }
    }

    #[test]
    fn static_default_string() {
        let default = StaticDefault::string("America/Los_Angeles");
        let response = default.default_value(request());
        assert_eq!(response.value.value, Dynamic::from("America/Los_Angeles"));
        assert!(default.description().contains("America/Los_Angeles"));
    }

    #[test]
    fn static_default_scalars_and_lists() {
        assert_eq!(
            StaticDefault::number(30.0).default_value(request()).value.value,
            Dynamic::Number(30.0)
        );
        assert_eq!(
            StaticDefault::bool(false).default_value(request()).value.value,
            Dynamic::Bool(false)
        );
        assert_eq!(
            StaticDefault::list(vec![Dynamic::from("a")])
                .default_value(request())
                .value
                .value,
            Dynamic::from(vec!["a"])
        );
    }

    #[test]
    fn env_default_falls_back_when_unset() {
        let default = EnvDefault::create("TFPLUG_TEST_UNSET_VARIABLE", "us-south");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::from("us-south")
        );
    }

    #[test]
    fn env_default_reads_variable() {
        env::set_var("TFPLUG_TEST_REGION_DEFAULT", "eu-de");
        let default = EnvDefault::create("TFPLUG_TEST_REGION_DEFAULT", "us-south");
        assert_eq!(
            default.default_value(request()).value.value,
            Dynamic::from("eu-de")
        );
        env::remove_var("TFPLUG_TEST_REGION_DEFAULT");
    }

    #[test]
    fn env_default_without_fallback_is_null() {
        let default = EnvDefault::create_optional("TFPLUG_TEST_ANOTHER_UNSET_VARIABLE");
        assert!(default.default_value(request()).value.is_null());
    }
}
