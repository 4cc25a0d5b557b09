//! Built-in attribute validators
//!
//! Validators only inspect known values; null and unknown configuration is
//! left to the required-attribute checks and to apply time.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

fn known(request: &ValidatorRequest) -> Option<&Dynamic> {
    match &request.config_value.value {
        Dynamic::Null | Dynamic::Unknown => None,
        value => Some(value),
    }
}

/// Accepts only strings from a fixed set
pub struct StringOneOf {
    allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create<S: AsRef<str>>(allowed: &[S]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = known(&request).and_then(Dynamic::as_str) {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("got \"{}\", {}", s, self.description()),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
            (Some(min), None) => format!("length must be at least {}", min),
            (None, Some(max)) => format!("length must be at most {}", max),
            (None, None) => "any length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = known(&request).and_then(Dynamic::as_str) {
            let len = s.chars().count();
            let too_short = self.min.is_some_and(|min| len < min);
            let too_long = self.max.is_some_and(|max| len > max);
            if too_short || too_long {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid length for {}", request.path),
                        format!("{}, got {}", self.description(), len),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: regex::Regex, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must be {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(s) = known(&request).and_then(Dynamic::as_str) {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be {}", request.path, self.description),
                        format!("value \"{}\" does not match {}", s, self.pattern.as_str()),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn create(min: Option<f64>, max: Option<f64>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }

    pub fn between(min: f64, max: f64) -> Box<dyn Validator> {
        Self::create(Some(min), Some(max))
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(n) = known(&request).and_then(Dynamic::as_number) {
            let below = self.min.is_some_and(|min| n < min);
            let above = self.max.is_some_and(|max| n > max);
            if below || above {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Value out of range for {}", request.path),
                        format!("{}, got {}", self.description(), n),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn create(min: Option<usize>, max: Option<usize>) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "any number of items".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Some(items) = known(&request).and_then(Dynamic::as_list) {
            let too_few = self.min.is_some_and(|min| items.len() < min);
            let too_many = self.max.is_some_and(|max| items.len() > max);
            if too_few || too_many {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid number of items for {}", request.path),
                        format!("{}, got {}", self.description(), items.len()),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                config_value: DynamicValue::new(value),
                path: AttributePath::new("field"),
            })
            .diagnostics
    }

    #[test]
    fn string_one_of_accepts_allowed_value() {
        let validator = StringOneOf::create(&["kHigh", "kLow", "kMedium"]);
        assert!(run(validator.as_ref(), Dynamic::from("kLow")).is_empty());
    }

    #[test]
    fn string_one_of_rejects_other_values() {
        let validator = StringOneOf::create(&["kPhysical", "kSQL"]);
        let diags = run(validator.as_ref(), Dynamic::from("kVMware"));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("kPhysical, kSQL"));
        assert_eq!(diags[0].attribute, Some(AttributePath::new("field")));
    }

    #[test]
    fn validators_skip_null_and_unknown() {
        let validator = StringOneOf::create(&["a"]);
        assert!(run(validator.as_ref(), Dynamic::Null).is_empty());
        assert!(run(validator.as_ref(), Dynamic::Unknown).is_empty());

        let range = NumberRangeValidator::between(0.0, 23.0);
        assert!(run(range.as_ref(), Dynamic::Unknown).is_empty());
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator::create(Some(5), None);
        let diags = run(validator.as_ref(), Dynamic::from("hi"));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("at least 5"));
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let validator = StringLengthValidator::create(None, Some(5));
        let diags = run(validator.as_ref(), Dynamic::from("hello world"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn string_pattern_validator() {
        let validator = StringPatternValidator::create(
            regex::Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap(),
            "an email address",
        );

        assert!(run(validator.as_ref(), Dynamic::from("ops@example.com")).is_empty());
        let diags = run(validator.as_ref(), Dynamic::from("invalid"));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("an email address"));
    }

    #[test]
    fn number_range_validator_bounds_are_inclusive() {
        let validator = NumberRangeValidator::between(0.0, 59.0);

        assert!(run(validator.as_ref(), Dynamic::Number(0.0)).is_empty());
        assert!(run(validator.as_ref(), Dynamic::Number(59.0)).is_empty());
        assert_eq!(run(validator.as_ref(), Dynamic::Number(60.0)).len(), 1);
        assert_eq!(run(validator.as_ref(), Dynamic::Number(-1.0)).len(), 1);
    }

    #[test]
    fn list_length_validator() {
        let validator = ListLengthValidator::create(Some(1), Some(2));

        assert!(run(validator.as_ref(), Dynamic::from(vec!["a", "b"])).is_empty());
        assert_eq!(run(validator.as_ref(), Dynamic::List(vec![])).len(), 1);
        assert_eq!(
            run(validator.as_ref(), Dynamic::from(vec!["a", "b", "c"])).len(),
            1
        );
    }
}
