//! Built-in plan modifiers

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Forces replacement whenever the planned value differs from prior state
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = changed(&request.state_value.value, &request.plan_value.value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Keeps the prior state value for a computed attribute instead of showing
/// it as known after apply
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "value does not change after creation".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = if request.plan_value.is_unknown() && !request.state_value.is_null() {
            request.state_value
        } else {
            request.plan_value
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

pub type ReplacePredicate = dyn Fn(&PlanModifierRequest) -> bool + Send + Sync;

/// Forces replacement when a change satisfies the predicate
pub struct RequiresReplaceIf {
    predicate: Box<ReplacePredicate>,
    description: String,
}

impl RequiresReplaceIf {
    pub fn create<F>(predicate: F, description: impl Into<String>) -> Box<dyn PlanModifier>
    where
        F: Fn(&PlanModifierRequest) -> bool + Send + Sync + 'static,
    {
        Box::new(Self {
            predicate: Box::new(predicate),
            description: description.into(),
        })
    }
}

impl PlanModifier for RequiresReplaceIf {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = changed(&request.state_value.value, &request.plan_value.value)
            && (self.predicate)(&request);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

// A change from a null prior (create) or to an unknown plan value is not a
// replacement trigger
fn changed(state: &Dynamic, plan: &Dynamic) -> bool {
    !matches!(state, Dynamic::Null)
        && !matches!(plan, Dynamic::Unknown)
        && !values_equal(state, plan)
}

/// Structural equality with a tolerance on numbers
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: DynamicValue::new(plan.clone()),
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            path: AttributePath::new("x_ibm_tenant_id"),
        }
    }

    #[test]
    fn requires_replace_does_not_trigger_on_same_value() {
        let response = RequiresReplace.modify(request(
            Dynamic::from("tenant-a/"),
            Dynamic::from("tenant-a/"),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_triggers_on_different_value() {
        let response = RequiresReplace.modify(request(
            Dynamic::from("tenant-a/"),
            Dynamic::from("tenant-b/"),
        ));
        assert!(response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_ignores_create_and_unknown() {
        assert!(!RequiresReplace
            .modify(request(Dynamic::Null, Dynamic::from("a")))
            .requires_replace);
        assert!(!RequiresReplace
            .modify(request(Dynamic::from("a"), Dynamic::Unknown))
            .requires_replace);
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let response =
            UseStateForUnknown.modify(request(Dynamic::from("cluster-1"), Dynamic::Unknown));
        assert_eq!(response.plan_value.value, Dynamic::from("cluster-1"));

        let on_create = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown));
        assert!(on_create.plan_value.is_unknown());
    }

    #[test]
    fn requires_replace_if_consults_predicate() {
        let modifier = RequiresReplaceIf::create(
            |req| req.plan_value.value.as_str() != Some("kPhysical"),
            "only switching to kPhysical is done in place",
        );

        let in_place = modifier.modify(request(Dynamic::from("kSQL"), Dynamic::from("kPhysical")));
        assert!(!in_place.requires_replace);

        let replace = modifier.modify(request(Dynamic::from("kPhysical"), Dynamic::from("kSQL")));
        assert!(replace.requires_replace);
    }

    #[test]
    fn values_equal_compares_nested_structures() {
        let a = Dynamic::from(vec!["x", "y"]);
        let b = Dynamic::from(vec!["x", "y"]);
        let c = Dynamic::from(vec!["y", "x"]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &c));
        assert!(!values_equal(&Dynamic::Null, &Dynamic::from("")));
    }
}
