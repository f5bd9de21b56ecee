//! Structural and whitelist checks for plans coming from outside the crate.
//!
//! Purely syntactic: a parameter is never inspected here. Whether a path or
//! a command alias is acceptable is decided by the executor at run time.

use crate::grammar::Step;
use crate::types::RawPlan;
use serde_json::Value;
use tracing::warn;

pub fn is_valid_step(step: &str) -> bool {
    Step::parse(step).is_ok()
}

pub fn validate(plan: &RawPlan) -> bool {
    for step in &plan.steps {
        if !is_valid_step(step) {
            warn!("invalid step in plan: '{}'", step);
            return false;
        }
    }
    true
}

/// Checks an untyped reply: an object with a string `explanation` and an
/// array `steps` of strings, each of which is in the grammar.
pub fn validate_value(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        warn!("plan is not a JSON object");
        return false;
    };

    if !obj.get("explanation").map(Value::is_string).unwrap_or(false) {
        warn!("plan has no string 'explanation'");
        return false;
    }

    let Some(steps) = obj.get("steps").and_then(Value::as_array) else {
        warn!("plan has no 'steps' array");
        return false;
    };

    steps.iter().all(|s| match s.as_str() {
        Some(step) if is_valid_step(step) => true,
        _ => {
            warn!("invalid step in plan: {}", s);
            false
        }
    })
}

/// Validates and converts in one go; `None` means "fall back".
pub fn parse_value(value: Value) -> Option<RawPlan> {
    if !validate_value(&value) {
        return None;
    }
    serde_json::from_value(value).ok()
}
