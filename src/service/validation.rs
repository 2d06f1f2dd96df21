//! Contract validation from static field rules.

use crate::contract::FieldRule;
use crate::error::AppError;
use regex::Regex;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-field rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
        for rule in rules {
            let val = body.get(rule.field);
            if rule.required && is_blank(val) {
                return Err(AppError::Validation(format!("{} is required", rule.field)));
            }
            if let Some(v) = val {
                validate_field(v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for partial updates). Required is
    /// not enforced for missing fields, but a present required field may not be blank.
    pub fn validate_partial(body: &Map<String, Value>, rules: &[FieldRule]) -> Result<(), AppError> {
        for rule in rules {
            let Some(v) = body.get(rule.field) else { continue };
            if rule.required && is_blank(Some(v)) {
                return Err(AppError::Validation(format!("{} may not be empty", rule.field)));
            }
            validate_field(v, rule)?;
        }
        Ok(())
    }
}

fn is_blank(val: Option<&Value>) -> bool {
    match val {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn validate_field(v: &Value, rule: &FieldRule) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Ok(());
    };
    let len = s.chars().count();
    if let Some(max) = rule.max_length {
        if len > max {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                rule.field, max
            )));
        }
    }
    if let Some(min) = rule.min_length {
        if len < min {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                rule.field, min
            )));
        }
    }
    if let Some(pattern) = rule.pattern {
        let re = Regex::new(pattern)
            .map_err(|_| AppError::Validation(format!("invalid pattern for {}", rule.field)))?;
        if !re.is_match(s) {
            return Err(AppError::Validation(format!(
                "{} does not match required pattern",
                rule.field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RULES: &[FieldRule] = &[
        FieldRule {
            field: "title",
            required: true,
            min_length: Some(2),
            max_length: Some(5),
            pattern: None,
        },
        FieldRule {
            field: "code",
            required: false,
            min_length: None,
            max_length: None,
            pattern: Some(r"^[a-z]+$"),
        },
    ];

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn required_field_must_be_present_and_non_blank() {
        assert!(RequestValidator::validate(&obj(json!({"title": "abc"})), RULES).is_ok());
        for body in [json!({}), json!({"title": null}), json!({"title": "   "})] {
            let err = RequestValidator::validate(&obj(body), RULES).unwrap_err();
            assert!(matches!(err, AppError::Validation(m) if m == "title is required"));
        }
    }

    #[test]
    fn lengths_count_characters() {
        assert!(RequestValidator::validate(&obj(json!({"title": "ééééé"})), RULES).is_ok());
        assert!(RequestValidator::validate(&obj(json!({"title": "abcdef"})), RULES).is_err());
        assert!(RequestValidator::validate(&obj(json!({"title": "a"})), RULES).is_err());
    }

    #[test]
    fn pattern_applies_when_present() {
        assert!(RequestValidator::validate(&obj(json!({"title": "ab", "code": "xyz"})), RULES).is_ok());
        assert!(RequestValidator::validate(&obj(json!({"title": "ab", "code": "X-1"})), RULES).is_err());
    }

    #[test]
    fn partial_skips_absent_fields() {
        assert!(RequestValidator::validate_partial(&obj(json!({"code": "ok"})), RULES).is_ok());
        assert!(RequestValidator::validate_partial(&obj(json!({"title": ""})), RULES).is_err());
        assert!(RequestValidator::validate_partial(&obj(json!({"title": "toolong"})), RULES).is_err());
    }
}
