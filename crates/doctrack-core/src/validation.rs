//! Request field validation.
//!
//! Structural rules (presence, length, email shape) are declared with
//! `#[derive(Validate)]` on the request types and folded into
//! [`FieldErrors`] by [`collect`]. The helpers here cover what those
//! rules cannot: trimming, enumerations, dates and decimal amounts.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::{ValidationError, ValidationErrors};

use crate::error::FieldErrors;

fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Trimmed, non-empty value or `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Trim a request field in place; blank values become `None`.
pub fn trim(value: &mut Option<String>) {
    *value = non_blank(value.as_deref());
}

/// Fold the outcome of a derived `validate()` call into `errors`.
pub fn collect(errors: &mut FieldErrors, result: Result<(), ValidationErrors>) {
    let Err(failed) = result else {
        return;
    };
    for (field, list) in failed.field_errors() {
        let field: &str = field.as_ref();
        for error in list.iter() {
            errors.add(field, message(field, error));
        }
    }
}

/// Report `field` as missing when `value` is `None`. For rules that only
/// apply to some operations on a shared request type.
pub fn require<T>(errors: &mut FieldErrors, field: &str, value: &Option<T>) {
    if value.is_none() {
        errors.add(field, message(field, &ValidationError::new("required")));
    }
}

/// A length floor known only at runtime, such as a configured password
/// minimum.
pub fn min_length(errors: &mut FieldErrors, field: &str, value: Option<&str>, min: usize) {
    if value.is_some_and(|v| v.chars().count() < min) {
        let mut error = ValidationError::new("length");
        error.add_param("min".into(), &min);
        errors.add(field, message(field, &error));
    }
}

fn message(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let label = label(field);
    let bound = |key: &str| {
        error
            .params
            .get(key)
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    match &*error.code {
        "required" => format!("The {label} field is required."),
        "email" => format!("The {label} must be a valid email address."),
        "length" if error.params.contains_key("max") => {
            format!("The {label} may not be greater than {} characters.", bound("max"))
        }
        "length" => format!("The {label} must be at least {} characters.", bound("min")),
        _ => format!("The {label} is invalid."),
    }
}

/// A calendar date in `YYYY-MM-DD` form. A missing value is not an error;
/// presence is checked by the request type.
pub fn optional_date(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
) -> Option<NaiveDate> {
    let cleaned = non_blank(value)?;
    match NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            errors.add(
                field,
                format!("The {} is not a valid date.", label(field)),
            );
            None
        }
    }
}

/// An optional decimal amount.
pub fn decimal(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<Decimal> {
    let cleaned = non_blank(value)?;
    match Decimal::from_str(&cleaned) {
        Ok(d) => Some(d),
        Err(_) => {
            errors.add(field, format!("The {} must be a number.", label(field)));
            None
        }
    }
}

/// Serde helper for fields that clients send either as a JSON string or
/// as a bare number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

/// A value that must parse through `parse`, reported as "selected ... is
/// invalid" otherwise.
pub fn one_of<T>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let cleaned = non_blank(value)?;
    let parsed = parse(&cleaned);
    if parsed.is_none() {
        errors.add(
            field,
            format!("The selected {} is invalid.", label(field)),
        );
    }
    parsed
}
