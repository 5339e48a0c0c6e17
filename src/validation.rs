use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::models::{new_id, Grade, GradeValue, Subject, TeachingUnit, DEFAULT_COLOR};

/// How malformed numbers are handled when building entities from raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Reject with a `ValidationError`.
    Strict,
    /// Coefficient falls back to 1, malformed values to 0. Inverted ranges
    /// are still rejected.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Default)]
pub struct GradeInput<'a> {
    pub name: &'a str,
    pub exact: Option<&'a str>,
    pub min: Option<&'a str>,
    pub max: Option<&'a str>,
    pub coefficient: Option<&'a str>,
    pub confirmed: bool,
    pub date: Option<NaiveDate>,
}

pub fn required_name(name: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    Ok(trimmed.to_string())
}

fn parse_number(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            input: input.to_string(),
        })
}

pub fn parse_coefficient(
    input: Option<&str>,
    policy: NumericPolicy,
) -> Result<f64, ValidationError> {
    let parsed = match input {
        None => Ok(1.0),
        Some(raw) => parse_number("coefficient", raw),
    };
    match (parsed, policy) {
        (Ok(value), _) if value > 0.0 => Ok(value),
        (Ok(_) | Err(_), NumericPolicy::Lenient) => Ok(1.0),
        (Ok(value), NumericPolicy::Strict) => Err(ValidationError::NonPositiveCoefficient(value)),
        (Err(err), NumericPolicy::Strict) => Err(err),
    }
}

pub fn parse_grade_value(
    exact: Option<&str>,
    min: Option<&str>,
    max: Option<&str>,
    policy: NumericPolicy,
) -> Result<GradeValue, ValidationError> {
    let lenient = |field: &'static str, raw: &str| match (parse_number(field, raw), policy) {
        (Ok(value), _) => Ok(value),
        (Err(_), NumericPolicy::Lenient) => Ok(0.0),
        (Err(err), NumericPolicy::Strict) => Err(err),
    };

    match (exact, min, max) {
        (Some(raw), None, None) => Ok(GradeValue::Exact {
            value: lenient("value", raw)?,
        }),
        (None, Some(raw_min), Some(raw_max)) => {
            let min = lenient("min", raw_min)?;
            let max = lenient("max", raw_max)?;
            if min > max {
                return Err(ValidationError::InvertedRange { min, max });
            }
            Ok(GradeValue::Range { min, max })
        }
        (None, None, None) => Err(ValidationError::Missing { field: "value" }),
        _ => Err(ValidationError::AmbiguousValue),
    }
}

pub fn build_grade(
    input: &GradeInput<'_>,
    policy: NumericPolicy,
) -> Result<Grade, ValidationError> {
    Ok(Grade {
        id: new_id(),
        name: required_name(input.name, "grade name")?,
        value: parse_grade_value(input.exact, input.min, input.max, policy)?,
        coefficient: parse_coefficient(input.coefficient, policy)?,
        is_confirmed: input.confirmed,
        date: input.date,
    })
}

pub fn build_subject(
    name: &str,
    coefficient: Option<&str>,
    color: Option<&str>,
    policy: NumericPolicy,
) -> Result<Subject, ValidationError> {
    Ok(Subject {
        id: new_id(),
        name: required_name(name, "subject name")?,
        coefficient: parse_coefficient(coefficient, policy)?,
        color: color.unwrap_or(DEFAULT_COLOR).to_string(),
        grades: Vec::new(),
    })
}

pub fn build_unit(
    name: &str,
    coefficient: Option<&str>,
    color: Option<&str>,
    policy: NumericPolicy,
) -> Result<TeachingUnit, ValidationError> {
    Ok(TeachingUnit {
        id: new_id(),
        name: required_name(name, "unit name")?,
        coefficient: parse_coefficient(coefficient, policy)?,
        color: color.unwrap_or(DEFAULT_COLOR).to_string(),
        subjects: Vec::new(),
        grades: None,
    })
}
