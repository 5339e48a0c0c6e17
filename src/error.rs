use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be a number, got {input:?}")]
    NotANumber { field: &'static str, input: String },

    #[error("coefficient must be strictly positive, got {0}")]
    NonPositiveCoefficient(f64),

    #[error("minimum {min} cannot exceed maximum {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("a grade needs either an exact value or both a minimum and a maximum")]
    AmbiguousValue,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradebookError {
    #[error("no {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
}

impl GradebookError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        GradebookError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("export code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("export code is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("export code does not contain valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid format: {0}")]
    Structure(String),
}
