use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldErrorKind {
    InvalidNumber,
    MustBePositive,
    OutOfRange,
    LengthConstraint,
    InvalidTimestamp,
    Required,
    InvalidType,
    InvalidEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

/// Field name to the errors reported for it. Each list keeps the order checks ran in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<FieldError>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, kind, message);
        errors
    }

    pub fn add(&mut self, field: &str, kind: FieldErrorKind, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(FieldError {
            kind,
            message: message.into(),
        });
    }

    /// Appends every error of `other` after the ones already collected.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, errs) in other.0 {
            self.0.entry(field).or_default().extend(errs);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[FieldError]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// First error kind reported for `field`
    pub fn kind_of(&self, field: &str) -> Option<FieldErrorKind> {
        self.get(field).and_then(|errs| errs.first()).map(|e| e.kind)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> ProductResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProductError::Validation(self))
        }
    }

    /// `{ field: [message, ...] }`
    pub fn to_details(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| Value::String(e.message.clone()))
                    .collect();
                (field.clone(), Value::Array(messages))
            })
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, errs) in &self.0 {
            for e in errs {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{} ({}): {}", field, e.kind, e.message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let kind = match &*err.code {
                    "range" | "decimal_places" => FieldErrorKind::OutOfRange,
                    "length" => FieldErrorKind::LengthConstraint,
                    "required" => FieldErrorKind::Required,
                    _ => FieldErrorKind::InvalidType,
                };
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| default_message(err));
                out.add(&field, kind, message);
            }
        }
        out
    }
}

/// Message for validator errors raised without one, built from their params.
fn default_message(err: &ValidationError) -> String {
    let bound = |key: &str| err.params.get(key).and_then(Value::as_u64);
    match &*err.code {
        "length" => {
            let chars = err
                .params
                .get("value")
                .and_then(Value::as_str)
                .map(|s| s.chars().count() as u64);
            match (chars, bound("min"), bound("max")) {
                (Some(chars), Some(min), _) if chars < min => {
                    format!("Ensure this field has at least {} characters.", min)
                }
                (_, _, Some(max)) => format!("Ensure this field has no more than {} characters.", max),
                (_, Some(min), None) => format!("Ensure this field has at least {} characters.", min),
                _ => err.code.to_string(),
            }
        }
        _ => err.code.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(i64),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Media storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl ProductError {
    pub fn field(field: &str, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        ProductError::Validation(FieldErrors::single(field, kind, message))
    }
}

/// Convert ProductError to AppError for standardized error responses
impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => AppError::NotFound(format!("Product {} not found", id)),
            ProductError::Validation(errors) => AppError::FieldErrors(errors.to_details()),
            ProductError::Database(msg) => AppError::InternalServerError(msg),
            ProductError::Cache(msg) => AppError::InternalServerError(msg),
            ProductError::Storage(msg) => AppError::InternalServerError(msg),
            ProductError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<sea_orm::DbErr> for ProductError {
    fn from(err: sea_orm::DbErr) -> Self {
        ProductError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for ProductError {
    fn from(err: redis::RedisError) -> Self {
        ProductError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for ProductError {
    fn from(err: serde_json::Error) -> Self {
        ProductError::Internal(err.to_string())
    }
}
