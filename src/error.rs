use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use validator::ValidationErrors;

use crate::store::StoreError;

pub const VALIDATION_FAILED: &str = "Validation failed, entered data is incorrect.";

/// Fields whose submitted value is never echoed back.
const SECRET_FIELDS: &[&str] = &["password"];

/// A single failed validation rule, reported back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed, entered data is incorrect.")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Persistence(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Carries the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Unhandled(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error body for every non-2xx response other than a validation failure.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(errors) => (
                status,
                Json(json!({ "message": VALIDATION_FAILED, "errors": errors })),
            )
                .into_response(),
            AppError::Persistence(e) => {
                tracing::error!("Store error: {}", e);
                envelope(status, e.to_string())
            }
            AppError::Unhandled(msg) => {
                tracing::error!("Unhandled error: {}", msg);
                envelope(status, msg)
            }
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) => envelope(status, msg),
            AppError::NotFound(path) => (
                status,
                Json(Envelope {
                    message: "Not found".to_string(),
                    data: Some(json!({ "path": path })),
                }),
            )
                .into_response(),
        }
    }
}

fn envelope(status: StatusCode, message: String) -> Response {
    (status, Json(Envelope { message, data: None })).into_response()
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                let secret = SECRET_FIELDS.contains(&field.as_str());
                errs.iter().map(move |e| FieldError {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                    value: if secret {
                        None
                    } else {
                        e.params.get("value").cloned()
                    },
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Persistence(e.into())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Persistence(e.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Unhandled(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Unhandled(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
