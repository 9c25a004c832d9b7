//! API errors and their JSON rendering.
//!
//! Client errors carry the entity they concern and a stable key, rendered
//! as `{"error": "error.<key>", "message", "statusCode", "entityName"}`.

use crate::core::{CriteriaError, ParamError};
use crate::models::ErrorResponse;
use crate::services::PostgresError;
use actix_web::http::StatusCode;
use actix_web::{error, HttpRequest, HttpResponse, ResponseError};
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        entity: &'static str,
        key: &'static str,
        message: String,
    },

    #[error("{message}")]
    NotFound {
        entity: &'static str,
        key: &'static str,
        message: String,
    },

    #[error("{message}")]
    Conflict {
        entity: &'static str,
        key: &'static str,
        message: String,
    },

    #[error("{message}")]
    DomainRule {
        entity: &'static str,
        key: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] PostgresError),
}

impl ApiError {
    pub fn validation(entity: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            entity,
            key,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity,
            key: "idnotfound",
            message: message.into(),
        }
    }

    pub fn conflict(entity: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            entity,
            key,
            message: message.into(),
        }
    }

    pub fn domain_rule(entity: &'static str, key: &'static str, message: impl Into<String>) -> Self {
        ApiError::DomainRule {
            entity,
            key,
            message: message.into(),
        }
    }

    /// Body validation failure reported by `validator`
    pub fn invalid_body(entity: &'static str, errors: &ValidationErrors) -> Self {
        Self::validation(entity, "validation", errors.to_string())
    }

    /// Rejected query parameters for a listing of `entity`
    pub fn from_params(entity: &'static str, err: ParamError) -> Self {
        let key = match &err {
            ParamError::Criteria(CriteriaError::UnsupportedOperator { .. }) => "unsupportedoperator",
            ParamError::Criteria(_) => "invalidcriteria",
            ParamError::UnknownOperator { .. } => "unknownoperator",
            ParamError::Repeated(_) => "repeatedfilter",
            ParamError::InvalidValue { .. } => "invalidvalue",
            ParamError::InvalidPage { .. } => "invalidpage",
            ParamError::UnknownSort(_) => "invalidsort",
        };
        Self::validation(entity, key, err.to_string())
    }

    /// The stable key rendered as `error.<key>`
    pub fn key(&self) -> &'static str {
        match self {
            ApiError::Validation { key, .. }
            | ApiError::NotFound { key, .. }
            | ApiError::Conflict { key, .. }
            | ApiError::DomainRule { key, .. } => *key,
            ApiError::Database(_) => "internalServerError",
        }
    }

    pub fn entity(&self) -> Option<&'static str> {
        match self {
            ApiError::Validation { entity, .. }
            | ApiError::NotFound { entity, .. }
            | ApiError::Conflict { entity, .. }
            | ApiError::DomainRule { entity, .. } => Some(*entity),
            ApiError::Database(_) => None,
        }
    }
}

impl From<CriteriaError> for ApiError {
    fn from(err: CriteriaError) -> Self {
        let entity = match &err {
            CriteriaError::UnknownAttribute { entity, .. } => *entity,
            _ => "criteria",
        };
        Self::validation(entity, "invalidcriteria", err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict { .. } | ApiError::DomainRule { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: format!("error.{}", self.key()),
            message,
            status_code: status.as_u16(),
            entity_name: self.entity().map(str::to_string),
        })
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::validation("request", "invalidjson", format!("Invalid JSON: {}", err)).into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    ApiError::validation("request", "invalidquery", format!("Invalid query: {}", err)).into()
}
