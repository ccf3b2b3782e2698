//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del motor de cargas
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::validation::failed_fields;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    /// Datos de carga inválidos; nunca llegan a la base
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// La base rechazó la escritura (clave duplicada, FK desconocida, CHECK)
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Fallo de conexión o de sesión; no es recuperable localmente
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

// SQLSTATE: clase 22 = data exception, clase 23 = integrity constraint violation
const QUERY_CANCELED: &str = "57014";

impl AppError {
    /// Clasificar un error de sqlx según su SQLSTATE
    pub fn from_sqlx(context: &str, e: sqlx::Error) -> Self {
        let code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        if let (Some(code), Some(db)) = (code.as_deref(), e.as_database_error()) {
            if code.starts_with("22") || code.starts_with("23") {
                return AppError::Constraint(format!(
                    "{}: {} (SQLSTATE {})",
                    context,
                    db.message(),
                    code
                ));
            }
            if code == QUERY_CANCELED {
                return AppError::Timeout(format!(
                    "{}: statement cancelled by the server",
                    context
                ));
            }
        }

        match e {
            sqlx::Error::PoolTimedOut => {
                AppError::Timeout(format!("{}: no database connection available", context))
            }
            sqlx::Error::RowNotFound => AppError::NotFound(context.to_string()),
            other => AppError::Database(other),
        }
    }

    /// ¿Error de restricción de la base?
    pub fn is_constraint(&self) -> bool {
        matches!(self, AppError::Constraint(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::from_sqlx("database operation failed", e)
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Validation(e) => {
                warn!("⚠️ Validation error: {}", e);
                let fields = failed_fields(&e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "Validation Error",
                        "The provided data is invalid".to_string(),
                        "VALIDATION_ERROR",
                    )
                    .with_details(json!({ "fields": fields, "errors": e })),
                )
            }

            AppError::Constraint(msg) => {
                warn!("⚠️ Constraint violation: {}", msg);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse::new("Constraint Violation", msg, "CONSTRAINT_ERROR"),
                )
            }

            AppError::NotFound(msg) => {
                warn!("🔍 Resource not found: {}", msg);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
                )
            }

            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "An error occurred while accessing the database".to_string(),
                        "DB_ERROR",
                    ),
                )
            }

            AppError::Timeout(msg) => {
                error!("⏱️ Timeout: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorResponse::new(
                        "Timeout",
                        "The database did not answer in time".to_string(),
                        "TIMEOUT",
                    ),
                )
            }

            AppError::Unauthorized(msg) => {
                warn!("🔒 Unauthorized access: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"),
                )
            }

            AppError::BadRequest(msg) => {
                warn!("⚠️ Bad request: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
                )
            }

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "INTERNAL_ERROR",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::{single_field_error, stage_violation};

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from_sqlx("load 'abc'", sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: load 'abc'");
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err = AppError::from_sqlx("add load", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[test]
    fn test_transport_errors_stay_database_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: AppError = sqlx::Error::Io(io).into();
        assert!(matches!(err, AppError::Database(_)));
        assert!(!err.is_constraint());
    }

    #[test]
    fn test_status_codes() {
        let validation = AppError::from(single_field_error(
            "stage",
            stage_violation("internal", "clear"),
        ));
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Constraint("dup".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            not_found_error("Load", "abc").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Timeout("slow".into()).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Database(sqlx::Error::PoolClosed).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
