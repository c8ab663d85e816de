use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application-level error taxonomy. Every variant maps to a stable status
/// code and a machine-readable reason string; internal detail never reaches
/// the response body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("{message}")]
    Conflict {
        reason: &'static str,
        message: &'static str,
    },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Store or external-service unavailability, safe to retry.
    #[error("service temporarily unavailable")]
    Transient,

    #[error("internal error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        // repos wrap sqlx errors in anyhow; recover them so unique
        // violations and outages keep their taxonomy mapping
        match e.downcast::<sqlx::Error>() {
            Ok(db) => db.into(),
            Err(e) => AppError::Internal(e),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::InvalidRefreshToken
            | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Transient => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "validation",
            AppError::Conflict { reason, .. } => reason,
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidRefreshToken => "invalid_refresh_token",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Transient => "transient",
            AppError::Internal(_) => "internal",
        }
    }

    /// User-safe message, without leaking store or driver text.
    fn user_message(&self) -> String {
        match self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                warn!(error = %e, "store unavailable");
                AppError::Transient
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Conflict {
                    reason: "unique_violation",
                    message: "Resource already exists",
                }
            }
            _ => {
                error!(error = %e, "database error");
                AppError::Internal(e.into())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({
            "error": self.reason(),
            "message": self.user_message(),
        });
        if let AppError::Validation { field, .. } = &self {
            body["field"] = json!(field);
        }
        if status.is_server_error() {
            error!(status = %status, reason = self.reason(), "request failed");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_stable() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::InvalidRefreshToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Transient.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Conflict {
                reason: "username_taken",
                message: "Username already taken"
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn conflict_reason_is_machine_readable() {
        let err = AppError::Conflict {
            reason: "duplicate_component_kind",
            message: "Build already has a component of this kind",
        };
        assert_eq!(err.reason(), "duplicate_component_kind");
    }

    #[test]
    fn internal_message_hides_detail() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.5"));
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn anyhow_wrapped_sqlx_errors_keep_their_mapping() {
        let err: AppError = anyhow::Error::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, AppError::NotFound));
    }
}
