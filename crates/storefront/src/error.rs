//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Page handlers that are not driven by a form
//! return `Result<T, AppError>`; form handlers turn failures into flashes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::platform::PlatformError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Hosted data platform call failed.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_) => true,
            Self::Platform(err) => !matches!(
                err,
                PlatformError::Unauthorized
                    | PlatformError::InvalidCredentials
                    | PlatformError::NotFound(_)
                    | PlatformError::Conflict(_)
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Platform(err) => match err {
                PlatformError::Unauthorized | PlatformError::InvalidCredentials => {
                    StatusCode::UNAUTHORIZED
                }
                PlatformError::NotFound(_) => StatusCode::NOT_FOUND,
                PlatformError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            },
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) => "Internal server error",
            Self::Platform(err) => match err {
                PlatformError::Unauthorized => "Session expired, please sign in again",
                PlatformError::InvalidCredentials => "Invalid credentials",
                PlatformError::NotFound(_) => "Not found",
                PlatformError::Conflict(_) => "Already exists",
                _ => "External service error",
            },
        };

        (status, message).into_response()
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "41")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
