//! Per-page context shared by every rendered template.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use millets_core::Role;

use crate::models::{CurrentUser, Flash, session_keys};

/// Navigation state and the pending flash for a rendered page.
///
/// Extracting this consumes the flash, so only page handlers that render
/// should ask for it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user_email: Option<String>,
    pub is_admin: bool,
    pub flash: Option<Flash>,
}

impl PageContext {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user_email.is_some()
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self::default());
        };

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let role = session
            .get::<Role>(session_keys::CACHED_ROLE)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        Ok(Self {
            is_admin: user.is_some() && role == Role::Admin,
            user_email: user.map(|u| u.email),
            flash: Flash::take(&session).await,
        })
    }
}
