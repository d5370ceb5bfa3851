//! Authentication route handlers.
//!
//! Sign-in and registration are delegated to the hosted auth service; the
//! resulting access token is kept in the server-side session and re-checked
//! by the session gate on every protected request.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use millets_core::{Email, Role};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    OptionalAuth, PageContext, clear_current_user, resolve_role, sanitize_return_path,
    set_current_user,
};
use crate::models::{CurrentUser, Flash};
use crate::platform::{AuthSession, PlatformError};
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub from: Option<String>,
}

/// Query parameters for the auth page.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    pub from: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Combined login / register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub ctx: PageContext,
    pub register: bool,
    pub from: String,
    pub login_href: String,
    pub register_href: String,
}

/// URL of the auth page in the given mode, preserving `from`.
fn auth_url(from: &str, register: bool) -> String {
    let mut params = Vec::new();
    if register {
        params.push("mode=register".to_string());
    }
    if from != "/" {
        params.push(format!("from={}", urlencoding::encode(from)));
    }
    if params.is_empty() {
        "/auth".to_string()
    } else {
        format!("/auth?{}", params.join("&"))
    }
}

fn check_registration(form: &RegisterForm) -> Result<Email, String> {
    let email = Email::parse(&form.email).map_err(|e| format!("Email: {e}"))?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    if form.password != form.password_confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(email)
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login or registration page.
pub async fn page(
    Query(query): Query<AuthQuery>,
    OptionalAuth(user): OptionalAuth,
    ctx: PageContext,
) -> Response {
    let from = sanitize_return_path(query.from.as_deref());
    if user.is_some() {
        return Redirect::to(&from).into_response();
    }

    AuthTemplate {
        ctx,
        register: query.mode.as_deref() == Some("register"),
        login_href: auth_url(&from, false),
        register_href: auth_url(&from, true),
        from,
    }
    .into_response()
}

/// Store a fresh sign-in in the session.
async fn start_session(
    state: &AppState,
    session: &Session,
    auth: AuthSession,
    email: &Email,
) -> Result<(), tower_sessions::session::Error> {
    let role = resolve_role(state.platform(), auth.user.id).await;
    let user = CurrentUser {
        id: auth.user.id,
        email: auth.user.email.unwrap_or_else(|| email.to_string()),
        access_token: auth.access_token,
    };

    // New id on privilege change
    session.cycle_id().await?;
    set_current_user(session, &user, role).await?;
    set_sentry_user(&user.id, Some(&user.email));
    info!(user = %user.id, %role, "Signed in");
    Ok(())
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let from = sanitize_return_path(form.from.as_deref());
    let back = auth_url(&from, false);

    let Ok(email) = Email::parse(&form.email) else {
        Flash::error("Sign-in failed", "Please enter a valid email address.")
            .set(&session)
            .await;
        return Redirect::to(&back).into_response();
    };

    let password = SecretString::from(form.password);
    let auth = match state.platform().sign_in(&email, &password).await {
        Ok(auth) => auth,
        Err(PlatformError::InvalidCredentials) => {
            Flash::error("Sign-in failed", "Invalid email or password.")
                .set(&session)
                .await;
            return Redirect::to(&back).into_response();
        }
        Err(e) => {
            warn!(error = %e, "Sign-in call failed");
            Flash::error("Sign-in failed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
            return Redirect::to(&back).into_response();
        }
    };

    if let Err(e) = start_session(&state, &session, auth, &email).await {
        warn!(error = %e, "Failed to store session");
        Flash::error("Sign-in failed", "Something went wrong. Please try again.")
            .set(&session)
            .await;
        return Redirect::to(&back).into_response();
    }

    Flash::success("Welcome back!", "You are now signed in.")
        .set(&session)
        .await;
    Redirect::to(&from).into_response()
}

/// Handle registration form submission.
///
/// New accounts get a `customer` role record.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let from = sanitize_return_path(form.from.as_deref());
    let back = auth_url(&from, true);

    let email = match check_registration(&form) {
        Ok(email) => email,
        Err(problem) => {
            Flash::error("Registration failed", problem)
                .set(&session)
                .await;
            return Redirect::to(&back).into_response();
        }
    };

    let password = SecretString::from(form.password);
    let signup = match state.platform().sign_up(&email, &password).await {
        Ok(signup) => signup,
        Err(PlatformError::Conflict(_)) => {
            Flash::error(
                "Registration failed",
                "An account with this email already exists.",
            )
            .set(&session)
            .await;
            return Redirect::to(&back).into_response();
        }
        Err(e) => {
            warn!(error = %e, "Sign-up call failed");
            Flash::error("Registration failed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
            return Redirect::to(&back).into_response();
        }
    };

    if let Err(e) = state
        .platform()
        .insert_role(signup.user.id, Role::Customer)
        .await
    {
        warn!(user = %signup.user.id, error = %e, "Failed to create role record");
    }

    let Some(auth) = signup.session else {
        Flash::info(
            "Check your email",
            "Confirm your address, then sign in to continue.",
        )
        .set(&session)
        .await;
        return Redirect::to(&auth_url(&from, false)).into_response();
    };

    if let Err(e) = start_session(&state, &session, auth, &email).await {
        warn!(error = %e, "Failed to store session");
        Flash::error("Account created", "Please sign in to continue.")
            .set(&session)
            .await;
        return Redirect::to(&auth_url(&from, false)).into_response();
    }

    Flash::success("Welcome!", "Your account has been created.")
        .set(&session)
        .await;
    Redirect::to(&from).into_response()
}

/// Sign out: revoke the token (best effort) and clear the session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Response {
    if let Some(user) = user {
        if let Err(e) = state.platform().sign_out(&user.access_token).await {
            warn!(user = %user.id, error = %e, "Sign-out call failed");
        }
        info!(user = %user.id, "Signed out");
    }

    if let Err(e) = clear_current_user(&session).await {
        warn!(error = %e, "Failed to clear session");
    }
    if let Err(e) = session.cycle_id().await {
        warn!(error = %e, "Failed to rotate session id");
    }
    clear_sentry_user();

    Flash::info("Signed out", "See you soon!").set(&session).await;
    Redirect::to("/").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: "asha@example.in".to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            from: None,
        }
    }

    #[test]
    fn test_auth_url() {
        assert_eq!(auth_url("/", false), "/auth");
        assert_eq!(auth_url("/", true), "/auth?mode=register");
        assert_eq!(
            auth_url("/my-orders", true),
            "/auth?mode=register&from=%2Fmy-orders"
        );
    }

    #[test]
    fn test_registration_checks() {
        assert!(check_registration(&form("millet42", "millet42")).is_ok());
        assert_eq!(
            check_registration(&form("abc", "abc")).unwrap_err(),
            "Password must be at least 6 characters"
        );
        assert_eq!(
            check_registration(&form("millet42", "millet43")).unwrap_err(),
            "Passwords do not match"
        );
    }
}
