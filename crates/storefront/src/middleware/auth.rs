//! Session gate and authentication extractors.
//!
//! Every protected request re-validates the session's access token with the
//! auth service. Admin pages additionally read the user's role record; a
//! missing or unreadable record counts as `customer`.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, Method, StatusCode,
        header::{HOST, REFERER},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, warn};
use url::Url;

use millets_core::{Role, UserId};

use crate::models::{CurrentUser, Flash, session_keys};
use crate::platform::DataPlatform;
use crate::state::AppState;

/// What the gate decided for a request.
#[derive(Debug)]
pub enum GateOutcome {
    /// Show the page.
    Render(CurrentUser),
    /// Send the visitor to the login page, returning to `from` afterwards.
    /// `revoke` is set when the stored token was rejected and should be dropped.
    Login { from: String, revoke: bool },
    /// Signed in, but without the required role.
    Denied(CurrentUser),
}

/// Read a user's role record, falling back to `customer`.
pub async fn resolve_role(platform: &dyn DataPlatform, user: UserId) -> Role {
    match platform.role_of(user).await {
        Ok(Some(role)) => role,
        Ok(None) => {
            debug!(%user, "No role record, treating as customer");
            Role::Customer
        }
        Err(e) => {
            warn!(%user, error = %e, "Role lookup failed, treating as customer");
            Role::Customer
        }
    }
}

/// Decide whether `session_user` may see a page.
///
/// `from` is the path to come back to after logging in. Identity or role
/// lookup failures never error: they resolve to "not signed in" and
/// "customer" respectively.
pub async fn check_access(
    platform: &dyn DataPlatform,
    session_user: Option<&CurrentUser>,
    from: &str,
    required_role: Option<Role>,
) -> GateOutcome {
    let login = |revoke| GateOutcome::Login {
        from: from.to_string(),
        revoke,
    };

    let Some(user) = session_user else {
        return login(false);
    };

    match platform.current_user(&user.access_token).await {
        Ok(auth_user) if auth_user.id == user.id => {}
        Ok(auth_user) => {
            warn!(session_user = %user.id, token_user = %auth_user.id, "Session token belongs to another user");
            return login(true);
        }
        Err(e) => {
            debug!(error = %e, "Session could not be validated");
            return login(e.is_unauthorized());
        }
    }

    match required_role {
        None => GateOutcome::Render(user.clone()),
        Some(required) => {
            if resolve_role(platform, user.id).await == required {
                GateOutcome::Render(user.clone())
            } else {
                GateOutcome::Denied(user.clone())
            }
        }
    }
}

/// Keep only local absolute paths; anything else returns to `/`.
#[must_use]
pub fn sanitize_return_path(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Login page URL that returns to `from`.
#[must_use]
pub fn login_url(from: &str) -> String {
    if from == "/" {
        "/auth".to_string()
    } else {
        format!("/auth?from={}", urlencoding::encode(from))
    }
}

/// Path to return to after login.
///
/// For `GET` this is the requested path. Other methods cannot be replayed by
/// a redirect, so the same-origin `Referer` path is used instead, or `/`.
fn return_path(parts: &Parts) -> String {
    if parts.method == Method::GET || parts.method == Method::HEAD {
        let path = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path(), |pq| pq.as_str());
        return sanitize_return_path(Some(path));
    }
    sanitize_return_path(same_origin_referer(&parts.headers).as_deref())
}

fn same_origin_referer(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(HOST)?.to_str().ok()?;
    let referer = Url::parse(headers.get(REFERER)?.to_str().ok()?).ok()?;

    let referer_host = referer.host_str()?;
    let authority = match referer.port() {
        Some(port) => format!("{referer_host}:{port}"),
        None => referer_host.to_string(),
    };
    if !authority.eq_ignore_ascii_case(host) {
        return None;
    }

    Some(match referer.query() {
        Some(query) => format!("{}?{query}", referer.path()),
        None => referer.path().to_string(),
    })
}

/// Error returned when the gate does not let a request through.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to the given path.
    RedirectToLogin(String),
    /// Redirect home; the "Access denied" flash is already set.
    Denied,
    /// No session layer available.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(from) => Redirect::to(&login_url(&from)).into_response(),
            Self::Denied => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn gate(
    parts: &Parts,
    state: &AppState,
    required_role: Option<Role>,
) -> Result<CurrentUser, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)?;

    let session_user: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();
    let from = return_path(parts);

    match check_access(state.platform(), session_user.as_ref(), &from, required_role).await {
        GateOutcome::Render(user) => Ok(user),
        GateOutcome::Login { from, revoke } => {
            if revoke && let Err(e) = clear_current_user(&session).await {
                warn!(error = %e, "Failed to clear rejected session");
            }
            Err(AuthRejection::RedirectToLogin(from))
        }
        GateOutcome::Denied(user) => {
            warn!(user = %user.id, path = %parts.uri.path(), "Access denied");
            Flash::error("Access denied", "You do not have permission to view that page.")
                .set(&session)
                .await;
            Err(AuthRejection::Denied)
        }
    }
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        gate(parts, state, None).await.map(Self)
    }
}

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        gate(parts, state, Some(Role::Admin)).await.map(Self)
    }
}

/// Extractor that optionally gets the current user from the session.
///
/// The token is not re-validated; use it only where being signed in is
/// optional (navigation, attaching a booking to an account).
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
    role: Role,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::CACHED_ROLE, role).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.remove::<Role>(session_keys::CACHED_ROLE).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderValue, Request};
    use secrecy::SecretString;

    use super::*;
    use crate::platform::MemoryPlatform;

    async fn signed_in(platform: &MemoryPlatform, role: Option<Role>) -> CurrentUser {
        platform.add_user("asha@example.in", "pw", role);
        let email = millets_core::Email::parse("asha@example.in").unwrap();
        let session = platform
            .sign_in(&email, &SecretString::from("pw"))
            .await
            .unwrap();
        CurrentUser {
            id: session.user.id,
            email: "asha@example.in".to_string(),
            access_token: session.access_token,
        }
    }

    #[tokio::test]
    async fn test_no_session_goes_to_login() {
        let platform = MemoryPlatform::new();
        let outcome = check_access(&platform, None, "/admin", Some(Role::Admin)).await;
        assert!(matches!(
            outcome,
            GateOutcome::Login { ref from, revoke: false } if from == "/admin"
        ));
    }

    #[tokio::test]
    async fn test_signed_in_without_role_requirement_renders() {
        let platform = MemoryPlatform::new();
        let user = signed_in(&platform, None).await;
        let outcome = check_access(&platform, Some(&user), "/cart", None).await;
        assert!(matches!(outcome, GateOutcome::Render(_)));
    }

    #[tokio::test]
    async fn test_customer_is_denied_admin() {
        let platform = MemoryPlatform::new();
        let user = signed_in(&platform, Some(Role::Customer)).await;
        let outcome = check_access(&platform, Some(&user), "/admin", Some(Role::Admin)).await;
        assert!(matches!(outcome, GateOutcome::Denied(_)));
    }

    #[tokio::test]
    async fn test_admin_is_let_through() {
        let platform = MemoryPlatform::new();
        let user = signed_in(&platform, Some(Role::Admin)).await;
        let outcome = check_access(&platform, Some(&user), "/admin", Some(Role::Admin)).await;
        assert!(matches!(outcome, GateOutcome::Render(_)));
    }

    #[tokio::test]
    async fn test_role_lookup_failure_downgrades_to_customer() {
        let platform = MemoryPlatform::new();
        let user = signed_in(&platform, Some(Role::Admin)).await;
        platform.fail_role_lookups(true);
        let outcome = check_access(&platform, Some(&user), "/admin", Some(Role::Admin)).await;
        assert!(matches!(outcome, GateOutcome::Denied(_)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_dropped() {
        let platform = MemoryPlatform::new();
        let user = signed_in(&platform, None).await;
        platform.revoke_all_tokens();
        let outcome = check_access(&platform, Some(&user), "/my-orders", None).await;
        assert!(matches!(outcome, GateOutcome::Login { revoke: true, .. }));
    }

    #[test]
    fn test_sanitize_return_path() {
        assert_eq!(sanitize_return_path(Some("/my-orders")), "/my-orders");
        assert_eq!(sanitize_return_path(Some("/menu?x=1")), "/menu?x=1");
        assert_eq!(sanitize_return_path(Some("//evil.example")), "/");
        assert_eq!(sanitize_return_path(Some("https://evil.example")), "/");
        assert_eq!(sanitize_return_path(Some("/\\evil.example")), "/");
        assert_eq!(sanitize_return_path(None), "/");
    }

    #[test]
    fn test_login_url_encodes_from() {
        assert_eq!(login_url("/"), "/auth");
        assert_eq!(login_url("/checkout?item_id=3"), "/auth?from=%2Fcheckout%3Fitem_id%3D3");
    }

    fn parts(method: Method, uri: &str, referer: Option<&str>) -> Parts {
        let mut request = Request::builder().method(method).uri(uri);
        request = request.header(HOST, HeaderValue::from_static("milletskitchen.in"));
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        request.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_return_path_for_get_is_request_path() {
        let parts = parts(Method::GET, "/checkout?item_id=3", None);
        assert_eq!(return_path(&parts), "/checkout?item_id=3");
    }

    #[test]
    fn test_return_path_for_post_uses_same_origin_referer() {
        let same = parts(
            Method::POST,
            "/cart/add",
            Some("https://milletskitchen.in/order/7"),
        );
        assert_eq!(return_path(&same), "/order/7");

        let foreign = parts(Method::POST, "/cart/add", Some("https://evil.example/order/7"));
        assert_eq!(return_path(&foreign), "/");

        let missing = parts(Method::POST, "/cart/add", None);
        assert_eq!(return_path(&missing), "/");
    }
}
