//! REST client for the hosted data platform.
//!
//! Auth calls go to `/auth/v1/*` with the anon key; data calls go to
//! `/rest/v1/{collection}` with the service key and `PostgREST` filters.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use millets_core::{
    BookingId, CartLineId, Email, MenuItemId, OrderId, OrderStatus, Role, UserId,
};

use super::types::{
    AuthSession, AuthUser, Booking, CartLine, ContactMessage, MenuItem, MenuItemInput, NewBooking,
    NewOrder, NewReview, Order, Profile, Review, SignUp,
};
use super::{DataPlatform, PlatformError};
use crate::config::PlatformConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const RETURN_ROWS: &str = "return=representation";
const RETURN_NOTHING: &str = "return=minimal";
const UPSERT: &str = "resolution=merge-duplicates,return=minimal";

/// Client for a Supabase-compatible platform.
#[derive(Clone)]
pub struct HostedPlatform {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_key: SecretString,
}

impl HostedPlatform {
    /// Create a new platform client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone(),
        })
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{path}", self.base_url))
            .header("apikey", self.anon_key.expose_secret())
    }

    fn data_request(&self, method: Method, collection: &str) -> RequestBuilder {
        let key = self.service_key.expose_secret();
        self.client
            .request(method, format!("{}/rest/v1/{collection}", self.base_url))
            .header("apikey", key)
            .bearer_auth(key)
    }

    /// Fetch rows from a collection.
    async fn select<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, PlatformError> {
        let request = self.data_request(Method::GET, collection).query(query);
        decode(check(request.send().await?).await?).await
    }

    /// Fetch at most one row.
    async fn select_one<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, PlatformError> {
        let mut query = query.to_vec();
        query.push(("limit", "1".to_string()));
        let rows: Vec<T> = self.select(collection, &query).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return it as stored.
    async fn insert_returning<B, T>(&self, collection: &str, body: &B) -> Result<T, PlatformError>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .data_request(Method::POST, collection)
            .header("Prefer", RETURN_ROWS)
            .json(body);
        let rows: Vec<T> = decode(check(request.send().await?).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(format!("{collection} row after insert")))
    }

    /// Send a write whose response body we don't need.
    async fn write(&self, request: RequestBuilder) -> Result<(), PlatformError> {
        check(request.send().await?).await?;
        Ok(())
    }
}

/// `PostgREST` equality filter value.
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Turn non-success responses into `PlatformError`.
async fn check(response: Response) -> Result<Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::CONFLICT => PlatformError::Conflict(message),
        _ => PlatformError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PlatformError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Sign-up answers with a session, or with a bare user when email
/// confirmation is required.
#[derive(Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    email: Option<String>,
}

impl SignUpResponse {
    fn into_sign_up(self) -> Result<SignUp, PlatformError> {
        match (self.access_token, self.user, self.id) {
            (Some(access_token), Some(user), _) => Ok(SignUp {
                user: user.clone(),
                session: Some(AuthSession {
                    access_token,
                    refresh_token: self.refresh_token,
                    user,
                }),
            }),
            (_, Some(user), _) => Ok(SignUp {
                user,
                session: None,
            }),
            (_, None, Some(id)) => Ok(SignUp {
                user: AuthUser {
                    id,
                    email: self.email,
                },
                session: None,
            }),
            _ => Err(PlatformError::Api {
                status: 200,
                message: "sign-up response had no user".to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct RoleRow {
    role: Role,
}

#[async_trait]
impl DataPlatform for HostedPlatform {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, PlatformError> {
        let response = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(PlatformError::InvalidCredentials)
            }
            _ => decode(check(response).await?).await,
        }
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUp, PlatformError> {
        let response = self
            .auth_request(Method::POST, "signup")
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }))
            .send()
            .await?;

        match check(response).await {
            Ok(response) => decode::<SignUpResponse>(response).await?.into_sign_up(),
            Err(PlatformError::Api { status, message })
                if (status == 400 || status == 422) && message.contains("already") =>
            {
                Err(PlatformError::Conflict(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, PlatformError> {
        let response = self
            .auth_request(Method::GET, "user")
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PlatformError::Unauthorized),
            _ => decode(check(response).await?).await,
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PlatformError> {
        let request = self
            .auth_request(Method::POST, "logout")
            .bearer_auth(access_token);
        self.write(request).await
    }

    async fn role_of(&self, user: UserId) -> Result<Option<Role>, PlatformError> {
        let row: Option<RoleRow> = self
            .select_one("users", &[("select", "role".to_string()), ("id", eq(user))])
            .await?;
        Ok(row.map(|r| r.role))
    }

    async fn insert_role(&self, user: UserId, role: Role) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "users")
            .header("Prefer", RETURN_NOTHING)
            .json(&serde_json::json!({ "id": user, "role": role }));
        self.write(request).await
    }

    async fn set_role(&self, user: UserId, role: Role) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "users")
            .header("Prefer", UPSERT)
            .json(&serde_json::json!({ "id": user, "role": role }));
        self.write(request).await
    }

    async fn list_menu(&self, category: Option<&str>) -> Result<Vec<MenuItem>, PlatformError> {
        let mut query = vec![("select", "*".to_string()), ("order", "id.asc".to_string())];
        if let Some(category) = category {
            query.push(("category", eq(category)));
        }
        self.select("menu_items", &query).await
    }

    async fn menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>, PlatformError> {
        self.select_one("menu_items", &[("select", "*".to_string()), ("id", eq(id))])
            .await
    }

    async fn create_menu_item(&self, item: &MenuItemInput) -> Result<MenuItem, PlatformError> {
        self.insert_returning("menu_items", item).await
    }

    async fn update_menu_item(
        &self,
        id: MenuItemId,
        item: &MenuItemInput,
    ) -> Result<MenuItem, PlatformError> {
        let request = self
            .data_request(Method::PATCH, "menu_items")
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_ROWS)
            .json(item);
        let rows: Vec<MenuItem> = decode(check(request.send().await?).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(format!("menu item {id}")))
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::DELETE, "menu_items")
            .query(&[("id", eq(id))]);
        self.write(request).await
    }

    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>, PlatformError> {
        self.select(
            "cart",
            &[
                ("select", "*,menu_items(*)".to_string()),
                ("user_id", eq(user)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn insert_cart_line(
        &self,
        user: UserId,
        item: MenuItemId,
        quantity: u32,
    ) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "cart")
            .header("Prefer", RETURN_NOTHING)
            .json(&serde_json::json!({
                "user_id": user,
                "item_id": item,
                "quantity": quantity,
            }));
        self.write(request).await
    }

    async fn set_cart_quantity(
        &self,
        user: UserId,
        line: CartLineId,
        quantity: u32,
    ) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::PATCH, "cart")
            .query(&[("id", eq(line)), ("user_id", eq(user))])
            .header("Prefer", RETURN_NOTHING)
            .json(&serde_json::json!({ "quantity": quantity }));
        self.write(request).await
    }

    async fn remove_cart_line(
        &self,
        user: UserId,
        line: CartLineId,
    ) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::DELETE, "cart")
            .query(&[("id", eq(line)), ("user_id", eq(user))]);
        self.write(request).await
    }

    async fn clear_cart(&self, user: UserId) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::DELETE, "cart")
            .query(&[("user_id", eq(user))]);
        self.write(request).await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, PlatformError> {
        self.insert_returning("orders", order).await
    }

    async fn orders_for(&self, user: UserId) -> Result<Vec<Order>, PlatformError> {
        self.select(
            "orders",
            &[
                ("select", "*".to_string()),
                ("user_id", eq(user)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, PlatformError> {
        self.select_one("orders", &[("select", "*".to_string()), ("id", eq(id))])
            .await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, PlatformError> {
        self.select(
            "orders",
            &[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, PlatformError> {
        let request = self
            .data_request(Method::PATCH, "orders")
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_ROWS)
            .json(&serde_json::json!({ "status": status }));
        let rows: Vec<Order> = decode(check(request.send().await?).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PlatformError::NotFound(format!("order {id}")))
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, PlatformError> {
        self.insert_returning("bookings", booking).await
    }

    async fn bookings_for(&self, user: UserId) -> Result<Vec<Booking>, PlatformError> {
        self.select(
            "bookings",
            &[
                ("select", "*".to_string()),
                ("user_id", eq(user)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn booking(&self, id: BookingId) -> Result<Option<Booking>, PlatformError> {
        self.select_one("bookings", &[("select", "*".to_string()), ("id", eq(id))])
            .await
    }

    async fn reviews_for(&self, item: MenuItemId) -> Result<Vec<Review>, PlatformError> {
        self.select(
            "reviews",
            &[
                ("select", "*".to_string()),
                ("item_id", eq(item)),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn create_review(&self, review: &NewReview) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "reviews")
            .header("Prefer", RETURN_NOTHING)
            .json(review);
        self.write(request).await
    }

    async fn create_contact(&self, message: &ContactMessage) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "contacts")
            .header("Prefer", RETURN_NOTHING)
            .json(message);
        self.write(request).await
    }

    async fn profile(&self, user: UserId) -> Result<Option<Profile>, PlatformError> {
        self.select_one("profiles", &[("select", "*".to_string()), ("id", eq(user))])
            .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), PlatformError> {
        let request = self
            .data_request(Method::POST, "profiles")
            .header("Prefer", UPSERT)
            .json(profile);
        self.write(request).await
    }

    async fn ping(&self) -> Result<(), PlatformError> {
        let _: Vec<serde_json::Value> = self
            .select(
                "menu_items",
                &[("select", "id".to_string()), ("limit", "1".to_string())],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Json, Router,
        extract::{RawQuery, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct Seen {
        requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    async fn stub(router: Router<Seen>) -> (HostedPlatform, Seen) {
        let seen = Seen::default();
        let app = router.with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let platform = HostedPlatform::new(&PlatformConfig {
            url: format!("http://{addr}/"),
            anon_key: SecretString::from("anon"),
            service_key: SecretString::from("service"),
        })
        .unwrap();
        (platform, seen)
    }

    #[tokio::test]
    async fn test_sign_in_bad_request_is_invalid_credentials() {
        let router = Router::new().route(
            "/auth/v1/token",
            post(|| async { (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#) }),
        );
        let (platform, _) = stub(router).await;

        let err = platform
            .sign_in(
                &Email::parse("asha@example.in").unwrap(),
                &SecretString::from("wrong"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_current_user_rejected_token_is_unauthorized() {
        let router = Router::new().route(
            "/auth/v1/user",
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
        let (platform, _) = stub(router).await;

        let err = platform.current_user("expired").await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_role_lookup_filters_by_user_and_uses_service_key() {
        let router = Router::new().route(
            "/rest/v1/users",
            get(
                |State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    seen.requests.lock().unwrap().push((query.unwrap_or_default(), auth));
                    Json(serde_json::json!([{ "role": "admin" }]))
                },
            ),
        );
        let (platform, seen) = stub(router).await;
        let user: UserId = "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10".parse().unwrap();

        let role = platform.role_of(user).await.unwrap();
        assert_eq!(role, Some(Role::Admin));

        let requests = seen.requests.lock().unwrap();
        let (query, auth) = &requests[0];
        assert!(query.contains("id=eq.6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10"));
        assert!(query.contains("limit=1"));
        assert_eq!(auth.as_deref(), Some("Bearer service"));
    }

    #[tokio::test]
    async fn test_sign_up_without_session_returns_user() {
        let router = Router::new().route(
            "/auth/v1/signup",
            post(|| async {
                Json(serde_json::json!({
                    "id": "6f1c2a34-9d1e-4c51-a1c7-0b3f7b2e9a10",
                    "email": "new@example.in"
                }))
            }),
        );
        let (platform, _) = stub(router).await;

        let sign_up = platform
            .sign_up(
                &Email::parse("new@example.in").unwrap(),
                &SecretString::from("hunter22"),
            )
            .await
            .unwrap();
        assert!(sign_up.session.is_none());
        assert_eq!(sign_up.user.email.as_deref(), Some("new@example.in"));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_api_error() {
        let router = Router::new().route(
            "/rest/v1/menu_items",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let (platform, _) = stub(router).await;

        let err = platform.list_menu(None).await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 503, .. }));
    }
}
