//! Integration tests for the Millets storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p millets-integration-tests
//! ```
//!
//! Each test spawns the real router on an ephemeral port, backed by
//! [`MemoryPlatform`] and an in-memory session store, and drives it over HTTP
//! with a cookie-keeping `reqwest` client that does not follow redirects.
//!
//! # Test Categories
//!
//! - `session_gate` - Login redirects, role checks, return paths
//! - `ordering` - Cart, checkout snapshots and totals
//! - `admin_console` - Catalog edits and order status changes
//! - `pages` - Public pages, bookings, contact and reviews

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, header::LOCATION, redirect::Policy};
use secrecy::SecretString;
use tower_sessions::MemoryStore;

use rust_decimal::Decimal;

use millets_core::{
    DeliveryMethod, Email, MenuItemId, OrderLine, OrderStatus, PaymentMethod, Role, UserId,
    order_total,
};
use millets_storefront::build_router;
use millets_storefront::config::{PlatformConfig, StorefrontConfig};
use millets_storefront::middleware::session_layer;
use millets_storefront::platform::{DataPlatform, MemoryPlatform, NewOrder, Order};
use millets_storefront::state::AppState;

/// Password given to every account created through [`TestApp::add_user`].
pub const PASSWORD: &str = "millet-pass-42";

fn test_config(status_email_endpoint: Option<String>) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        platform: PlatformConfig {
            url: "http://127.0.0.1:9".to_string(),
            anon_key: SecretString::from("anon"),
            service_key: SecretString::from("service"),
        },
        status_email_endpoint,
        catalog_cache_ttl: Duration::from_secs(60),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A running storefront.
pub struct TestApp {
    pub base_url: String,
    pub platform: Arc<MemoryPlatform>,
    pub client: Client,
}

impl TestApp {
    /// Spawn a storefront with no status notification endpoint.
    pub async fn spawn() -> Self {
        Self::spawn_with_notifier(None).await
    }

    /// Spawn a storefront that posts status changes to `endpoint`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn_with_notifier(endpoint: Option<String>) -> Self {
        let platform = Arc::new(MemoryPlatform::new());
        let state = AppState::new(test_config(endpoint), platform.clone(), None)
            .expect("Failed to build application state");

        let app = build_router(state).layer(session_layer(MemoryStore::default(), false));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        let base_url = format!("http://{addr}");
        Self {
            client: Self::new_client(),
            base_url,
            platform,
        }
    }

    /// A client with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn new_client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Another browser on the same storefront, with its own cookies.
    #[must_use]
    pub fn new_visitor(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            platform: Arc::clone(&self.platform),
            client: Self::new_client(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register an account on the platform with [`PASSWORD`].
    #[must_use]
    pub fn add_user(&self, email: &str, role: Option<Role>) -> UserId {
        self.platform.add_user(email, PASSWORD, role)
    }

    /// Store a cash-on-delivery order for `user` directly on the platform.
    ///
    /// # Panics
    ///
    /// Panics if the platform rejects the order.
    pub async fn seed_order(&self, user: UserId, email: Option<&str>) -> Order {
        let items = vec![OrderLine {
            item_id: MenuItemId::new(1000),
            name: "Ragi Dosa".to_string(),
            price: Decimal::new(90, 0),
            quantity: 2,
        }];
        let order = NewOrder {
            user_id: user,
            name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            email: email.map(|e| Email::parse(e).expect("Invalid test email")),
            address: String::new(),
            pincode: String::new(),
            delivery_method: DeliveryMethod::Takeaway,
            payment_method: PaymentMethod::Cod,
            special_instructions: String::new(),
            total: order_total(&items),
            items,
            status: OrderStatus::Pending,
        };
        self.platform
            .create_order(&order)
            .await
            .expect("Failed to seed order")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET and return the body, asserting a 200.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or the page is not 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.text().await.expect("Failed to read body")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Sign in through the login form, returning to `from`.
    pub async fn login_from(&self, email: &str, from: &str) -> Response {
        self.post_form(
            "/auth/login",
            &[("email", email), ("password", PASSWORD), ("from", from)],
        )
        .await
    }

    /// Sign in and assert the redirect home.
    ///
    /// # Panics
    ///
    /// Panics if the sign-in does not succeed.
    pub async fn login(&self, email: &str) {
        let response = self.login_from(email, "/").await;
        assert_eq!(response.status(), 303);
        assert_eq!(location(&response), "/", "sign-in for {email} failed");
    }
}

/// The `Location` header of a redirect.
///
/// # Panics
///
/// Panics if the header is missing.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("Response has no Location header")
        .to_string()
}

/// Checkout form fields for a takeaway order paid on delivery.
#[must_use]
pub fn takeaway_checkout() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Asha Rao"),
        ("phone", "9876543210"),
        ("email", "asha@example.in"),
        ("address", ""),
        ("pincode", ""),
        ("delivery_method", "Takeaway"),
        ("payment_method", "COD"),
        ("special_instructions", ""),
    ]
}
