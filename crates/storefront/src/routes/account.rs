//! Account route handlers: order history, bookings and profile.
//!
//! Every query here is scoped to the signed-in user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use millets_core::{OrderLine, Price};

use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::Flash;
use crate::platform::{Booking, Order, Profile};
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// One order line for display.
#[derive(Debug, Clone)]
pub struct LineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub total: String,
}

impl From<&OrderLine> for LineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: line.name.clone(),
            quantity: line.quantity,
            price: Price::inr(line.price).to_string(),
            total: Price::inr(line.line_total()).to_string(),
        }
    }
}

/// An order for display.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_on: String,
    pub status: String,
    pub status_slug: String,
    pub total: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub delivery_method: String,
    pub payment_method: String,
    pub special_instructions: String,
    pub lines: Vec<LineView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed_on: order.placed_on(),
            status: order.status.to_string(),
            status_slug: order.status.slug().to_string(),
            total: order.total_display(),
            name: order.name.clone(),
            phone: order.phone.clone(),
            email: order.contact_email().unwrap_or_default().to_string(),
            address: order.address.clone(),
            pincode: order.pincode.clone(),
            delivery_method: order.delivery_method.to_string(),
            payment_method: order.payment_method.label().to_string(),
            special_instructions: order.special_instructions.clone(),
            lines: order.items.iter().map(LineView::from).collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub ctx: PageContext,
    pub orders: Vec<OrderView>,
}

/// Booking history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/bookings.html")]
pub struct BookingsTemplate {
    pub ctx: PageContext,
    pub bookings: Vec<Booking>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub ctx: PageContext,
    pub email: String,
    pub profile: Profile,
}

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub pincode: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the user's orders, newest first.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
) -> impl IntoResponse {
    let orders = match state.platform().orders_for(user.id).await {
        Ok(orders) => orders.iter().map(OrderView::from).collect(),
        Err(e) => {
            warn!(error = %e, "Failed to load orders");
            ctx.flash = Some(Flash::error(
                "Orders unavailable",
                "We couldn't load your orders. Please try again.",
            ));
            Vec::new()
        }
    };

    OrdersTemplate { ctx, orders }
}

/// Display the user's bookings, newest first.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn bookings(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
) -> impl IntoResponse {
    let bookings = match state.platform().bookings_for(user.id).await {
        Ok(bookings) => bookings,
        Err(e) => {
            warn!(error = %e, "Failed to load bookings");
            ctx.flash = Some(Flash::error(
                "Bookings unavailable",
                "We couldn't load your bookings. Please try again.",
            ));
            Vec::new()
        }
    };

    BookingsTemplate { ctx, bookings }
}

/// Display the profile editor.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
) -> impl IntoResponse {
    let profile = match state.platform().profile(user.id).await {
        Ok(profile) => profile.unwrap_or_else(|| Profile::empty(user.id)),
        Err(e) => {
            warn!(error = %e, "Failed to load profile");
            ctx.flash = Some(Flash::error(
                "Profile unavailable",
                "We couldn't load your profile. Please try again.",
            ));
            Profile::empty(user.id)
        }
    };

    ProfileTemplate {
        ctx,
        email: user.email,
        profile,
    }
}

/// Save the profile.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Response {
    let profile = Profile {
        id: user.id,
        full_name: form.full_name.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        pincode: form.pincode.trim().to_string(),
    };

    match state.platform().upsert_profile(&profile).await {
        Ok(()) => {
            Flash::success("Profile saved", "Your details have been updated.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to save profile");
            Flash::error("Profile not saved", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/profile").into_response()
}
