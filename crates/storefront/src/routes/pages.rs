//! Confirmation pages and the not-found page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use millets_core::{BookingId, OrderId};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::session_keys;
use crate::platform::Booking;
use crate::routes::account::OrderView;
use crate::state::AppState;

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub ctx: PageContext,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "order_confirmation.html")]
pub struct OrderConfirmationTemplate {
    pub ctx: PageContext,
    pub order: OrderView,
}

/// Booking confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "booking_confirmation.html")]
pub struct BookingConfirmationTemplate {
    pub ctx: PageContext,
    pub booking: Option<Booking>,
}

/// Contact confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "contact_confirmation.html")]
pub struct ContactConfirmationTemplate {
    pub ctx: PageContext,
    pub success: bool,
    pub message: &'static str,
}

/// Query for the contact confirmation page.
#[derive(Debug, Default, Deserialize)]
pub struct ContactStatusQuery {
    pub status: Option<String>,
}

/// Outcome and fixed copy for a contact status; unknown values read as failure.
fn contact_outcome(status: Option<&str>) -> (bool, &'static str) {
    match status.unwrap_or("success") {
        "success" => (true, "We have your message and will reply soon."),
        _ => (false, "We couldn't send your message. Please try again."),
    }
}

/// Render the not-found page with a 404 status.
#[must_use]
pub fn not_found_page(ctx: PageContext) -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate { ctx }).into_response()
}

/// Fallback for unknown paths.
pub async fn not_found(ctx: PageContext) -> Response {
    not_found_page(ctx)
}

/// Confirmation for one of the user's own orders.
#[instrument(skip_all, fields(user = %user.id, order_id = %order_id))]
pub async fn order_confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<String>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let Ok(id) = order_id.parse::<OrderId>() else {
        return Ok(not_found_page(ctx));
    };

    match state.platform().order(id).await? {
        Some(order) if order.user_id == Some(user.id) => Ok(OrderConfirmationTemplate {
            ctx,
            order: OrderView::from(&order),
        }
        .into_response()),
        _ => Ok(not_found_page(ctx)),
    }
}

/// Confirmation for the booking made in this session.
#[instrument(skip_all)]
pub async fn booking_confirmation(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let booking = match session.get::<BookingId>(session_keys::LAST_BOOKING).await? {
        Some(id) => state.platform().booking(id).await?,
        None => None,
    };

    Ok(BookingConfirmationTemplate { ctx, booking }.into_response())
}

/// Result page for the contact form.
pub async fn contact_confirmation(
    Query(query): Query<ContactStatusQuery>,
    ctx: PageContext,
) -> impl IntoResponse {
    let (success, message) = contact_outcome(query.status.as_deref());

    ContactConfirmationTemplate {
        ctx,
        success,
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_outcome_uses_fixed_copy() {
        assert!(contact_outcome(None).0);
        assert!(contact_outcome(Some("success")).0);

        let (success, message) = contact_outcome(Some("error"));
        assert!(!success);
        assert_eq!(message, "We couldn't send your message. Please try again.");

        assert!(!contact_outcome(Some("<b>anything</b>")).0);
    }
}
