//! Checkout route handlers.
//!
//! `GET /checkout` shows either the cart or, for "order now", a single item.
//! Prices shown here are informational: the order is priced again from the
//! catalog when it is placed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use millets_core::{DeliveryMethod, MenuItemId, PaymentMethod, Price};

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::Flash;
use crate::platform::Profile;
use crate::routes::cart::{CartItemView, CartView};
use crate::services::{CheckoutError, CheckoutForm, place_order};
use crate::state::AppState;

/// Query for "order now" from an item page.
#[derive(Debug, Default, Deserialize)]
pub struct DirectOrderQuery {
    pub item_id: Option<String>,
    pub quantity: Option<String>,
}

/// A selectable option in the checkout form.
#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    pub email: String,
    pub profile: Profile,
    pub payment_methods: Vec<ChoiceView>,
    pub delivery_methods: Vec<ChoiceView>,
    /// Hidden fields for a direct order.
    pub direct_item_id: Option<String>,
    pub direct_quantity: u32,
}

fn payment_choices() -> Vec<ChoiceView> {
    PaymentMethod::ALL
        .iter()
        .map(|method| ChoiceView {
            value: method.to_string(),
            label: method.label().to_string(),
            selected: *method == PaymentMethod::default(),
        })
        .collect()
}

fn delivery_choices() -> Vec<ChoiceView> {
    [DeliveryMethod::Delivery, DeliveryMethod::Takeaway]
        .iter()
        .map(|method| ChoiceView {
            value: method.to_string(),
            label: method.to_string(),
            selected: *method == DeliveryMethod::default(),
        })
        .collect()
}

async fn unavailable(session: &Session) -> Response {
    Flash::error("Checkout unavailable", "We couldn't load your order. Please try again.")
        .set(session)
        .await;
    Redirect::to("/cart").into_response()
}

fn checkout_url(item_id: Option<&str>, quantity: Option<&str>) -> String {
    match item_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!(
            "/checkout?item_id={}&quantity={}",
            urlencoding::encode(id),
            urlencoding::encode(quantity.unwrap_or("1"))
        ),
        None => "/checkout".to_string(),
    }
}

/// Display the checkout form.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DirectOrderQuery>,
    session: Session,
    ctx: PageContext,
) -> Response {
    let platform = state.platform();

    let (cart, direct_item_id, direct_quantity) = match query.item_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            let item = match raw.trim().parse::<MenuItemId>() {
                Ok(id) => match platform.menu_item(id).await {
                    Ok(item) => item,
                    Err(e) => {
                        warn!(error = %e, "Failed to load item for direct checkout");
                        return unavailable(&session).await;
                    }
                },
                Err(_) => None,
            };
            let Some(item) = item else {
                Flash::error("Item unavailable", "That item is no longer on the menu.")
                    .set(&session)
                    .await;
                return Redirect::to("/order").into_response();
            };
            let quantity = query
                .quantity
                .as_deref()
                .and_then(|q| q.trim().parse::<u32>().ok())
                .filter(|q| *q >= 1)
                .unwrap_or(1);
            let line_total = item.price * Decimal::from(quantity);
            let cart = CartView {
                items: vec![CartItemView {
                    line_id: String::new(),
                    item_id: item.id.to_string(),
                    name: item.name.clone(),
                    image_src: item.image_src().to_string(),
                    quantity,
                    price: item.price_display(),
                    line_price: Price::inr(line_total).to_string(),
                }],
                subtotal: Price::inr(line_total).to_string(),
                item_count: quantity,
            };
            (cart, Some(item.id.to_string()), quantity)
        }
        _ => {
            let lines = match platform.cart_lines(user.id).await {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(error = %e, "Failed to load cart for checkout");
                    return unavailable(&session).await;
                }
            };
            if lines.is_empty() {
                Flash::info("Your cart is empty", "Add something from the menu first.")
                    .set(&session)
                    .await;
                return Redirect::to("/order").into_response();
            }
            (CartView::from(lines.as_slice()), None, 1)
        }
    };

    let profile = platform.profile(user.id).await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load profile for checkout prefill");
        None
    });

    CheckoutTemplate {
        ctx,
        cart,
        email: user.email.clone(),
        profile: profile.unwrap_or_else(|| Profile::empty(user.id)),
        payment_methods: payment_choices(),
        delivery_methods: delivery_choices(),
        direct_item_id,
        direct_quantity,
    }
    .into_response()
}

/// Place the order.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let back = checkout_url(form.item_id.as_deref(), form.quantity.as_deref());

    let result = match form.validate() {
        Ok(checkout) => place_order(state.platform(), user.id, checkout).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(order) => {
            let order_id = order.id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
            Flash::success("Order placed!", format!("Your order #{order_id} has been received."))
                .set(&session)
                .await;
            Redirect::to(&format!("/order-confirmation/{order_id}")).into_response()
        }
        Err(CheckoutError::Platform(e)) => {
            warn!(error = %e, "Failed to place order");
            Flash::error("Order failed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
            Redirect::to(&back).into_response()
        }
        Err(e) => {
            Flash::error("Please check your order", e.to_string())
                .set(&session)
                .await;
            let target = if matches!(e, CheckoutError::EmptyCart) { "/cart" } else { back.as_str() };
            Redirect::to(target).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_url_keeps_direct_item() {
        assert_eq!(checkout_url(None, None), "/checkout");
        assert_eq!(checkout_url(Some(" "), Some("2")), "/checkout");
        assert_eq!(
            checkout_url(Some("7"), Some("2")),
            "/checkout?item_id=7&quantity=2"
        );
    }

    #[test]
    fn test_default_choices_are_selected() {
        let payments = payment_choices();
        assert_eq!(payments.len(), 5);
        assert!(payments.iter().any(|c| c.selected && c.value == "COD"));
        assert!(delivery_choices()[0].selected);
    }
}
