//! Cart route handlers.
//!
//! Cart lines live on the data platform, one row per item per user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use millets_core::{CartLineId, MenuItemId, Price};

use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::Flash;
use crate::platform::CartLine;
use crate::services::cart;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartItemView {
    pub line_id: String,
    pub item_id: String,
    pub name: String,
    pub image_src: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::inr(Decimal::ZERO).to_string(),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&[CartLine]> for CartView {
    fn from(lines: &[CartLine]) -> Self {
        let items: Vec<CartItemView> = lines
            .iter()
            .filter_map(|line| {
                let item = line.item.as_ref()?;
                Some(CartItemView {
                    line_id: line.id.to_string(),
                    item_id: item.id.to_string(),
                    name: item.name.clone(),
                    image_src: item.image_src().to_string(),
                    quantity: line.quantity,
                    price: item.price_display(),
                    line_price: Price::inr(item.price * Decimal::from(line.quantity)).to_string(),
                })
            })
            .collect();

        Self {
            item_count: items.iter().map(|i| i.quantity).sum(),
            items,
            subtotal: Price::inr(cart::subtotal(lines)).to_string(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddToCartForm {
    pub item_id: String,
    pub quantity: String,
}

impl AddToCartForm {
    /// Item and quantity to add. A blank quantity means one.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem.
    pub fn parse(&self) -> Result<(MenuItemId, u32), String> {
        let item_id = self
            .item_id
            .trim()
            .parse::<MenuItemId>()
            .map_err(|_| "That item is not on the menu.".to_string())?;
        let quantity = match self.quantity.trim() {
            "" => 1,
            raw => raw
                .parse::<u32>()
                .ok()
                .filter(|q| *q >= 1)
                .ok_or_else(|| "Quantity must be at least 1.".to_string())?,
        };
        Ok((item_id, quantity))
    }
}

/// Update cart form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: String,
}

impl UpdateCartForm {
    /// Line and requested quantity. Values below one are passed through so
    /// the cart service can ignore them.
    ///
    /// # Errors
    ///
    /// Returns a message if either field is blank or not a whole number.
    pub fn parse(&self) -> Result<(CartLineId, i64), String> {
        let line_id = parse_line_id(&self.line_id)?;
        let quantity = self
            .quantity
            .trim()
            .parse::<i64>()
            .map_err(|_| "Quantity must be a whole number.".to_string())?;
        Ok((line_id, quantity))
    }
}

/// Remove from cart form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

fn parse_line_id(raw: &str) -> Result<CartLineId, String> {
    raw.trim()
        .parse::<CartLineId>()
        .map_err(|_| "That line is no longer in your cart.".to_string())
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
}

/// Display the cart page.
#[instrument(skip_all, fields(user = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut ctx: PageContext,
) -> impl IntoResponse {
    let cart = match state.platform().cart_lines(user.id).await {
        Ok(lines) => CartView::from(lines.as_slice()),
        Err(e) => {
            warn!(error = %e, "Failed to load cart");
            ctx.flash = Some(Flash::error(
                "Cart unavailable",
                "We couldn't load your cart. Please try again.",
            ));
            CartView::empty()
        }
    };

    CartTemplate { ctx, cart }
}

/// Add an item to the cart.
#[instrument(skip_all, fields(user = %user.id, item_id = %form.item_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let (item_id, quantity) = match form.parse() {
        Ok(parsed) => parsed,
        Err(problem) => {
            Flash::error("Not added", problem).set(&session).await;
            return Redirect::to("/cart").into_response();
        }
    };

    match cart::add_item(state.platform(), user.id, item_id, quantity).await {
        Ok(()) => {
            Flash::success("Added to cart", "The item is waiting in your cart.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to add to cart");
            Flash::error("Not added", "We couldn't add that item. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/cart").into_response()
}

/// Change a cart line's quantity. Quantities below one are ignored.
#[instrument(skip_all, fields(user = %user.id, line_id = %form.line_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let (line_id, quantity) = match form.parse() {
        Ok(parsed) => parsed,
        Err(problem) => {
            Flash::error("Cart not updated", problem).set(&session).await;
            return Redirect::to("/cart").into_response();
        }
    };

    if let Err(e) = cart::set_quantity(state.platform(), user.id, line_id, quantity).await {
        warn!(error = %e, "Failed to update cart");
        Flash::error("Cart not updated", "Something went wrong. Please try again.")
            .set(&session)
            .await;
    }
    Redirect::to("/cart").into_response()
}

/// Remove a line from the cart.
#[instrument(skip_all, fields(user = %user.id, line_id = %form.line_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let line_id = match parse_line_id(&form.line_id) {
        Ok(line_id) => line_id,
        Err(problem) => {
            Flash::error("Not removed", problem).set(&session).await;
            return Redirect::to("/cart").into_response();
        }
    };

    match state.platform().remove_cart_line(user.id, line_id).await {
        Ok(()) => {
            Flash::info("Removed", "The item was removed from your cart.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to remove cart line");
            Flash::error("Not removed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/cart").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn add_form(item_id: &str, quantity: &str) -> AddToCartForm {
        AddToCartForm {
            item_id: item_id.to_string(),
            quantity: quantity.to_string(),
        }
    }

    #[test]
    fn test_blank_add_quantity_means_one() {
        assert_eq!(add_form("7", "").parse().unwrap(), (MenuItemId::new(7), 1));
        assert_eq!(add_form(" 7 ", "3").parse().unwrap(), (MenuItemId::new(7), 3));
    }

    #[test]
    fn test_bad_add_fields_are_rejected() {
        assert!(add_form("7", "0").parse().is_err());
        assert!(add_form("7", "two").parse().is_err());
        assert!(add_form("", "1").parse().is_err());
    }

    #[test]
    fn test_update_needs_a_number() {
        let form = UpdateCartForm {
            line_id: "4".to_string(),
            quantity: String::new(),
        };
        assert_eq!(form.parse().unwrap_err(), "Quantity must be a whole number.");

        let form = UpdateCartForm {
            line_id: "4".to_string(),
            quantity: "-2".to_string(),
        };
        assert_eq!(form.parse().unwrap(), (CartLineId::new(4), -2));
    }
}
