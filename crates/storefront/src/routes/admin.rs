//! Admin console route handlers.
//!
//! Catalog maintenance and order status changes. Every handler requires the
//! `admin` role through [`RequireAdmin`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use millets_core::{MenuItemId, OrderId, OrderStatus, Price};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::platform::{MenuItem, MenuItemInput, Order, PlatformError};
use crate::routes::account::OrderView;
use crate::routes::pages::not_found_page;
use crate::state::AppState;

/// Display order of the status summary.
const SUMMARY_ORDER: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Paid,
    OrderStatus::InProcess,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

// =============================================================================
// View Models
// =============================================================================

/// Number of orders in one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub label: String,
    pub slug: String,
    pub count: usize,
}

/// Count orders per status, in a fixed display order.
#[must_use]
pub fn status_counts(orders: &[Order]) -> Vec<StatusCount> {
    SUMMARY_ORDER
        .iter()
        .map(|status| StatusCount {
            label: status.to_string(),
            slug: status.slug().to_string(),
            count: orders.iter().filter(|o| o.status == *status).count(),
        })
        .collect()
}

/// A status the admin can pick for an order.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: String,
    pub selected: bool,
}

/// An order row in the console.
#[derive(Debug, Clone)]
pub struct AdminOrderView {
    pub order: OrderView,
    pub status_options: Vec<StatusOption>,
}

impl From<&Order> for AdminOrderView {
    fn from(order: &Order) -> Self {
        Self {
            order: OrderView::from(order),
            status_options: OrderStatus::ADMIN_SETTABLE
                .iter()
                .map(|status| StatusOption {
                    value: status.as_str().to_string(),
                    selected: *status == order.status,
                })
                .collect(),
        }
    }
}

/// Admin console template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub ctx: PageContext,
    pub items: Vec<MenuItem>,
    pub orders: Vec<AdminOrderView>,
    pub summary: Vec<StatusCount>,
    pub order_count: usize,
}

/// Edit menu item template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_item.html")]
pub struct EditItemTemplate {
    pub ctx: PageContext,
    pub item: MenuItem,
    pub price: String,
}

// =============================================================================
// Forms
// =============================================================================

/// Menu item form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MenuItemForm {
    pub name: String,
    pub price: String,
    pub category: String,
    pub description: String,
    pub image_url: String,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl MenuItemForm {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem.
    pub fn validate(&self) -> Result<MenuItemInput, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        let price = Price::parse_amount(&self.price).map_err(|e| format!("Price: {e}"))?;

        Ok(MenuItemInput {
            name: name.to_string(),
            price,
            category: self.category.trim().to_string(),
            description: optional(&self.description),
            image_url: optional(&self.image_url),
        })
    }
}

/// Order status form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the admin console.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut ctx: PageContext,
) -> impl IntoResponse {
    let platform = state.platform();

    let items = platform.list_menu(None).await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load menu for admin");
        ctx.flash = Some(Flash::error("Menu unavailable", "Could not load menu items."));
        Vec::new()
    });
    let orders = platform.all_orders().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load orders for admin");
        ctx.flash = Some(Flash::error("Orders unavailable", "Could not load orders."));
        Vec::new()
    });

    AdminTemplate {
        ctx,
        items,
        summary: status_counts(&orders),
        order_count: orders.len(),
        orders: orders.iter().map(AdminOrderView::from).collect(),
    }
}

/// Create a menu item.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn create_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    Form(form): Form<MenuItemForm>,
) -> Response {
    let input = match form.validate() {
        Ok(input) => input,
        Err(problem) => {
            Flash::error("Item not added", problem).set(&session).await;
            return Redirect::to("/admin").into_response();
        }
    };

    match state.platform().create_menu_item(&input).await {
        Ok(item) => {
            state.catalog().invalidate_all().await;
            info!(item_id = %item.id, name = %item.name, "Menu item created");
            Flash::success("Item added", format!("{} is on the menu.", item.name))
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to create menu item");
            Flash::error("Item not added", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/admin").into_response()
}

/// Display the edit form for a menu item.
#[instrument(skip_all, fields(admin = %admin.id, item_id = %item_id))]
pub async fn edit_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(item_id): Path<String>,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let Ok(id) = item_id.parse::<MenuItemId>() else {
        return Ok(not_found_page(ctx));
    };
    let Some(item) = state.platform().menu_item(id).await? else {
        return Ok(not_found_page(ctx));
    };

    Ok(EditItemTemplate {
        ctx,
        price: item.price.to_string(),
        item,
    }
    .into_response())
}

/// Update a menu item.
#[instrument(skip_all, fields(admin = %admin.id, item_id = %item_id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(item_id): Path<String>,
    session: Session,
    Form(form): Form<MenuItemForm>,
) -> Response {
    let Ok(id) = item_id.parse::<MenuItemId>() else {
        return Redirect::to("/admin").into_response();
    };
    let input = match form.validate() {
        Ok(input) => input,
        Err(problem) => {
            Flash::error("Item not saved", problem).set(&session).await;
            return Redirect::to(&format!("/admin/menu/{id}/edit")).into_response();
        }
    };

    match state.platform().update_menu_item(id, &input).await {
        Ok(item) => {
            state.catalog().invalidate_all().await;
            info!(item_id = %item.id, "Menu item updated");
            Flash::success("Item saved", format!("{} was updated.", item.name))
                .set(&session)
                .await;
            Redirect::to("/admin").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to update menu item");
            Flash::error("Item not saved", "Something went wrong. Please try again.")
                .set(&session)
                .await;
            Redirect::to(&format!("/admin/menu/{id}/edit")).into_response()
        }
    }
}

/// Delete a menu item.
#[instrument(skip_all, fields(admin = %admin.id, item_id = %item_id))]
pub async fn delete_item(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(item_id): Path<String>,
    session: Session,
) -> Response {
    let Ok(id) = item_id.parse::<MenuItemId>() else {
        return Redirect::to("/admin").into_response();
    };

    match state.platform().delete_menu_item(id).await {
        Ok(()) => {
            state.catalog().invalidate_all().await;
            info!(item_id = %id, "Menu item deleted");
            Flash::info("Item deleted", "The item was removed from the menu.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to delete menu item");
            Flash::error("Item not deleted", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/admin").into_response()
}

/// Move an order to a new status and notify the customer.
///
/// Only the staff-settable statuses are accepted. The notification is sent in
/// the background and its outcome never affects the status change.
#[instrument(skip_all, fields(admin = %admin.id, order_id = %order_id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(order_id): Path<String>,
    session: Session,
    Form(form): Form<StatusForm>,
) -> Response {
    let Ok(id) = order_id.parse::<OrderId>() else {
        return Redirect::to("/admin").into_response();
    };
    let status = match OrderStatus::parse_admin_transition(form.status.trim()) {
        Ok(status) => status,
        Err(problem) => {
            warn!(status = %form.status, "Rejected order status");
            Flash::error("Status not changed", problem)
                .set(&session)
                .await;
            return Redirect::to("/admin").into_response();
        }
    };

    match state.platform().set_order_status(id, status).await {
        Ok(order) => {
            info!(order_id = %order.id, %status, "Order status changed");
            if let Some(email) = order.contact_email() {
                state.notifier().notify(email, order.id, status);
            }
            Flash::success(
                "Status updated",
                format!("Order #{} is now {status}.", order.id),
            )
            .set(&session)
            .await;
        }
        Err(PlatformError::NotFound(_)) => {
            Flash::error("Status not changed", "That order no longer exists.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to change order status");
            Flash::error("Status not changed", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    Redirect::to("/admin").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_menu_item_form_validation() {
        let form = MenuItemForm {
            name: " Ragi Dosa ".to_string(),
            price: "₹90.50".to_string(),
            category: "breakfast".to_string(),
            description: "  ".to_string(),
            image_url: String::new(),
        };
        let input = form.validate().unwrap();
        assert_eq!(input.name, "Ragi Dosa");
        assert_eq!(input.price, Decimal::new(9050, 2));
        assert!(input.description.is_none());

        let negative = MenuItemForm {
            name: "Ragi Dosa".to_string(),
            price: "-5".to_string(),
            ..MenuItemForm::default()
        };
        assert!(negative.validate().is_err());

        let unnamed = MenuItemForm {
            price: "10".to_string(),
            ..MenuItemForm::default()
        };
        assert_eq!(unnamed.validate().unwrap_err(), "Name is required");
    }
}
