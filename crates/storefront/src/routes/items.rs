//! Item detail and review route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use millets_core::{Email, MenuItemId};

use crate::error::AppError;
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::Flash;
use crate::platform::{MenuItem, NewReview, Review};
use crate::routes::pages::not_found_page;
use crate::state::AppState;

/// Item page template.
#[derive(Template, WebTemplate)]
#[template(path = "item.html")]
pub struct ItemTemplate {
    pub ctx: PageContext,
    pub item: MenuItem,
    pub reviews: Vec<Review>,
    /// Prefill for the review form.
    pub reviewer_email: String,
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Display a menu item with its reviews, newest first.
#[instrument(skip(state, ctx, user))]
pub async fn show(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    OptionalAuth(user): OptionalAuth,
    ctx: PageContext,
) -> Result<Response, AppError> {
    let Ok(id) = item_id.parse::<MenuItemId>() else {
        return Ok(not_found_page(ctx));
    };
    let Some(item) = state.platform().menu_item(id).await? else {
        return Ok(not_found_page(ctx));
    };

    let reviews = state.platform().reviews_for(id).await.unwrap_or_else(|e| {
        warn!(item_id = %id, error = %e, "Failed to load reviews");
        Vec::new()
    });

    Ok(ItemTemplate {
        ctx,
        item,
        reviews,
        reviewer_email: user.map(|u| u.email).unwrap_or_default(),
    }
    .into_response())
}

/// Post a review for a menu item.
#[instrument(skip(state, session, form))]
pub async fn create_review(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    session: Session,
    Form(form): Form<ReviewForm>,
) -> Response {
    let Ok(id) = item_id.parse::<MenuItemId>() else {
        return Redirect::to("/order").into_response();
    };
    let back = Redirect::to(&format!("/order/{id}"));

    let name = form.name.trim();
    let message = form.message.trim();
    if name.is_empty() || message.is_empty() {
        Flash::error("Review not posted", "Please enter your name and a message.")
            .set(&session)
            .await;
        return back.into_response();
    }
    let email = match Email::parse_optional(&form.email) {
        Ok(email) => email,
        Err(e) => {
            Flash::error("Review not posted", format!("Email: {e}"))
                .set(&session)
                .await;
            return back.into_response();
        }
    };

    let review = NewReview {
        item_id: id,
        name: name.to_string(),
        email,
        message: message.to_string(),
    };

    match state.platform().create_review(&review).await {
        Ok(()) => {
            Flash::success("Thank you!", "Your review has been posted.")
                .set(&session)
                .await;
        }
        Err(e) => {
            warn!(item_id = %id, error = %e, "Failed to post review");
            Flash::error("Review not posted", "Something went wrong. Please try again.")
                .set(&session)
                .await;
        }
    }
    back.into_response()
}
