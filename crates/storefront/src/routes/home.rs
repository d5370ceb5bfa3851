//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::{instrument, warn};

use crate::filters;
use crate::middleware::PageContext;
use crate::models::Flash;
use crate::platform::MenuItem;
use crate::routes::menu::CategoryLink;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<MenuItem>,
    pub categories: Vec<CategoryLink>,
}

/// Display the home page: a few featured dishes and the menu's categories.
#[instrument(skip(state, ctx))]
pub async fn home(State(state): State<AppState>, mut ctx: PageContext) -> impl IntoResponse {
    let catalog = state.catalog();
    let (featured, categories) = match (catalog.featured().await, catalog.categories().await) {
        (Ok(featured), Ok(categories)) => (featured, categories),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Failed to load menu for home page");
            ctx.flash.get_or_insert_with(|| {
                Flash::error("Menu unavailable", "We couldn't load the menu. Please try again.")
            });
            (Vec::new(), Vec::new())
        }
    };

    HomeTemplate {
        ctx,
        featured,
        categories: CategoryLink::list(&categories, None),
    }
}
