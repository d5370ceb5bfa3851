//! Menu listing route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::{instrument, warn};

use crate::filters;
use crate::middleware::PageContext;
use crate::models::Flash;
use crate::platform::MenuItem;
use crate::state::AppState;

/// A category filter link.
#[derive(Debug, Clone)]
pub struct CategoryLink {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

impl CategoryLink {
    /// Links for `categories`, marking `current` as selected.
    #[must_use]
    pub fn list(categories: &[String], current: Option<&str>) -> Vec<Self> {
        categories
            .iter()
            .map(|name| Self {
                href: format!("/menu/{}", urlencoding::encode(name)),
                selected: current == Some(name.as_str()),
                name: name.clone(),
            })
            .collect()
    }
}

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu.html")]
pub struct MenuTemplate {
    pub ctx: PageContext,
    pub heading: String,
    pub items: Vec<MenuItem>,
    pub categories: Vec<CategoryLink>,
    pub showing_all: bool,
}

async fn render(state: &AppState, mut ctx: PageContext, category: Option<&str>) -> MenuTemplate {
    let catalog = state.catalog();
    let (items, categories) = match (catalog.list(category).await, catalog.categories().await) {
        (Ok(items), Ok(categories)) => (items.as_ref().clone(), categories),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, ?category, "Failed to load menu");
            ctx.flash.get_or_insert_with(|| {
                Flash::error("Menu unavailable", "We couldn't load the menu. Please try again.")
            });
            (Vec::new(), Vec::new())
        }
    };

    MenuTemplate {
        ctx,
        heading: category.map_or_else(|| "Our Menu".to_string(), ToString::to_string),
        items,
        categories: CategoryLink::list(&categories, category),
        showing_all: category.is_none(),
    }
}

/// Display the full menu.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    render(&state, ctx, None).await
}

/// Display one category of the menu.
#[instrument(skip(state, ctx))]
pub async fn category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    ctx: PageContext,
) -> impl IntoResponse {
    render(&state, ctx, Some(category.trim())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_links_mark_selection() {
        let categories = vec!["breakfast".to_string(), "south indian".to_string()];
        let links = CategoryLink::list(&categories, Some("south indian"));
        assert!(!links[0].selected);
        assert!(links[1].selected);
        assert_eq!(links[1].href, "/menu/south%20indian");
    }
}
