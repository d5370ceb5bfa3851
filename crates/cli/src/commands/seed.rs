//! Seed the hosted data platform with menu items.
//!
//! This command reads menu items from a YAML file, validates all of them,
//! then creates every item whose name is not already on the menu.
//!
//! # File format
//!
//! ```yaml
//! items:
//!   - name: Ragi Dosa
//!     price: 90
//!     category: breakfast
//!     description: Crisp finger-millet crepe.
//!     image_url: https://cdn.example.com/ragi-dosa.jpg
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tracing::{error, info, warn};

use millets_storefront::config::PlatformConfig;
use millets_storefront::platform::{DataPlatform, HostedPlatform, MenuItemInput};

/// Menu seed file.
#[derive(Debug, Deserialize)]
pub struct MenuSeed {
    pub items: Vec<MenuItemSeed>,
}

/// One menu item in the seed file.
#[derive(Debug, Deserialize)]
pub struct MenuItemSeed {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl MenuItemSeed {
    fn to_input(&self) -> MenuItemInput {
        MenuItemInput {
            name: self.name.trim().to_string(),
            price: self
                .price
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            category: self.category.trim().to_string(),
            description: non_blank(self.description.as_deref()),
            image_url: non_blank(self.image_url.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Check every item, returning one message per problem.
#[must_use]
pub fn validate_seed(seed: &MenuSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for (index, item) in seed.items.iter().enumerate() {
        let position = index + 1;
        let name = item.name.trim();
        if name.is_empty() {
            errors.push(format!("item {position}: name is required"));
        } else if !names.insert(name.to_lowercase()) {
            errors.push(format!("item {position}: duplicate name {name:?}"));
        }
        if item.price.is_sign_negative() && !item.price.is_zero() {
            errors.push(format!("item {position}: price cannot be negative"));
        }
    }
    errors
}

/// Seed menu items from a YAML file.
///
/// Items whose name (case-insensitive) is already on the menu are skipped, so
/// the command can be re-run safely.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// the platform configuration is missing, or the menu cannot be listed.
pub async fn menu(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading menu items from file");

    // Read and validate YAML before connecting to the platform
    let content = tokio::fs::read_to_string(path).await?;
    let seed: MenuSeed = serde_yaml::from_str(&content)?;

    info!(items = seed.items.len(), "Parsed menu file");

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Menu validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let platform = HostedPlatform::new(&PlatformConfig::from_env()?)?;
    let existing: HashSet<String> = platform
        .list_menu(None)
        .await?
        .into_iter()
        .map(|item| item.name.trim().to_lowercase())
        .collect();

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    let mut failed = Vec::new();

    for item in &seed.items {
        let input = item.to_input();
        if existing.contains(&input.name.to_lowercase()) {
            skipped += 1;
            continue;
        }
        match platform.create_menu_item(&input).await {
            Ok(created) => {
                info!(item_id = %created.id, name = %created.name, "Created menu item");
                inserted += 1;
            }
            Err(e) => {
                warn!(name = %input.name, error = %e, "Failed to create menu item");
                failed.push((input.name, e));
            }
        }
    }

    info!("Seeding complete!");
    info!("  Items inserted: {inserted}");
    info!("  Items skipped (already on the menu): {skipped}");

    if !failed.is_empty() {
        error!("  Errors: {}", failed.len());
        for (name, err) in &failed {
            error!("    - {name}: {err}");
        }
        return Err(format!("{} items could not be created", failed.len()).into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let seed: MenuSeed = serde_yaml::from_str(include_str!("../../seed/menu.yaml")).unwrap();
        assert!(!seed.items.is_empty());
        assert!(validate_seed(&seed).is_empty());

        let payasam = seed
            .items
            .iter()
            .find(|item| item.name == "Kodo Millet Payasam")
            .unwrap();
        assert_eq!(payasam.to_input().price, Decimal::new(9550, 2));
    }

    #[test]
    fn test_validation_reports_each_problem() {
        let seed: MenuSeed = serde_yaml::from_str(
            r#"
items:
  - name: "  "
    price: 10
  - name: Ragi Malt
    price: -1
  - name: ragi malt
    price: 60
    description: "   "
"#,
        )
        .unwrap();

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("name is required"));
        assert!(errors[1].contains("negative"));
        assert!(errors[2].contains("duplicate"));
        assert!(seed.items[2].to_input().description.is_none());
    }
}
