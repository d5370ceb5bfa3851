//! Millets CLI - Session migrations, menu seeding and role management.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! millets-cli migrate sessions
//!
//! # Load menu items from a YAML file
//! millets-cli seed menu crates/cli/seed/menu.yaml
//!
//! # Promote a user to the admin console
//! millets-cli role set --user-id 6f1c...e2 --role admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create the server-side session table
//! - `seed` - Load data onto the hosted platform
//! - `role` - Manage account roles

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "millets-cli")]
#[command(author, version, about = "Millets CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Seed the hosted data platform
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage account roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the `tower_sessions` schema and session table
    Sessions,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create menu items from a YAML file, skipping names already on the menu
    Menu {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum RoleAction {
    /// Set the role of an account
    Set {
        /// Account id on the platform's auth service
        #[arg(short, long)]
        user_id: String,

        /// Role (`customer`, `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Menu { file } => commands::seed::menu(&file).await?,
        },
        Commands::Role { action } => match action {
            RoleAction::Set { user_id, role } => commands::role::set(&user_id, &role).await?,
        },
    }
    Ok(())
}
