//! Millets Core - Shared types library.
//!
//! This crate provides the domain types used by the Millets components:
//! - `storefront` - Public restaurant site with ordering, booking and admin console
//! - `cli` - Command-line tools for session migrations, menu seeding and roles
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Persistence lives on the hosted data platform and is reached
//! through the storefront's platform client.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, statuses and order snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
