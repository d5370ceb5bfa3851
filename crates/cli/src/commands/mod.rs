//! CLI subcommands.

pub mod migrate;
pub mod role;
pub mod seed;
