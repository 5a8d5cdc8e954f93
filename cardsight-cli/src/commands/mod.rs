//! Subcommand implementations.

pub mod build;
pub mod identify;
pub mod inspect;
pub mod status;
