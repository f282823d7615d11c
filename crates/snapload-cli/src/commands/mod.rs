//! Subcommand implementations

pub mod extract;
pub mod info;
pub mod load;
pub mod resources;
