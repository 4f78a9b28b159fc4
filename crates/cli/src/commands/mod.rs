//! Subcommand implementations

pub mod optimization;
pub mod runs;
