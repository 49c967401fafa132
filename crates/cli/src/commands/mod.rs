//! Subcommand implementations

pub mod inspect;
pub mod predict;
pub mod service;
pub mod train;
