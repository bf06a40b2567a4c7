//! I/O helpers for admission commands.

pub mod config;
pub mod object_store;
