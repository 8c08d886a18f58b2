//! Configuration module for spritestage exports
//!
//! Provides types and parsing for `sheet.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
