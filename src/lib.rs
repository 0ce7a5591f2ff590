//! Reorders JavaScript and TypeScript functions so they read top to bottom:
//! each function appears above the sibling functions it calls.

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use error::{ReadorderError, Result};
