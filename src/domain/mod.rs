//! Core domain types
//!
//! Pure types with no I/O dependencies. These represent the core concepts
//! of the I/O panel.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
