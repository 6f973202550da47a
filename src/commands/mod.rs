//! Command handlers (driving adapters)
//!
//! Thin functions the front end calls. Each returns `Result<T, String>` with
//! the error's display text, since the operator only ever sees a message.

pub mod config;
pub mod io;
pub mod serial;
pub mod status;
