//! HTTP API module.
//!
//! This module provides the HTTP server, request/response types and the
//! log broadcaster shared by every layer of the backend.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server, AppState};
pub use types::*;
pub use logs::*;
