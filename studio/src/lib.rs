//! Backend for editing MCP widget servers
//!
//! Draft overlays over live server state, a session changelog, and a
//! supervisor for build/deploy commands, all persisted in one JSON document.

pub mod changelog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod overlay;
pub mod store;
pub mod supervisor;
pub mod web;

pub use error::{Result, StudioError};
pub use store::Store;
