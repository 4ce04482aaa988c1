//! Error taxonomy shared by the resolver, ledger and supervisor
//!
//! The web layer maps each variant onto an HTTP status; see `web::error`.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum StudioError {
    /// Referenced server, action, resource, deployment or entry does not exist
    #[error("{0}")]
    NotFound(String),

    /// Duplicate identifier
    #[error("{0}")]
    Conflict(String),

    /// Malformed payload; rejected before anything is written
    #[error("{0}")]
    Validation(String),

    /// The live server could not serve a request that has no local fallback
    #[error("Live server error: {0}")]
    Upstream(String),

    /// Writing drafts to the external config files failed
    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, StudioError>;

impl StudioError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StudioError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        StudioError::Validation(msg.into())
    }
}
