//! Crate-level error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] shardline_config::Error),

    #[error("{0}")]
    Rules(#[from] crate::rules::Error),

    #[error("{0}")]
    Binder(#[from] crate::binder::Error),

    #[error("{0}")]
    Router(#[from] crate::router::Error),
}
