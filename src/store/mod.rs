// src/store/mod.rs
pub mod conversation;
pub mod product;

pub use conversation::ConversationStore;
pub use product::ProductStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("access denied")]
    AccessDenied,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
