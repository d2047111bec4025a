//! Durable client storage for the hospital portal.
//!
//! This crate provides:
//! - A [`ClientStorage`] trait with a JSON file backend and an in-memory backend
//! - The [`TokenStore`], which owns the persisted token pair and identity cache
//! - The session records ([`TokenPair`], [`Identity`], [`Role`]) shared with
//!   the auth crate

mod file;
mod keys;
mod memory;
mod records;
mod token_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use records::{Identity, Role, TokenPair, UnknownRole};
pub use token_store::TokenStore;
pub use traits::ClientStorage;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default file-backed storage at the given path.
pub fn create_storage(path: &Path) -> StorageResult<Box<dyn ClientStorage>> {
    let storage = FileStorage::open(path)?;
    Ok(Box::new(storage))
}

/// Create a TokenStore over the default file-backed storage.
pub fn create_token_store(path: &Path) -> StorageResult<TokenStore> {
    let storage = create_storage(path)?;
    Ok(TokenStore::new(storage))
}
