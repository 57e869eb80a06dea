// SPDX-License-Identifier: MIT

//! Store-boundary errors (§7 `StoreTransient` / `StoreFatal`).

use thiserror::Error;

/// Errors surfaced by a [`crate::JobStore`]/[`crate::SliceStore`]/
/// [`crate::ServerStore`] implementation.
///
/// The reference in-memory adapter never produces `Transient` (there is no
/// network to fail), but the variant is part of the contract so a
/// networked adapter (§6 "geo-replicated" job store) has somewhere to
/// report a retryable failure without inventing a second error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key inserting {collection} id {id}")]
    DuplicateKey { collection: &'static str, id: String },
    #[error("no document found for {collection} id {id}")]
    NotFound { collection: &'static str, id: String },
    #[error("transient store failure: {0}")]
    Transient(String),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}
