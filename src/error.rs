use std::fmt::Debug;

use thiserror::Error;

// Internal carries no detail. The store error behind it is logged in translate().
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("internal error")]
    Internal,
}

/// Storage-level classification of a failed store call, supplied by each
/// [`Store`](crate::store::Store) implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    UniqueViolation,
    MissingRow,
    ReferenceViolation,
    Other,
}

// A foreign key violation on Delete means dependents exist; on Write it means
// the referenced parent is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Delete,
}

/// Maps a classified store failure onto a domain error for `entity`.
pub fn translate<E: Debug>(failure: StoreFailure, action: Action, entity: &str, err: &E) -> DomainError {
    match (failure, action) {
        (StoreFailure::UniqueViolation, _) => DomainError::Conflict(format!("{} already exists", entity)),
        (StoreFailure::MissingRow, _) => DomainError::NotFound(entity.to_string()),
        (StoreFailure::ReferenceViolation, Action::Delete) => {
            DomainError::Conflict(format!("{} is still referenced and cannot be deleted", entity))
        }
        (StoreFailure::ReferenceViolation, _) => {
            DomainError::NotFound(format!("record referenced by {}", entity))
        }
        (StoreFailure::Other, _) => {
            log::error!("store failure on {} ({:?}): {:?}", entity, action, err);
            DomainError::Internal
        }
    }
}
