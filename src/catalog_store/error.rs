use super::cascade::EntityKind;
use super::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found.")]
    NotFound(EntityKind),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A multi-row write was rejected by the store and rolled back.
    #[error("Could not delete {kind}: {reason}")]
    Integrity { kind: EntityKind, reason: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
