use super::favorites::FavoriteCategory;
use crate::catalog_store::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found.")]
    NotFound,

    #[error("Email already exists.")]
    DuplicateEmail,

    #[error("{0}")]
    Invalid(String),

    #[error("Old password is incorrect.")]
    WrongPassword,

    #[error("Item already in favorites")]
    DuplicateFavorite,

    #[error("Favorite not found.")]
    FavoriteNotFound,

    /// The caller is authenticated but acts on someone else's resource.
    #[error("Forbidden Access")]
    NotOwner,

    #[error("{category} not found.")]
    MissingReferent {
        category: FavoriteCategory,
        id: String,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
