//! Per-user favorites: which catalog entity a favorite points at, and the
//! ledger that checks the referent before recording it.

use super::error::UserError;
use super::user_store::UserStore;
use crate::catalog_store::{CatalogStore, PageRequest};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteCategory {
    Artist,
    Album,
    Track,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Category must be one of: artist, album, track")]
pub struct InvalidCategory;

impl FavoriteCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FavoriteCategory::Artist => "artist",
            FavoriteCategory::Album => "album",
            FavoriteCategory::Track => "track",
        }
    }
}

impl FromStr for FavoriteCategory {
    type Err = InvalidCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "artist" => Ok(FavoriteCategory::Artist),
            "album" => Ok(FavoriteCategory::Album),
            "track" => Ok(FavoriteCategory::Track),
            _ => Err(InvalidCategory),
        }
    }
}

impl fmt::Display for FavoriteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The catalog entity a favorite refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FavoriteTarget {
    Artist(String),
    Album(String),
    Track(String),
}

impl FavoriteTarget {
    pub fn new(category: FavoriteCategory, item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        match category {
            FavoriteCategory::Artist => FavoriteTarget::Artist(item_id),
            FavoriteCategory::Album => FavoriteTarget::Album(item_id),
            FavoriteCategory::Track => FavoriteTarget::Track(item_id),
        }
    }

    pub fn category(&self) -> FavoriteCategory {
        match self {
            FavoriteTarget::Artist(_) => FavoriteCategory::Artist,
            FavoriteTarget::Album(_) => FavoriteCategory::Album,
            FavoriteTarget::Track(_) => FavoriteCategory::Track,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            FavoriteTarget::Artist(id) | FavoriteTarget::Album(id) | FavoriteTarget::Track(id) => {
                id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub target: FavoriteTarget,
    /// Name of the referent when the favorite was added. Not kept in sync.
    pub name: String,
    /// Unix seconds.
    pub created: i64,
}

#[derive(Serialize)]
struct FavoriteView<'a> {
    favorite_id: &'a str,
    user_id: &'a str,
    category: FavoriteCategory,
    item_id: &'a str,
    name: &'a str,
    created_at: i64,
}

impl Serialize for Favorite {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FavoriteView {
            favorite_id: &self.id,
            user_id: &self.user_id,
            category: self.target.category(),
            item_id: self.target.item_id(),
            name: &self.name,
            created_at: self.created,
        }
        .serialize(serializer)
    }
}

pub struct FavoritesLedger {
    catalog_store: Arc<dyn CatalogStore>,
    user_store: Arc<dyn UserStore>,
}

impl FavoritesLedger {
    pub fn new(catalog_store: Arc<dyn CatalogStore>, user_store: Arc<dyn UserStore>) -> Self {
        FavoritesLedger {
            catalog_store,
            user_store,
        }
    }

    fn referent_name(&self, target: &FavoriteTarget) -> Result<Option<String>, UserError> {
        Ok(match target {
            FavoriteTarget::Artist(id) => self.catalog_store.get_artist(id)?.map(|a| a.name),
            FavoriteTarget::Album(id) => self.catalog_store.get_album(id)?.map(|a| a.name),
            FavoriteTarget::Track(id) => self.catalog_store.get_track(id)?.map(|t| t.name),
        })
    }

    /// Records `target` as a favorite of `user_id`, snapshotting its current name.
    pub fn add(&self, user_id: &str, target: FavoriteTarget) -> Result<Favorite, UserError> {
        let name = self
            .referent_name(&target)?
            .ok_or_else(|| UserError::MissingReferent {
                category: target.category(),
                id: target.item_id().to_string(),
            })?;

        let favorite = self
            .user_store
            .add_favorite(user_id, &target, &name)?
            .ok_or(UserError::DuplicateFavorite)?;
        info!(
            "User {} added {} {} to favorites",
            user_id,
            target.category(),
            target.item_id()
        );
        Ok(favorite)
    }

    /// Removes a favorite. Only its owner may remove it.
    pub fn remove(&self, user_id: &str, favorite_id: &str) -> Result<Favorite, UserError> {
        let favorite = self
            .user_store
            .get_favorite(favorite_id)?
            .ok_or(UserError::FavoriteNotFound)?;
        if favorite.user_id != user_id {
            return Err(UserError::NotOwner);
        }
        if !self.user_store.remove_favorite(favorite_id)? {
            return Err(UserError::FavoriteNotFound);
        }
        Ok(favorite)
    }

    pub fn list(
        &self,
        user_id: &str,
        category: FavoriteCategory,
        page: PageRequest,
    ) -> Result<Vec<Favorite>, UserError> {
        Ok(self.user_store.list_favorites(user_id, category, page)?)
    }
}
