//! Test fixture creation for the catalog and user databases
//!
//! The seeded catalog has 2 artists, 2 albums and 5 tracks. Ids are generated
//! by the store, so they are returned in [`CatalogIds`] instead of being constants.

use super::constants::*;
use anyhow::{Context, Result};
use music_catalog_server::catalog_store::{
    AlbumInput, ArtistInput, CatalogStore, TrackInput,
};
use music_catalog_server::user::{UserManager, UserRole};

/// Ids of the seeded catalog entities.
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct CatalogIds {
    pub artist_1: String,
    pub artist_2: String,
    pub album_1: String,
    pub album_2: String,
    pub track_1: String,
    pub track_2: String,
    pub track_3: String,
    pub track_4: String,
    pub track_5: String,
}

fn artist(store: &dyn CatalogStore, name: &str, grammy: i64) -> Result<String> {
    let input = ArtistInput {
        name: Some(name.to_string()),
        grammy: Some(grammy),
        hidden: Some(false),
    };
    Ok(store
        .create_artist(&input)
        .with_context(|| format!("Failed to seed artist {}", name))?
        .id)
}

fn album(store: &dyn CatalogStore, name: &str, artist_id: &str, year: i64) -> Result<String> {
    let input = AlbumInput {
        name: Some(name.to_string()),
        artist_id: Some(artist_id.to_string()),
        year: Some(year),
        hidden: Some(false),
    };
    Ok(store
        .create_album(&input)
        .with_context(|| format!("Failed to seed album {}", name))?
        .id)
}

fn track(store: &dyn CatalogStore, name: &str, artist_id: &str, album_id: &str) -> Result<String> {
    let input = TrackInput {
        name: Some(name.to_string()),
        artist_id: Some(artist_id.to_string()),
        album_id: Some(album_id.to_string()),
        duration: Some(TRACK_DURATION),
        hidden: Some(false),
    };
    Ok(store
        .create_track(&input)
        .with_context(|| format!("Failed to seed track {}", name))?
        .id)
}

/// Fills an empty catalog store with the test catalog.
pub fn seed_catalog(store: &dyn CatalogStore) -> Result<CatalogIds> {
    let artist_1 = artist(store, ARTIST_1_NAME, ARTIST_1_GRAMMY)?;
    let artist_2 = artist(store, ARTIST_2_NAME, ARTIST_2_GRAMMY)?;
    let album_1 = album(store, ALBUM_1_NAME, &artist_1, ALBUM_1_YEAR)?;
    let album_2 = album(store, ALBUM_2_NAME, &artist_2, ALBUM_2_YEAR)?;

    Ok(CatalogIds {
        track_1: track(store, TRACK_1_NAME, &artist_1, &album_1)?,
        track_2: track(store, TRACK_2_NAME, &artist_1, &album_1)?,
        track_3: track(store, TRACK_3_NAME, &artist_1, &album_1)?,
        track_4: track(store, TRACK_4_NAME, &artist_2, &album_2)?,
        track_5: track(store, TRACK_5_NAME, &artist_2, &album_2)?,
        artist_1,
        artist_2,
        album_1,
        album_2,
    })
}

/// Creates one user per role.
pub fn seed_users(user_manager: &UserManager) -> Result<()> {
    user_manager.add_user(ADMIN_EMAIL, ADMIN_PASS, UserRole::Admin)?;
    user_manager.add_user(EDITOR_EMAIL, EDITOR_PASS, UserRole::Editor)?;
    user_manager.add_user(VIEWER_EMAIL, VIEWER_PASS, UserRole::Viewer)?;
    Ok(())
}
