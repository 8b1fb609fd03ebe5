//! Catalog entity types.
//!
//! Stored entities are what list and get operations return, the `*Input`
//! types carry create/update payloads where every field is optional so that
//! validation can name the field that is missing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 5;
pub const MAX_PAGE_LIMIT: usize = 100;
/// SQLite offsets are signed 64-bit.
pub const MAX_PAGE_OFFSET: usize = i64::MAX as usize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artist {
    #[serde(rename = "artist_id")]
    pub id: String,
    pub name: String,
    pub grammy: i64,
    pub hidden: bool,
}

/// An album together with the name of the artist it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    #[serde(rename = "album_id")]
    pub id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub name: String,
    pub year: i64,
    pub hidden: bool,
}

/// A track together with the names of the artist and album it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    #[serde(rename = "track_id")]
    pub id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub album_id: String,
    pub album_name: String,
    pub name: String,
    pub duration: i64,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistInput {
    pub name: Option<String>,
    pub grammy: Option<i64>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumInput {
    pub name: Option<String>,
    pub artist_id: Option<String>,
    pub year: Option<i64>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackInput {
    pub name: Option<String>,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub duration: Option<i64>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ArtistFilter {
    pub grammy: Option<i64>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumFilter {
    pub artist_id: Option<String>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Applies the defaults, clamps `limit` to `1..=MAX_PAGE_LIMIT` and
    /// `offset` to `MAX_PAGE_OFFSET`.
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        PageRequest {
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).min(MAX_PAGE_OFFSET),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}
