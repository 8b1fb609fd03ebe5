//! CatalogStore trait definition.

use super::cascade::CascadeReport;
use super::error::CatalogResult;
use super::models::*;

/// Trait for catalog storage backends.
///
/// Ids are opaque strings. An id that does not parse as a UUID can never
/// match a row, so implementations treat it the same as an absent one.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Retrieval
    // =========================================================================

    fn get_artist(&self, id: &str) -> CatalogResult<Option<Artist>>;

    /// Get an album by ID with its artist's name resolved.
    fn get_album(&self, id: &str) -> CatalogResult<Option<Album>>;

    /// Get a track by ID with its artist's and album's names resolved.
    fn get_track(&self, id: &str) -> CatalogResult<Option<Track>>;

    fn list_artists(&self, filter: &ArtistFilter, page: PageRequest) -> CatalogResult<Vec<Artist>>;

    fn list_albums(&self, filter: &AlbumFilter, page: PageRequest) -> CatalogResult<Vec<Album>>;

    fn list_tracks(&self, filter: &TrackFilter, page: PageRequest) -> CatalogResult<Vec<Track>>;

    // =========================================================================
    // Counts (for metrics)
    // =========================================================================

    fn get_artists_count(&self) -> usize;

    fn get_albums_count(&self) -> usize;

    fn get_tracks_count(&self) -> usize;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Validate and insert a new artist, returning it with its generated id.
    fn create_artist(&self, input: &ArtistInput) -> CatalogResult<Artist>;

    /// Apply the fields present in `input` to an existing artist.
    fn update_artist(&self, id: &str, input: &ArtistInput) -> CatalogResult<()>;

    /// Delete an artist together with all of its albums and tracks.
    fn delete_artist(&self, id: &str) -> CatalogResult<CascadeReport>;

    /// Validate and insert a new album. The referenced artist must exist.
    fn create_album(&self, input: &AlbumInput) -> CatalogResult<Album>;

    fn update_album(&self, id: &str, input: &AlbumInput) -> CatalogResult<()>;

    /// Delete an album together with its tracks.
    fn delete_album(&self, id: &str) -> CatalogResult<CascadeReport>;

    /// Validate and insert a new track. The referenced artist and album must exist.
    fn create_track(&self, input: &TrackInput) -> CatalogResult<Track>;

    fn update_track(&self, id: &str, input: &TrackInput) -> CatalogResult<()>;

    fn delete_track(&self, id: &str) -> CatalogResult<CascadeReport>;
}
