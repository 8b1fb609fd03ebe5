//! Catalog HTTP routes: artists, albums and tracks.
//!
//! Reads are open to every authenticated user. Creating and updating needs
//! an admin or editor, deleting artists and albums needs an admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog_store::{
    Album, AlbumFilter, AlbumInput, Artist, ArtistFilter, ArtistInput, CascadeReport,
    CatalogError, CatalogResult, EntityKind, PageRequest, Track, TrackFilter, TrackInput,
};
use crate::server::api::{ApiError, ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::server::metrics::{record_cascade_delete, refresh_catalog_metrics};
use crate::server::session::{AdminSession, EditorSession, Session};
use crate::server::state::{GuardedCatalogStore, ServerState};

// =============================================================================
// Query Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ArtistsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub grammy: Option<i64>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub artist_id: Option<String>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct TracksQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub hidden: Option<bool>,
}

// =============================================================================
// Helpers
// =============================================================================

fn found<T>(entity: Option<T>, kind: EntityKind) -> Result<T, ApiError> {
    entity.ok_or_else(|| CatalogError::NotFound(kind).into())
}

/// Records the outcome of a delete and renders the summary message.
fn finish_delete(
    catalog_store: &GuardedCatalogStore,
    kind: EntityKind,
    result: CatalogResult<CascadeReport>,
) -> ApiResult<()> {
    match result {
        Ok(report) => {
            record_cascade_delete(kind, Ok(&report));
            info!(
                "Deleted {} {} ({}) with {} albums and {} tracks",
                kind,
                report.id,
                report.name,
                report.removed(EntityKind::Album),
                report.removed(EntityKind::Track)
            );
            refresh_catalog_metrics(catalog_store.as_ref());
            Ok(ApiResponse::message(
                StatusCode::OK,
                format!("{}: {} deleted successfully.", kind, report.name),
            ))
        }
        Err(err) => {
            let outcome = match &err {
                CatalogError::NotFound(_) => "not_found",
                CatalogError::Integrity { .. } => "rolled_back",
                _ => "error",
            };
            if outcome != "not_found" {
                warn!("Delete of {} failed: {}", kind, err);
            }
            record_cascade_delete(kind, Err(outcome));
            Err(err.into())
        }
    }
}

// =============================================================================
// Artists
// =============================================================================

async fn list_artists(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiQuery(query): ApiQuery<ArtistsQuery>,
) -> ApiResult<Vec<Artist>> {
    let filter = ArtistFilter {
        grammy: query.grammy,
        hidden: query.hidden,
    };
    let page = PageRequest::new(query.limit, query.offset);
    let artists = catalog_store.list_artists(&filter, page)?;
    Ok(ApiResponse::ok(artists, "Artists retrieved successfully."))
}

async fn get_artist(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<Artist> {
    let artist = found(catalog_store.get_artist(&id)?, EntityKind::Artist)?;
    Ok(ApiResponse::ok(artist, "Artist retrieved successfully."))
}

async fn create_artist(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiJson(input): ApiJson<ArtistInput>,
) -> ApiResult<Artist> {
    let artist = catalog_store.create_artist(&input)?;
    refresh_catalog_metrics(catalog_store.as_ref());
    Ok(ApiResponse::created_with(artist, "Artist created successfully."))
}

async fn update_artist(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ArtistInput>,
) -> ApiResult<()> {
    catalog_store.update_artist(&id, &input)?;
    Ok(ApiResponse::no_content())
}

async fn delete_artist(
    _admin: AdminSession,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let result = catalog_store.delete_artist(&id);
    finish_delete(&catalog_store, EntityKind::Artist, result)
}

// =============================================================================
// Albums
// =============================================================================

async fn list_albums(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiQuery(query): ApiQuery<AlbumsQuery>,
) -> ApiResult<Vec<Album>> {
    let filter = AlbumFilter {
        artist_id: query.artist_id,
        hidden: query.hidden,
    };
    let page = PageRequest::new(query.limit, query.offset);
    let albums = catalog_store.list_albums(&filter, page)?;
    Ok(ApiResponse::ok(albums, "Albums retrieved successfully."))
}

async fn get_album(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<Album> {
    let album = found(catalog_store.get_album(&id)?, EntityKind::Album)?;
    Ok(ApiResponse::ok(album, "Album retrieved successfully."))
}

async fn create_album(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiJson(input): ApiJson<AlbumInput>,
) -> ApiResult<Album> {
    let album = catalog_store.create_album(&input)?;
    refresh_catalog_metrics(catalog_store.as_ref());
    Ok(ApiResponse::created_with(album, "Album created successfully."))
}

async fn update_album(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AlbumInput>,
) -> ApiResult<()> {
    catalog_store.update_album(&id, &input)?;
    Ok(ApiResponse::no_content())
}

async fn delete_album(
    _admin: AdminSession,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let result = catalog_store.delete_album(&id);
    finish_delete(&catalog_store, EntityKind::Album, result)
}

// =============================================================================
// Tracks
// =============================================================================

async fn list_tracks(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiQuery(query): ApiQuery<TracksQuery>,
) -> ApiResult<Vec<Track>> {
    let filter = TrackFilter {
        artist_id: query.artist_id,
        album_id: query.album_id,
        hidden: query.hidden,
    };
    let page = PageRequest::new(query.limit, query.offset);
    let tracks = catalog_store.list_tracks(&filter, page)?;
    Ok(ApiResponse::ok(tracks, "Tracks retrieved successfully."))
}

async fn get_track(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<Track> {
    let track = found(catalog_store.get_track(&id)?, EntityKind::Track)?;
    Ok(ApiResponse::ok(track, "Track retrieved successfully."))
}

async fn create_track(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    ApiJson(input): ApiJson<TrackInput>,
) -> ApiResult<Track> {
    let track = catalog_store.create_track(&input)?;
    refresh_catalog_metrics(catalog_store.as_ref());
    Ok(ApiResponse::created_with(track, "Track created successfully."))
}

async fn update_track(
    _editor: EditorSession,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TrackInput>,
) -> ApiResult<()> {
    catalog_store.update_track(&id, &input)?;
    Ok(ApiResponse::no_content())
}

/// Any authenticated user may delete a track.
async fn delete_track(
    _session: Session,
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let result = catalog_store.delete_track(&id);
    finish_delete(&catalog_store, EntityKind::Track, result)
}

// =============================================================================
// Router Construction
// =============================================================================

pub fn artist_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_artists))
        .route("/add-artist", post(create_artist))
        .route(
            "/{id}",
            get(get_artist).put(update_artist).delete(delete_artist),
        )
}

pub fn album_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_albums))
        .route("/add-album", post(create_album))
        .route("/{id}", get(get_album).put(update_album).delete(delete_album))
}

pub fn track_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(list_tracks))
        .route("/add-track", post(create_track))
        .route("/{id}", get(get_track).put(update_track).delete(delete_track))
}
