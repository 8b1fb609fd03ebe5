//! Per-user favorites routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;

use crate::catalog_store::PageRequest;
use crate::server::api::{ApiError, ApiJson, ApiQuery, ApiResponse, ApiResult};
use crate::server::session::{EditorSession, Session};
use crate::server::state::{GuardedFavoritesLedger, ServerState};
use crate::user::{Favorite, FavoriteCategory, FavoriteTarget};

#[derive(Debug, Deserialize)]
pub struct AddFavoriteBody {
    pub category: Option<String>,
    pub item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn parse_category(raw: &str) -> Result<FavoriteCategory, ApiError> {
    raw.parse::<FavoriteCategory>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

async fn list_favorites(
    session: Session,
    State(favorites): State<GuardedFavoritesLedger>,
    Path(category): Path<String>,
    ApiQuery(query): ApiQuery<FavoritesQuery>,
) -> ApiResult<Vec<Favorite>> {
    let category = parse_category(&category)?;
    let page = PageRequest::new(query.limit, query.offset);
    let list = favorites.list(session.user_id(), category, page)?;
    Ok(ApiResponse::ok(list, "Favorites retrieved successfully."))
}

async fn add_favorite(
    EditorSession(session): EditorSession,
    State(favorites): State<GuardedFavoritesLedger>,
    ApiJson(body): ApiJson<AddFavoriteBody>,
) -> ApiResult<Favorite> {
    let category = match body.category.as_deref() {
        Some(raw) => parse_category(raw)?,
        None => return Err(ApiError::bad_request("Field 'category' is required")),
    };
    let item_id = match body.item_id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(ApiError::bad_request("Field 'item_id' is required")),
    };

    let favorite = favorites.add(session.user_id(), FavoriteTarget::new(category, item_id))?;
    Ok(ApiResponse::created_with(
        favorite,
        "Favorite added successfully.",
    ))
}

async fn remove_favorite(
    session: Session,
    State(favorites): State<GuardedFavoritesLedger>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    favorites.remove(session.user_id(), &id)?;
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Favorite removed successfully.",
    ))
}

pub fn favorites_routes() -> Router<ServerState> {
    Router::new()
        .route("/add-favorite", post(add_favorite))
        .route("/remove-favorite/{id}", delete(remove_favorite))
        .route("/{category}", get(list_favorites))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing() {
        assert_eq!(parse_category("album").unwrap(), FavoriteCategory::Album);
        assert_eq!(parse_category("Track").unwrap(), FavoriteCategory::Track);
        assert_eq!(
            parse_category("playlist").unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
