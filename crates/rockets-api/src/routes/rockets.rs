//! Read endpoints of the Rocket context.

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get};
use rockets_rocket::application::query_handlers::{
    FindRocketById, RocketQuery, RocketView, SearchRockets,
};
use rockets_rocket::domain::repository::{DEFAULT_SORT, SortKey};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Query string of GET /rockets.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Sort token such as `launch_speed` or `-created_at`.
    pub sort: Option<String>,
}

/// GET /rockets/{rocket_id}
#[instrument(skip(state))]
async fn get_rocket(
    State(state): State<AppState>,
    Path(rocket_id): Path<String>,
) -> Result<Json<RocketView>, ApiError> {
    let view = state
        .queries
        .dispatch_as(RocketQuery::FindById(FindRocketById { rocket_id }))
        .await?;
    Ok(Json(view))
}

/// GET /rockets
#[instrument(skip(state))]
async fn search_rockets(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<RocketView>>, ApiError> {
    let token = params.sort.as_deref().unwrap_or(DEFAULT_SORT);
    let views = state
        .queries
        .dispatch_as(RocketQuery::Search(SearchRockets {
            sort: SortKey::parse(token),
        }))
        .await?;
    Ok(Json(views))
}

/// Returns the router for rocket queries.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rockets", get(search_rockets))
        .route("/rockets/{rocket_id}", get(get_rocket))
}
