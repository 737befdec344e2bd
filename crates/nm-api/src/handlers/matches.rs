use axum::{
    Json,
    extract::{Path, Query, State},
};

use nm_common::api::{MatchDetailsResponse, MatchListResponse, MatchQuery};

use crate::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;

pub async fn list_matches(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<MatchQuery>,
) -> Result<Json<MatchListResponse>, ApiError> {
    let filters = query.into_filters()?;
    let list = state.service.get_matches(&auth.user_id, &filters).await?;

    Ok(Json(list.into()))
}

pub async fn match_details(
    State(state): State<SharedState>,
    Path(target_id): Path<String>,
    auth: AuthUser,
) -> Result<Json<MatchDetailsResponse>, ApiError> {
    let details = state
        .service
        .get_match_details(&auth.user_id, &target_id)
        .await?;

    Ok(Json(details.into()))
}
