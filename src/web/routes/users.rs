use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::error::AppResult;
use crate::models::Caller;
use crate::services::assembler::FeatureCollection;
use crate::services::who_service::{self, UserProperties, WhoQuery};
use crate::state::AppState;

pub async fn who_handler(
    Extension(caller): Extension<Caller>,
    Query(query): Query<WhoQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<FeatureCollection<UserProperties>>> {
    who_service::who_is_near(&state, &caller, &query)
        .await
        .map(Json)
}

pub async fn who_list_handler(
    Extension(caller): Extension<Caller>,
    Query(query): Query<WhoQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<FeatureCollection<UserProperties>>> {
    who_service::who_is_near_list(&state, &caller, &query)
        .await
        .map(Json)
}
