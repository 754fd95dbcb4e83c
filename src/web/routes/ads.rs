use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::error::AppResult;
use crate::models::Caller;
use crate::services::ads_map_service::{self, AdProperties, AdsQuery};
use crate::services::assembler::FeatureCollection;
use crate::state::AppState;

pub async fn ads_map_handler(
    Extension(caller): Extension<Caller>,
    Query(query): Query<AdsQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<FeatureCollection<AdProperties>>> {
    ads_map_service::ads_map(&state, &caller, &query)
        .await
        .map(Json)
}

pub async fn ads_list_handler(
    Extension(caller): Extension<Caller>,
    Query(query): Query<AdsQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<FeatureCollection<AdProperties>>> {
    ads_map_service::ads_list(&state, &caller, &query)
        .await
        .map(Json)
}
