use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::database::candidates::{DistanceFilter, UserFilter};
use crate::error::AppResult;
use crate::geo::{effective_radius, AgeRange};
use crate::models::{Caller, UserPointRow};
use crate::services::assembler::{feature_collection, FeatureCollection, ResultRow};
use crate::services::clustering::{cluster_or_list, list_page, ClusterRequest, PgCandidates};
use crate::services::query_params;
use crate::state::AppState;

pub const MIN_RADIUS_M: f64 = 50.0;
pub const MAX_REQUESTED_RADIUS_M: f64 = 250_000.0;

#[derive(Debug, Deserialize, Default)]
pub struct WhoQuery {
    pub radius: Option<f64>,
    pub zoom: Option<f64>,
    pub eps: Option<f64>,
    pub minpoints: Option<i64>,
    pub sex: Option<String>,
    pub age: Option<String>,
    pub in_bbox: Option<String>,
    pub is_contact: Option<String>,
    pub is_favorite: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProperties {
    pub uuid: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub geom_count: i64,
    pub is_cluster: bool,
}

impl UserProperties {
    fn from_result(result: &ResultRow<UserPointRow>, files_url: &str) -> Self {
        let row = &result.row;
        Self {
            uuid: row.uuid,
            display_name: row.display_name.clone(),
            avatar_url: row.avatar_uuid.map(|id| avatar_url(files_url, id)),
            geom_count: row.geom_count,
            is_cluster: result.is_cluster,
        }
    }
}

pub fn avatar_url(files_url: &str, avatar: Uuid) -> String {
    format!("{}/av/{}", files_url.trim_end_matches('/'), avatar)
}

/// Users visible to `caller`: online, broadcasting, not blocked by the
/// caller, within the capped radius of the caller's last known location.
pub fn user_filter(
    caller: &Caller,
    query: &WhoQuery,
    config: &Config,
    today: NaiveDate,
) -> AppResult<UserFilter> {
    let radius = query_params::radius(query.radius, MIN_RADIUS_M, MAX_REQUESTED_RADIUS_M)?;
    let distance = caller.location.map(|center| DistanceFilter {
        center,
        radius_m: effective_radius(radius, config.users.max_radius_m, config.distance_error),
    });
    let (born_after, born_before) = query
        .age
        .as_deref()
        .map(AgeRange::parse)
        .unwrap_or_default()
        .birth_dates(today);

    Ok(UserFilter {
        caller: caller.id,
        distance,
        bbox: query_params::bbox(query.in_bbox.as_deref())?,
        sex: query_params::sex(query.sex.as_deref())?,
        born_after,
        born_before,
        only_online: true,
        exclude_blocked: true,
        is_contact: query_params::toggle(query.is_contact.as_deref()),
        is_favorite: query_params::toggle(query.is_favorite.as_deref()),
    })
}

pub async fn who_is_near(
    state: &AppState,
    caller: &Caller,
    query: &WhoQuery,
) -> AppResult<FeatureCollection<UserProperties>> {
    let config = &state.config;
    let filter = user_filter(caller, query, config, Utc::now().date_naive())?;
    let request = ClusterRequest::validated(
        query.zoom,
        query.eps,
        query.minpoints,
        config.users.zoom_threshold,
        config,
    )?;

    let source = PgCandidates::new(&state.pool, filter, config.query_timeout);
    let rows = cluster_or_list(&source, &request).await?;
    debug!("👥 who for {}: {} rows", caller.id, rows.len());

    Ok(feature_collection(rows, |r| {
        UserProperties::from_result(r, &config.public_files_url)
    }))
}

pub async fn who_is_near_list(
    state: &AppState,
    caller: &Caller,
    query: &WhoQuery,
) -> AppResult<FeatureCollection<UserProperties>> {
    let config = &state.config;
    let filter = user_filter(caller, query, config, Utc::now().date_naive())?;
    let page = query_params::page(query.page, query.page_size)?;

    let source = PgCandidates::new(&state.pool, filter, config.query_timeout);
    let (rows, pagination) = list_page(&source, page).await?;

    Ok(feature_collection(rows, |r| {
        UserProperties::from_result(r, &config.public_files_url)
    })
    .with_pagination(pagination))
}
