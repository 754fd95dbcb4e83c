use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::database::candidates::{AdFilter, DistanceFilter};
use crate::error::AppResult;
use crate::geo::{effective_radius, AgeRange};
use crate::models::{AdPointRow, Caller};
use crate::services::assembler::{feature_collection, FeatureCollection, ResultRow};
use crate::services::clustering::{cluster_or_list, list_page, ClusterRequest, PgCandidates};
use crate::services::query_params;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct AdsQuery {
    pub zoom: Option<f64>,
    pub eps: Option<f64>,
    pub minpoints: Option<i64>,
    pub dist: Option<f64>,
    pub point: Option<String>,
    pub in_bbox: Option<String>,
    pub sex: Option<String>,
    #[serde(rename = "type")]
    pub ad_type: Option<String>,
    pub age: Option<String>,
    #[serde(rename = "user__uuid")]
    pub owner: Option<Uuid>,
    #[serde(rename = "user__uuid__ne")]
    pub exclude_owner: Option<Uuid>,
    #[serde(rename = "created_at__lt")]
    pub created_before: Option<i64>,
    #[serde(rename = "created_at__gt")]
    pub created_after: Option<i64>,
    pub is_favorite: Option<String>,
    pub is_archive: Option<String>,
    pub is_actual: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdProperties {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub ad_type: Option<String>,
    pub sex: String,
    pub title: String,
    pub text: String,
    pub address: Option<String>,
    /// `[start, end]`, unix seconds.
    pub period: [Option<i64>; 2],
    pub desired_age: [Option<i32>; 2],
    pub timestamp: Option<i64>,
    pub is_active: bool,
    pub is_blocked: bool,
    pub geom_count: i64,
    pub is_cluster: bool,
}

fn unix(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp())
}

impl From<&ResultRow<AdPointRow>> for AdProperties {
    fn from(result: &ResultRow<AdPointRow>) -> Self {
        let row = &result.row;
        Self {
            uuid: row.uuid,
            ad_type: row.ad_type.clone(),
            sex: row.sex.clone(),
            title: row.title.clone(),
            text: row.text.clone(),
            address: row.address.clone(),
            period: [unix(row.period_start), unix(row.period_end)],
            desired_age: [row.age_from, row.age_to],
            timestamp: unix(row.created_at),
            is_active: row.is_active,
            is_blocked: row.is_blocked,
            geom_count: row.geom_count,
            is_cluster: result.is_cluster,
        }
    }
}

pub fn ad_filter(caller: &Caller, query: &AdsQuery, config: &Config) -> AppResult<AdFilter> {
    let center = query_params::point(query.point.as_deref())?.or(caller.location);
    let distance = query_params::distance(query.dist)?
        .zip(center)
        .map(|(dist, center)| DistanceFilter {
            center,
            radius_m: effective_radius(dist, config.ads.max_radius_m, config.distance_error),
        });

    Ok(AdFilter {
        caller: caller.id,
        distance,
        bbox: query_params::bbox(query.in_bbox.as_deref())?,
        sex: query_params::sex(query.sex.as_deref())?,
        ad_type: query_params::ad_type(query.ad_type.as_deref())?,
        ages: query.age.as_deref().map(AgeRange::parse).unwrap_or_default(),
        owner: query.owner,
        exclude_owner: query.exclude_owner,
        created_before: query_params::unix_time("created_at__lt", query.created_before)?,
        created_after: query_params::unix_time("created_at__gt", query.created_after)?,
        favorite: query_params::toggle(query.is_favorite.as_deref()),
        actual: query_params::toggle(query.is_actual.as_deref()),
        archive: query_params::toggle(query.is_archive.as_deref()) == Some(true),
        exclude_blocked_owners: true,
    })
}

pub async fn ads_map(
    state: &AppState,
    caller: &Caller,
    query: &AdsQuery,
) -> AppResult<FeatureCollection<AdProperties>> {
    let config = &state.config;
    let filter = ad_filter(caller, query, config)?;
    let request = ClusterRequest::validated(
        query.zoom,
        query.eps,
        query.minpoints,
        config.ads.zoom_threshold,
        config,
    )?;

    let source = PgCandidates::new(&state.pool, filter, config.query_timeout);
    let rows = cluster_or_list(&source, &request).await?;
    debug!("🗺️ ads map for {}: {} rows", caller.id, rows.len());

    Ok(feature_collection(rows, |r| AdProperties::from(r)))
}

pub async fn ads_list(
    state: &AppState,
    caller: &Caller,
    query: &AdsQuery,
) -> AppResult<FeatureCollection<AdProperties>> {
    let config = &state.config;
    let filter = ad_filter(caller, query, config)?;
    let page = query_params::page(query.page, query.page_size)?;

    let source = PgCandidates::new(&state.pool, filter, config.query_timeout);
    let (rows, pagination) = list_page(&source, page).await?;

    Ok(feature_collection(rows, |r| AdProperties::from(r)).with_pagination(pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::models::ProximityRow;

    fn caller() -> Caller {
        Caller {
            id: Uuid::new_v4(),
            location: Some(GeoPoint::new(30.3351, 59.9343)),
        }
    }

    #[test]
    fn dist_centres_on_point_or_caller() {
        let config = Config::default();
        let around_caller = AdsQuery {
            dist: Some(10_000.0),
            ..AdsQuery::default()
        };
        let filter = ad_filter(&caller(), &around_caller, &config).unwrap();
        let distance = filter.distance.unwrap();
        assert_eq!(distance.center, GeoPoint::new(30.3351, 59.9343));
        assert!((distance.radius_m - 8_500.0).abs() < 1e-9);

        let around_point = AdsQuery {
            point: Some("37.6,55.7".into()),
            ..around_caller
        };
        let filter = ad_filter(&caller(), &around_point, &config).unwrap();
        assert_eq!(filter.distance.unwrap().center, GeoPoint::new(37.6, 55.7));
    }

    #[test]
    fn no_dist_or_no_center_means_no_distance() {
        let config = Config::default();
        let filter = ad_filter(&caller(), &AdsQuery::default(), &config).unwrap();
        assert!(filter.distance.is_none());

        let nowhere = Caller {
            location: None,
            ..caller()
        };
        let q = AdsQuery {
            dist: Some(1_000.0),
            ..AdsQuery::default()
        };
        assert!(ad_filter(&nowhere, &q, &config).unwrap().distance.is_none());
    }

    #[test]
    fn dist_is_clamped_to_max() {
        let config = Config::default();
        let over = AdsQuery {
            dist: Some(config.ads.max_radius_m * 2.0),
            ..AdsQuery::default()
        };
        let at = AdsQuery {
            dist: Some(config.ads.max_radius_m),
            ..AdsQuery::default()
        };
        let c = caller();
        assert_eq!(
            ad_filter(&c, &over, &config).unwrap(),
            ad_filter(&c, &at, &config).unwrap()
        );
    }

    #[test]
    fn toggles_and_windows() {
        let q = AdsQuery {
            is_favorite: Some("1".into()),
            is_archive: Some("True".into()),
            is_actual: Some("whatever".into()),
            age: Some("18-x".into()),
            created_before: Some(1_700_000_000),
            ..AdsQuery::default()
        };
        let filter = ad_filter(&caller(), &q, &Config::default()).unwrap();
        assert_eq!(filter.favorite, Some(true));
        assert!(filter.archive);
        assert_eq!(filter.actual, None);
        assert_eq!(filter.ages, AgeRange { from: Some(18), to: None });
        assert_eq!(filter.created_before.unwrap().timestamp(), 1_700_000_000);
        assert!(filter.exclude_blocked_owners);
    }

    #[test]
    fn bad_enums_and_geometry_are_rejected() {
        let config = Config::default();
        for q in [
            AdsQuery {
                ad_type: Some("PARTY".into()),
                ..AdsQuery::default()
            },
            AdsQuery {
                in_bbox: Some("1,2".into()),
                ..AdsQuery::default()
            },
            AdsQuery {
                point: Some("x".into()),
                ..AdsQuery::default()
            },
        ] {
            assert!(ad_filter(&caller(), &q, &config).is_err());
        }
    }

    #[test]
    fn properties_render_ranges_as_unix_pairs() {
        let start = DateTime::from_timestamp(1_700_000_000, 0);
        let row = AdPointRow {
            uuid: Uuid::new_v4(),
            ad_type: Some("TRAVEL".into()),
            sex: "F".into(),
            title: "Baikal in July".into(),
            text: "Looking for company".into(),
            address: None,
            age_from: Some(25),
            age_to: Some(35),
            period_start: start,
            period_end: None,
            created_at: start,
            user_uuid: Some(Uuid::new_v4()),
            is_active: true,
            is_blocked: false,
            longitude: 104.3,
            latitude: 52.3,
            geom_count: 1,
        };
        let props = AdProperties::from(&ResultRow::new(row));
        assert_eq!(props.period, [Some(1_700_000_000), None]);
        assert_eq!(props.desired_age, [Some(25), Some(35)]);
        assert_eq!(props.timestamp, Some(1_700_000_000));

        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["type"], "TRAVEL");
        assert_eq!(json["is_cluster"], false);

        let summary = AdPointRow::cluster_summary(0, GeoPoint::new(104.0, 52.0), 6);
        let props = AdProperties::from(&ResultRow::new(summary));
        assert!(props.is_cluster);
        assert_eq!(props.title, "Cluster 0");
        assert_eq!(props.geom_count, 6);
    }
}
