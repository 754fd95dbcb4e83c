use async_trait::async_trait;
use uuid::Uuid;

use nearby::config::{ClusterBackend, Config};
use nearby::database::cluster_repo::Page;
use nearby::error::AppResult;
use nearby::geo::{centroid, ClusterParams, GeoPoint};
use nearby::models::{ProximityRow, UserPointRow};
use nearby::services::assembler::{self, feature_collection};
use nearby::services::clustering::{cluster_or_list, CandidateSource, ClusterRequest};
use nearby::services::dbscan::dbscan;

/// Users already narrowed down to the candidate set; `clustered` answers the
/// way the store's union query does.
struct NearbyUsers(Vec<UserPointRow>);

impl NearbyUsers {
    fn at(points: &[GeoPoint]) -> Self {
        Self(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| UserPointRow {
                    uuid: Uuid::new_v4(),
                    display_name: format!("neighbour {i}"),
                    avatar_uuid: Some(Uuid::new_v4()),
                    longitude: p.longitude,
                    latitude: p.latitude,
                    geom_count: 1,
                })
                .collect(),
        )
    }
}

#[async_trait]
impl CandidateSource for NearbyUsers {
    type Row = UserPointRow;

    async fn count(&self) -> AppResult<i64> {
        Ok(self.0.len() as i64)
    }

    async fn candidates(&self, _page: Option<Page>) -> AppResult<Vec<UserPointRow>> {
        Ok(self.0.clone())
    }

    async fn clustered(&self, params: &ClusterParams) -> AppResult<Vec<UserPointRow>> {
        let points: Vec<_> = self.0.iter().map(|r| r.position()).collect();
        let labels = dbscan(&points, params.eps_m, params.min_points as usize);
        Ok(assembler::from_labels(self.0.clone(), &labels)
            .into_iter()
            .map(|r| r.row)
            .collect())
    }
}

fn caller_location() -> GeoPoint {
    GeoPoint::new(37.6173, 55.7558)
}

fn request(zoom: f64, backend: ClusterBackend) -> ClusterRequest {
    let config = Config {
        cluster_backend: backend,
        ..Config::default()
    };
    ClusterRequest::validated(Some(zoom), None, None, config.users.zoom_threshold, &config)
        .expect("valid map request")
}

#[tokio::test]
async fn two_close_users_stay_individual() {
    let caller = caller_location();
    let source = NearbyUsers::at(&[caller.offset_m(40.0, 30.0), caller.offset_m(-60.0, 10.0)]);

    for backend in [ClusterBackend::Postgis, ClusterBackend::Local] {
        let rows = cluster_or_list(&source, &request(15.0, backend))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(!row.is_cluster);
            assert_eq!(row.geom_count(), 1);
            assert!(caller.distance_m(&row.row.position()) <= 100.0);
        }
    }
}

#[tokio::test]
async fn ten_tight_users_collapse_into_one_cluster() {
    let group_origin = caller_location().offset_m(2_000.0, -1_500.0);
    let points: Vec<GeoPoint> = (0..10)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / 10.0;
            group_origin.offset_m(20.0 * angle.sin(), 20.0 * angle.cos())
        })
        .collect();
    let actual_centroid = centroid(&points).unwrap();
    let source = NearbyUsers::at(&points);

    for backend in [ClusterBackend::Postgis, ClusterBackend::Local] {
        let rows = cluster_or_list(&source, &request(12.0, backend))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "{backend:?}");
        let cluster = &rows[0];
        assert!(cluster.is_cluster);
        assert!(cluster.row.uuid.is_nil());
        assert_eq!(cluster.geom_count(), 10);
        assert!(actual_centroid.distance_m(&cluster.row.position()) <= 50.0);

        let collection = feature_collection(rows, |r| (r.geom_count(), r.is_cluster));
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["features"][0]["properties"][0], 10);
        assert_eq!(json["features"][0]["properties"][1], true);
    }
}

#[tokio::test]
async fn the_same_group_is_raw_when_zoomed_in() {
    let points: Vec<GeoPoint> = (0..10)
        .map(|i| caller_location().offset_m(i as f64 * 3.0, 0.0))
        .collect();
    let source = NearbyUsers::at(&points);

    let rows = cluster_or_list(&source, &request(20.0, ClusterBackend::Postgis))
        .await
        .unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| !r.is_cluster && r.geom_count() == 1));
}
