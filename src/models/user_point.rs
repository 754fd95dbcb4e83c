use uuid::Uuid;

use super::{ProximityRow, CLUSTER_LABEL_PREFIX};
use crate::geo::GeoPoint;

// Map row for "who is near": one user, or a cluster summary standing in for several.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserPointRow {
    pub uuid: Uuid,
    pub display_name: String,
    pub avatar_uuid: Option<Uuid>,
    pub longitude: f64,
    pub latitude: f64,
    pub geom_count: i64,
}

impl ProximityRow for UserPointRow {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn position(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }

    fn geom_count(&self) -> i64 {
        self.geom_count
    }

    fn cluster_summary(cluster_id: usize, centroid: GeoPoint, count: i64) -> Self {
        Self {
            uuid: Uuid::nil(),
            display_name: format!("{}{}", CLUSTER_LABEL_PREFIX, cluster_id),
            avatar_uuid: None,
            longitude: centroid.longitude,
            latitude: centroid.latitude,
            geom_count: count,
        }
    }
}
