use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ProximityRow, CLUSTER_LABEL_PREFIX};
use crate::geo::GeoPoint;

// Map row for ads. Range columns arrive split into their bounds.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AdPointRow {
    pub uuid: Uuid,
    pub ad_type: Option<String>,
    pub sex: String,
    pub title: String,
    pub text: String,
    pub address: Option<String>,
    pub age_from: Option<i32>,
    pub age_to: Option<i32>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub user_uuid: Option<Uuid>,
    pub is_active: bool,
    pub is_blocked: bool,
    pub longitude: f64,
    pub latitude: f64,
    pub geom_count: i64,
}

impl ProximityRow for AdPointRow {
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
            ad_type: None,
            sex: "N".to_string(),
            title: format!("{}{}", CLUSTER_LABEL_PREFIX, cluster_id),
            text: String::new(),
            address: None,
            age_from: None,
            age_to: None,
            period_start: None,
            period_end: None,
            created_at: None,
            user_uuid: None,
            is_active: true,
            is_blocked: false,
            longitude: centroid.longitude,
            latitude: centroid.latitude,
            geom_count: count,
        }
    }
}
