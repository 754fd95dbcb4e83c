use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CallerRow {
    pub uuid: Uuid,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

impl CallerRow {
    pub fn location(&self) -> Option<GeoPoint> {
        self.longitude
            .zip(self.latitude)
            .map(|(lon, lat)| GeoPoint::new(lon, lat))
    }
}

/// The authenticated user a request runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Caller {
    pub id: Uuid,
    pub location: Option<GeoPoint>,
}

impl From<CallerRow> for Caller {
    fn from(row: CallerRow) -> Self {
        Self {
            id: row.uuid,
            location: row.location(),
        }
    }
}
