pub mod ad_point;
pub mod caller;
pub mod user_point;

pub use ad_point::AdPointRow;
pub use caller::{Caller, CallerRow};
pub use user_point::UserPointRow;

use uuid::Uuid;

use crate::geo::GeoPoint;

/// Label prefix of synthesized cluster rows.
pub const CLUSTER_LABEL_PREFIX: &str = "Cluster ";

/// A positioned row that can also stand in for a whole cluster.
///
/// Cluster summaries carry the nil UUID; that sentinel is how a row is told
/// apart from a real entity.
pub trait ProximityRow: Sized {
    fn uuid(&self) -> Uuid;
    fn position(&self) -> GeoPoint;
    fn geom_count(&self) -> i64;
    fn cluster_summary(cluster_id: usize, centroid: GeoPoint, count: i64) -> Self;

    fn is_cluster(&self) -> bool {
        self.uuid().is_nil()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    None,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::None => "N",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "M" => Some(Sex::Male),
            "F" => Some(Sex::Female),
            "N" => Some(Sex::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdType {
    Dating,
    Meeting,
    Travel,
}

impl AdType {
    pub fn as_str(self) -> &'static str {
        match self {
            AdType::Dating => "DATING",
            AdType::Meeting => "MEETING",
            AdType::Travel => "TRAVEL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "DATING" => Some(AdType::Dating),
            "MEETING" => Some(AdType::Meeting),
            "TRAVEL" => Some(AdType::Travel),
            _ => None,
        }
    }
}
