use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::geo::{centroid, GeoPoint};
use crate::models::ProximityRow;

/// One output row: a real entity or a cluster summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow<R> {
    pub row: R,
    pub is_cluster: bool,
}

impl<R: ProximityRow> ResultRow<R> {
    pub fn new(row: R) -> Self {
        let is_cluster = row.is_cluster();
        Self { row, is_cluster }
    }

    pub fn geom_count(&self) -> i64 {
        self.row.geom_count()
    }
}

/// Rows straight from the store: raw candidates or the clustering union.
pub fn from_store<R: ProximityRow>(rows: Vec<R>) -> Vec<ResultRow<R>> {
    rows.into_iter().map(ResultRow::new).collect()
}

/// Candidates plus per-candidate DBSCAN labels: noise rows are kept as is,
/// each labelled group becomes one summary at the members' centroid.
pub fn from_labels<R: ProximityRow>(rows: Vec<R>, labels: &[Option<usize>]) -> Vec<ResultRow<R>> {
    let mut individuals = Vec::new();
    let mut groups: BTreeMap<usize, Vec<GeoPoint>> = BTreeMap::new();

    for (row, label) in rows.into_iter().zip(labels.iter().copied()) {
        match label {
            Some(cluster) => groups.entry(cluster).or_default().push(row.position()),
            None => individuals.push(ResultRow::new(row)),
        }
    }

    let summaries = groups.into_iter().filter_map(|(cluster, members)| {
        let center = centroid(&members)?;
        Some(ResultRow::new(R::cluster_summary(
            cluster,
            center,
            members.len() as i64,
        )))
    });

    individuals.into_iter().chain(summaries).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

impl From<GeoPoint> for PointGeometry {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point",
            coordinates: [point.longitude, point.latitude],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature<P> {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: P,
}

/// Page links of a paginated collection, as page numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
}

impl Pagination {
    pub fn new(count: i64, page: i64, page_size: i64) -> Self {
        let last = if count == 0 {
            1
        } else {
            (count + page_size - 1) / page_size
        };
        Self {
            count,
            next: (page < last).then(|| page + 1),
            previous: (page > 1).then(|| page - 1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection<P> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub pagination: Option<Pagination>,
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Renders rows as GeoJSON features; `properties` builds the entity fields.
pub fn feature_collection<R, P, F>(rows: Vec<ResultRow<R>>, properties: F) -> FeatureCollection<P>
where
    R: ProximityRow,
    F: Fn(&ResultRow<R>) -> P,
{
    let features = rows
        .iter()
        .map(|result| Feature {
            id: result.row.uuid(),
            kind: "Feature",
            geometry: result.row.position().into(),
            properties: properties(result),
        })
        .collect();

    FeatureCollection {
        kind: "FeatureCollection",
        pagination: None,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPointRow;

    fn user(name: &str, lon: f64, lat: f64) -> UserPointRow {
        UserPointRow {
            uuid: Uuid::new_v4(),
            display_name: name.to_string(),
            avatar_uuid: None,
            longitude: lon,
            latitude: lat,
            geom_count: 1,
        }
    }

    #[test]
    fn store_rows_are_tagged_by_sentinel() {
        let rows = vec![
            user("anna", 37.0, 55.0),
            UserPointRow::cluster_summary(4, GeoPoint::new(37.1, 55.1), 7),
        ];
        let result = from_store(rows);
        assert!(!result[0].is_cluster);
        assert!(result[1].is_cluster);
        assert_eq!(result[1].geom_count(), 7);
        assert_eq!(result[1].row.display_name, "Cluster 4");
    }

    #[test]
    fn user_named_like_a_cluster_is_still_individual() {
        let result = from_store(vec![user("Cluster 1", 37.0, 55.0)]);
        assert!(!result[0].is_cluster);
    }

    #[test]
    fn labels_collapse_into_centroid_summaries() {
        let rows = vec![
            user("a", 0.0, 0.0),
            user("b", 2.0, 0.0),
            user("c", 50.0, 50.0),
            user("d", 2.0, 2.0),
            user("e", 0.0, 2.0),
        ];
        let labels = [Some(0), Some(0), None, Some(0), Some(0)];
        let result = from_labels(rows, &labels);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].row.display_name, "c");
        assert!(!result[0].is_cluster);
        assert!(result[1].is_cluster);
        assert_eq!(result[1].geom_count(), 4);
        assert_eq!(result[1].row.position(), GeoPoint::new(1.0, 1.0));

        let total: i64 = result.iter().map(|r| r.geom_count()).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn pagination_links() {
        assert_eq!(
            Pagination::new(45, 1, 20),
            Pagination {
                count: 45,
                next: Some(2),
                previous: None
            }
        );
        assert_eq!(Pagination::new(45, 3, 20).next, None);
        assert_eq!(Pagination::new(45, 3, 20).previous, Some(2));
        assert_eq!(Pagination::new(0, 1, 20).next, None);

        let far = Pagination::new(45, i64::MAX, 20);
        assert_eq!(far.next, None);
        assert_eq!(far.previous, Some(i64::MAX - 1));
    }

    #[test]
    fn serializes_geojson() {
        let rows = from_store(vec![user("anna", 37.5, 55.5)]);
        let collection = feature_collection(rows, |r| r.row.display_name.clone());
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert!(json.get("count").is_none());
        assert_eq!(json["features"][0]["type"], "Feature");
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 37.5);
        assert_eq!(json["features"][0]["properties"], "anna");

        let paged = feature_collection(Vec::<ResultRow<UserPointRow>>::new(), |_| 0)
            .with_pagination(Pagination::new(0, 1, 20));
        let json = serde_json::to_value(&paged).unwrap();
        assert_eq!(json["count"], 0);
        assert!(json["next"].is_null());
    }
}
