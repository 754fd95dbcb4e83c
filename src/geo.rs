//! Plain geometry helpers shared by the candidate filters and the
//! clustering engine. Nothing in here touches the store.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// Latitude the ground resolution is evaluated at (central Russia).
pub const REFERENCE_LATITUDE: f64 = 54.65;
/// Web-Mercator ground resolution at zoom 0 on the equator, meters per pixel.
pub const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;
/// Length of one degree of latitude, meters.
pub const METERS_PER_DEGREE: f64 = 111_319.49;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Longitude/latitude pair in SRID 4326.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Parses `"lon,lat"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',').map(|s| s.trim().parse::<f64>());
        let longitude = parts.next()?.ok()?;
        let latitude = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return None;
        }
        Some(Self::new(longitude, latitude))
    }

    /// Great-circle distance in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let to_rad = |deg: f64| deg.to_radians();
        let dlat = to_rad(other.latitude - self.latitude);
        let dlon = to_rad(other.longitude - self.longitude);
        let a = (dlat / 2.0).sin().powi(2)
            + to_rad(self.latitude).cos()
                * to_rad(other.latitude).cos()
                * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_M * c
    }

    /// Point `meters` north and `meters` east of this one (flat-earth offset).
    pub fn offset_m(&self, north_m: f64, east_m: f64) -> GeoPoint {
        let lat_change = north_m / METERS_PER_DEGREE;
        let lon_change = east_m / (METERS_PER_DEGREE * self.latitude.to_radians().cos().abs());
        GeoPoint::new(self.longitude + lon_change, self.latitude + lat_change)
    }
}

/// Ground distance covered by one screen pixel at `zoom`.
///
/// Zoom is validated upstream (1..=21); zero or negative zoom just yields a
/// large value.
pub fn meters_per_pixel(zoom: f64) -> f64 {
    EQUATOR_METERS_PER_PIXEL * REFERENCE_LATITUDE.to_radians().cos() / 2f64.powf(zoom)
}

/// Smallest group that may be reported as a cluster.
pub const MIN_CLUSTER_MEMBERS: i64 = 2;

/// DBSCAN `minpoints` for a candidate set of `candidate_count` rows.
///
/// A requested value wins but never exceeds the candidate count, and never
/// drops below [`MIN_CLUSTER_MEMBERS`]. Without one the default is 2 for
/// more than three candidates, else the count itself.
pub fn best_min_points(candidate_count: i64, requested: Option<i64>) -> i64 {
    match requested.filter(|v| *v > 0) {
        Some(value) => value.min(candidate_count).max(MIN_CLUSTER_MEMBERS),
        None if candidate_count > 3 => 2,
        None => candidate_count,
    }
}

/// Meters expressed as degrees of arc, for SRID 4326 distance arguments.
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Caller radius after the configured cap.
pub fn clamp_radius(requested_m: f64, max_m: f64) -> f64 {
    requested_m.min(max_m)
}

/// Radius actually compared against distances: capped, then shrunk by the
/// configured error factor.
pub fn effective_radius(requested_m: f64, max_m: f64, distance_error: f64) -> f64 {
    clamp_radius(requested_m, max_m) * (1.0 - distance_error)
}

/// Neighbourhood radius and minimum cluster size handed to DBSCAN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub eps_m: f64,
    pub min_points: i64,
}

impl ClusterParams {
    /// `eps` defaults to `eps_pixels` screen pixels at `zoom`.
    pub fn derive(
        zoom: f64,
        candidate_count: i64,
        eps_override: Option<f64>,
        min_points_override: Option<i64>,
        eps_pixels: f64,
    ) -> Self {
        let eps_m = eps_override
            .filter(|eps| *eps > 0.0)
            .unwrap_or_else(|| meters_per_pixel(zoom) * eps_pixels);
        Self {
            eps_m,
            min_points: best_min_points(candidate_count, min_points_override),
        }
    }

    pub fn eps_degrees(&self) -> f64 {
        meters_to_degrees(self.eps_m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Parses `"minLon,minLat,maxLon,maxLat"`.
    pub fn parse(raw: &str) -> Option<Self> {
        let values = raw
            .split(',')
            .map(|s| s.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let [min_lon, min_lat, max_lon, max_lat] = values[..] else {
            return None;
        };
        if min_lon > max_lon || min_lat > max_lat {
            return None;
        }
        Some(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Box enclosing a circle of `radius_m` around `center`.
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let lat_change = radius_m / METERS_PER_DEGREE;
        let lon_change = lat_change / center.latitude.to_radians().cos().abs();
        Self {
            min_lon: center.longitude - lon_change,
            min_lat: center.latitude - lat_change,
            max_lon: center.longitude + lon_change,
            max_lat: center.latitude + lat_change,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.longitude)
            && (self.min_lat..=self.max_lat).contains(&point.latitude)
    }
}

/// Arithmetic mean of the positions, same as `ST_Centroid` over a multipoint.
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lon, lat) = points
        .iter()
        .fold((0.0, 0.0), |(lon, lat), p| (lon + p.longitude, lat + p.latitude));
    Some(GeoPoint::new(lon / n, lat / n))
}

/// `"20-30"` style age window. Bounds that do not parse are left open and
/// reversed bounds are swapped, so `from <= to` whenever both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgeRange {
    pub from: Option<i32>,
    pub to: Option<i32>,
}

impl AgeRange {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('-').map(|s| s.trim().parse::<i32>().ok());
        let from = parts.next().flatten().filter(|v| *v >= 0);
        let to = parts.next().flatten().filter(|v| *v >= 0);
        match (from, to) {
            (Some(from), Some(to)) if from > to => Self {
                from: Some(to),
                to: Some(from),
            },
            _ => Self { from, to },
        }
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Birth-date window `(earliest, latest)` matching this age range today.
    pub fn birth_dates(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.to.map(|age| years_before(today, age)),
            self.from.map(|age| years_before(today, age)),
        )
    }
}

fn years_before(today: NaiveDate, years: i32) -> NaiveDate {
    today
        .with_year(today.year() - years)
        .or_else(|| {
            // 29 Feb
            let yesterday = today - Duration::days(1);
            yesterday.with_year(yesterday.year() - years)
        })
        .unwrap_or(NaiveDate::MIN)
}
