//! Validation boundary shared by the users and ads endpoints. Everything that
//! leaves here is in range; filters and the engine never re-check.

use chrono::{DateTime, Utc};

use crate::database::cluster_repo::Page;
use crate::error::{AppError, AppResult};
use crate::geo::{BoundingBox, GeoPoint};
use crate::models::{AdType, Sex};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 21.0;
pub const DEFAULT_ZOOM: f64 = 11.0;
pub const MIN_EPS: f64 = 1e-8;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 1_000_000;

pub fn zoom(raw: Option<f64>) -> AppResult<f64> {
    let zoom = raw.unwrap_or(DEFAULT_ZOOM);
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(AppError::invalid(format!(
            "zoom must be between {MIN_ZOOM} and {MAX_ZOOM}"
        )));
    }
    Ok(zoom)
}

pub fn eps(raw: Option<f64>) -> AppResult<Option<f64>> {
    match raw {
        Some(eps) if eps.is_nan() || eps < MIN_EPS => {
            Err(AppError::invalid("eps must be positive"))
        }
        other => Ok(other),
    }
}

pub fn min_points(raw: Option<i64>) -> AppResult<Option<i64>> {
    match raw {
        Some(value) if value < 1 => Err(AppError::invalid("minpoints must be at least 1")),
        other => Ok(other),
    }
}

/// Radius in meters, required to fall inside `min..=max` before clamping.
pub fn radius(raw: Option<f64>, min: f64, max: f64) -> AppResult<f64> {
    let radius = raw.ok_or_else(|| AppError::invalid("radius is required"))?;
    if !(min..=max).contains(&radius) {
        return Err(AppError::invalid(format!(
            "radius must be between {min} and {max}"
        )));
    }
    Ok(radius)
}

/// Optional distance in meters; only non-negative values make sense.
pub fn distance(raw: Option<f64>) -> AppResult<Option<f64>> {
    match raw {
        Some(dist) if dist.is_nan() || dist < 0.0 => {
            Err(AppError::invalid("dist must not be negative"))
        }
        other => Ok(other),
    }
}

/// Tri-state flag: `true`/`True`/`1`, `false`/`False`/`0`, anything else unset.
pub fn toggle(raw: Option<&str>) -> Option<bool> {
    match raw?.trim() {
        "true" | "True" | "1" => Some(true),
        "false" | "False" | "0" => Some(false),
        _ => None,
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub fn sex(raw: Option<&str>) -> AppResult<Option<Sex>> {
    non_empty(raw)
        .map(|s| Sex::parse(s).ok_or_else(|| AppError::invalid("sex must be one of M, F, N")))
        .transpose()
}

pub fn ad_type(raw: Option<&str>) -> AppResult<Option<AdType>> {
    non_empty(raw)
        .map(|s| {
            AdType::parse(s)
                .ok_or_else(|| AppError::invalid("type must be one of DATING, MEETING, TRAVEL"))
        })
        .transpose()
}

pub fn bbox(raw: Option<&str>) -> AppResult<Option<BoundingBox>> {
    non_empty(raw)
        .map(|s| {
            BoundingBox::parse(s)
                .ok_or_else(|| AppError::invalid("in_bbox must be minLon,minLat,maxLon,maxLat"))
        })
        .transpose()
}

pub fn point(raw: Option<&str>) -> AppResult<Option<GeoPoint>> {
    non_empty(raw)
        .map(|s| GeoPoint::parse(s).ok_or_else(|| AppError::invalid("point must be lon,lat")))
        .transpose()
}

pub fn unix_time(name: &str, raw: Option<i64>) -> AppResult<Option<DateTime<Utc>>> {
    raw.map(|secs| {
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| AppError::invalid(format!("{name} is out of range")))
    })
    .transpose()
}

pub fn page(number: Option<i64>, size: Option<i64>) -> AppResult<Page> {
    let number = number.unwrap_or(1);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE).contains(&number) {
        return Err(AppError::invalid(format!(
            "page must be between 1 and {MAX_PAGE}"
        )));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&size) {
        return Err(AppError::invalid(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(Page { number, size })
}
