use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgRow, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::geo::{AgeRange, BoundingBox, GeoPoint};
use crate::models::{AdPointRow, AdType, ProximityRow, Sex, UserPointRow};

/// Entity-specific predicate set that narrows rows down to the candidates.
///
/// Implementations write one `SELECT ... FROM ... WHERE ...` whose output
/// carries the position as `location` (SRID 4326) and every column the row
/// projections below read. All filter values go through bind parameters.
pub trait CandidateFilter: Send + Sync {
    type Row: ProximityRow + for<'r> FromRow<'r, PgRow> + Send + Unpin;

    /// Projection of one individual row, minus `geom_count`.
    const ROW_COLUMNS: &'static str;
    /// Projection of one summary per `cluster_id` group, minus `geom_count`.
    const SUMMARY_COLUMNS: &'static str;
    const ORDER_BY: &'static str;

    fn push_candidates<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceFilter {
    pub center: GeoPoint,
    /// Already capped and error-corrected.
    pub radius_m: f64,
}

fn push_distance(qb: &mut QueryBuilder<'_, Postgres>, column: &str, distance: &DistanceFilter) {
    qb.push(format!(" AND ST_DWithin({column}::geography, ST_SetSRID(ST_MakePoint("))
        .push_bind(distance.center.longitude)
        .push(", ")
        .push_bind(distance.center.latitude)
        .push("), 4326)::geography, ")
        .push_bind(distance.radius_m)
        .push(")");
}

fn push_bbox(qb: &mut QueryBuilder<'_, Postgres>, column: &str, bbox: &BoundingBox) {
    qb.push(format!(" AND {column} && ST_MakeEnvelope("))
        .push_bind(bbox.min_lon)
        .push(", ")
        .push_bind(bbox.min_lat)
        .push(", ")
        .push_bind(bbox.max_lon)
        .push(", ")
        .push_bind(bbox.max_lat)
        .push(", 4326)");
}

pub const SQL_USER_CANDIDATES_BASE: &str = r#"
SELECT u.uuid, u.display_name, u.avatar_uuid, u.location
FROM users u
WHERE u.is_active
  AND u.deleted_at IS NULL
  AND u.location IS NOT NULL
"#;

/// Who-is-near predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserFilter {
    pub caller: Uuid,
    pub distance: Option<DistanceFilter>,
    pub bbox: Option<BoundingBox>,
    pub sex: Option<Sex>,
    /// Oldest admissible birth date.
    pub born_after: Option<NaiveDate>,
    /// Youngest admissible birth date.
    pub born_before: Option<NaiveDate>,
    pub only_online: bool,
    pub exclude_blocked: bool,
    pub is_contact: Option<bool>,
    pub is_favorite: Option<bool>,
}

impl CandidateFilter for UserFilter {
    type Row = UserPointRow;

    const ROW_COLUMNS: &'static str = "uuid, display_name, avatar_uuid, \
        ST_X(location) AS longitude, ST_Y(location) AS latitude";
    const SUMMARY_COLUMNS: &'static str = "'00000000-0000-0000-0000-000000000000'::uuid AS uuid, \
        CONCAT('Cluster ', cluster_id) AS display_name, NULL::uuid AS avatar_uuid, \
        ST_X(ST_Centroid(ST_Collect(location))) AS longitude, \
        ST_Y(ST_Centroid(ST_Collect(location))) AS latitude";
    const ORDER_BY: &'static str = "display_name, uuid";

    fn push_candidates<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        qb.push(SQL_USER_CANDIDATES_BASE);

        qb.push(" AND u.uuid <> ").push_bind(self.caller);

        if self.only_online {
            qb.push(" AND u.is_online AND u.show_activity");
        }
        if self.exclude_blocked {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM user_black_list b \
                 WHERE b.holder_uuid = ",
            )
            .push_bind(self.caller)
            .push(" AND b.blocked_uuid = u.uuid)");
        }
        if let Some(distance) = &self.distance {
            push_distance(qb, "u.location", distance);
        }
        if let Some(bbox) = &self.bbox {
            push_bbox(qb, "u.location", bbox);
        }
        if let Some(sex) = self.sex {
            qb.push(" AND u.sex = ").push_bind(sex.as_str().to_string());
        }
        if let Some(date) = self.born_after {
            qb.push(" AND u.birth_date >= ").push_bind(date);
        }
        if let Some(date) = self.born_before {
            qb.push(" AND u.birth_date <= ").push_bind(date);
        }
        if let Some(is_contact) = self.is_contact {
            push_contact_exists(qb, self.caller, is_contact, false);
        }
        if let Some(is_favorite) = self.is_favorite {
            push_contact_exists(qb, self.caller, is_favorite, true);
        }
    }
}

fn push_contact_exists(
    qb: &mut QueryBuilder<'_, Postgres>,
    caller: Uuid,
    wanted: bool,
    favorite_only: bool,
) {
    qb.push(if wanted { " AND EXISTS" } else { " AND NOT EXISTS" })
        .push(" (SELECT 1 FROM contacts c WHERE c.holder_uuid = ")
        .push_bind(caller)
        .push(" AND c.user_uuid = u.uuid");
    if favorite_only {
        qb.push(" AND c.is_favorite");
    }
    qb.push(")");
}

pub const SQL_AD_CANDIDATES_BASE: &str = r#"
SELECT
    a.uuid,
    a.type AS ad_type,
    a.sex,
    a.title,
    a.text,
    a.address,
    lower(a.ages) AS age_from,
    upper(a.ages) AS age_to,
    lower(a.period) AS period_start,
    upper(a.period) AS period_end,
    a.created_at,
    a.user_uuid,
    a.is_active,
    a.is_blocked,
    a.point AS location
FROM ads a
WHERE a.deleted_at IS NULL
  AND NOT a.is_blocked
  AND a.point IS NOT NULL
"#;

/// Ads map predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdFilter {
    pub caller: Uuid,
    pub distance: Option<DistanceFilter>,
    pub bbox: Option<BoundingBox>,
    pub sex: Option<Sex>,
    pub ad_type: Option<AdType>,
    pub ages: AgeRange,
    pub owner: Option<Uuid>,
    pub exclude_owner: Option<Uuid>,
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub favorite: Option<bool>,
    /// `Some(true)`: period not yet over; `Some(false)`: period over.
    pub actual: Option<bool>,
    pub archive: bool,
    pub exclude_blocked_owners: bool,
}

const SQL_AD_ACTUAL: &str = " AND (upper_inf(a.period) OR upper(a.period) >= now())";
const SQL_AD_ARCHIVE: &str = " AND upper(a.period) < now()";

impl CandidateFilter for AdFilter {
    type Row = AdPointRow;

    const ROW_COLUMNS: &'static str = "uuid, ad_type, sex, title, text, address, \
        age_from, age_to, period_start, period_end, created_at, user_uuid, \
        is_active, is_blocked, ST_X(location) AS longitude, ST_Y(location) AS latitude";
    const SUMMARY_COLUMNS: &'static str = "'00000000-0000-0000-0000-000000000000'::uuid AS uuid, \
        NULL::text AS ad_type, 'N'::text AS sex, CONCAT('Cluster ', cluster_id) AS title, \
        ''::text AS text, NULL::text AS address, NULL::int4 AS age_from, NULL::int4 AS age_to, \
        NULL::timestamptz AS period_start, NULL::timestamptz AS period_end, \
        NULL::timestamptz AS created_at, NULL::uuid AS user_uuid, \
        TRUE AS is_active, FALSE AS is_blocked, \
        ST_X(ST_Centroid(ST_Collect(location))) AS longitude, \
        ST_Y(ST_Centroid(ST_Collect(location))) AS latitude";
    const ORDER_BY: &'static str = "created_at DESC, uuid";

    fn push_candidates<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        qb.push(SQL_AD_CANDIDATES_BASE);

        if self.exclude_blocked_owners {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM user_black_list b \
                 WHERE b.holder_uuid = ",
            )
            .push_bind(self.caller)
            .push(" AND b.blocked_uuid = a.user_uuid)");
        }
        if let Some(distance) = &self.distance {
            push_distance(qb, "a.point", distance);
        }
        if let Some(bbox) = &self.bbox {
            push_bbox(qb, "a.point", bbox);
        }
        if let Some(sex) = self.sex {
            qb.push(" AND a.sex = ").push_bind(sex.as_str().to_string());
        }
        if let Some(ad_type) = self.ad_type {
            qb.push(" AND a.type = ").push_bind(ad_type.as_str().to_string());
        }
        if !self.ages.is_open() {
            qb.push(" AND a.ages @> int4range(")
                .push_bind(self.ages.from)
                .push(", ")
                .push_bind(self.ages.to)
                .push(")");
        }
        if let Some(owner) = self.owner {
            qb.push(" AND a.user_uuid = ").push_bind(owner);
        }
        if let Some(owner) = self.exclude_owner {
            qb.push(" AND a.user_uuid <> ").push_bind(owner);
        }
        if let Some(before) = self.created_before {
            qb.push(" AND a.created_at < ").push_bind(before);
        }
        if let Some(after) = self.created_after {
            qb.push(" AND a.created_at > ").push_bind(after);
        }
        match self.favorite {
            Some(true) => {
                qb.push(" AND a.favorited_for @> ARRAY[")
                    .push_bind(self.caller)
                    .push("]::uuid[]");
            }
            Some(false) => {
                qb.push(" AND NOT (a.favorited_for @> ARRAY[")
                    .push_bind(self.caller)
                    .push("]::uuid[])");
            }
            None => {}
        }
        match self.actual {
            Some(true) => {
                qb.push(SQL_AD_ACTUAL);
            }
            Some(false) => {
                qb.push(SQL_AD_ARCHIVE);
            }
            None => {}
        }
        if self.archive && self.actual != Some(false) {
            qb.push(SQL_AD_ARCHIVE);
        }
    }
}
