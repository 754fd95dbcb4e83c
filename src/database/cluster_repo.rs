use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::candidates::CandidateFilter;
use crate::geo::{ClusterParams, MIN_CLUSTER_MEMBERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based.
    pub number: i64,
    pub size: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.number.max(1) - 1).saturating_mul(self.size)
    }
}

pub fn count_query<'args, F: CandidateFilter>(filter: &F) -> QueryBuilder<'args, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (");
    filter.push_candidates(&mut qb);
    qb.push(") AS candidates");
    qb
}

pub fn list_query<'args, F: CandidateFilter>(
    filter: &F,
    page: Option<Page>,
) -> QueryBuilder<'args, Postgres> {
    let mut qb = QueryBuilder::new("WITH candidates AS (");
    filter.push_candidates(&mut qb);
    qb.push(format!(
        ") SELECT {}, 1::int8 AS geom_count FROM candidates ORDER BY {}",
        F::ROW_COLUMNS,
        F::ORDER_BY
    ));
    if let Some(page) = page {
        qb.push(" LIMIT ")
            .push_bind(page.size)
            .push(" OFFSET ")
            .push_bind(page.offset());
    }
    qb
}

/// Candidates wrapped in `ST_ClusterDBSCAN`: unclustered rows pass through
/// with `geom_count = 1`, every cluster collapses into one centroid row.
pub fn cluster_query<'args, F: CandidateFilter>(
    filter: &F,
    params: &ClusterParams,
) -> QueryBuilder<'args, Postgres> {
    let mut qb = QueryBuilder::new("WITH candidates AS (");
    filter.push_candidates(&mut qb);
    qb.push(
        "), clusters AS (SELECT ST_ClusterDBSCAN(ST_Transform(location, 4326), eps := ",
    )
    .push_bind(params.eps_degrees())
    .push(", minpoints := ")
    .push_bind(params.min_points.clamp(MIN_CLUSTER_MEMBERS, i32::MAX as i64) as i32)
    .push(") OVER () AS cluster_id, candidates.* FROM candidates)");
    qb.push(format!(
        " SELECT {}, 1::int8 AS geom_count FROM clusters WHERE cluster_id IS NULL",
        F::ROW_COLUMNS
    ));
    qb.push(format!(
        " UNION ALL SELECT {}, COUNT(*) AS geom_count FROM clusters \
         GROUP BY cluster_id HAVING cluster_id >= 0",
        F::SUMMARY_COLUMNS
    ));
    qb
}

pub async fn count_candidates<F: CandidateFilter>(pool: &PgPool, filter: &F) -> sqlx::Result<i64> {
    let mut qb = count_query(filter);
    qb.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn list_candidates<F: CandidateFilter>(
    pool: &PgPool,
    filter: &F,
    page: Option<Page>,
) -> sqlx::Result<Vec<F::Row>> {
    let mut qb = list_query(filter, page);
    qb.build_query_as::<F::Row>().fetch_all(pool).await
}

pub async fn cluster_candidates<F: CandidateFilter>(
    pool: &PgPool,
    filter: &F,
    params: &ClusterParams,
) -> sqlx::Result<Vec<F::Row>> {
    let mut qb = cluster_query(filter, params);
    qb.build_query_as::<F::Row>().fetch_all(pool).await
}
