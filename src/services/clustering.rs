use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::config::{ClusterBackend, Config};
use crate::database::candidates::CandidateFilter;
use crate::database::cluster_repo::{self, Page};
use crate::error::{AppError, AppResult};
use crate::geo::{ClusterParams, GeoPoint};
use crate::models::ProximityRow;
use crate::services::assembler::{self, Pagination, ResultRow};
use crate::services::dbscan::dbscan;
use crate::services::query_params;

/// Below this many candidates a map never clusters.
pub const MIN_CLUSTER_CANDIDATES: i64 = 3;

/// Where the candidate set of one request comes from.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    type Row: ProximityRow + Send;

    async fn count(&self) -> AppResult<i64>;

    async fn candidates(&self, page: Option<Page>) -> AppResult<Vec<Self::Row>>;

    /// Clustering done by the store itself, rows already in union shape.
    async fn clustered(&self, params: &ClusterParams) -> AppResult<Vec<Self::Row>>;
}

/// Candidates behind a [`CandidateFilter`] in PostgreSQL.
pub struct PgCandidates<'a, F> {
    pool: &'a PgPool,
    filter: F,
    timeout: Duration,
}

impl<'a, F: CandidateFilter> PgCandidates<'a, F> {
    pub fn new(pool: &'a PgPool, filter: F, timeout: Duration) -> Self {
        Self {
            pool,
            filter,
            timeout,
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = sqlx::Result<T>>) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("⏱️ Candidate query exceeded {:?}", self.timeout);
                Err(AppError::Timeout)
            }
        }
    }
}

#[async_trait]
impl<'a, F: CandidateFilter> CandidateSource for PgCandidates<'a, F> {
    type Row = F::Row;

    async fn count(&self) -> AppResult<i64> {
        self.bounded(cluster_repo::count_candidates(self.pool, &self.filter))
            .await
    }

    async fn candidates(&self, page: Option<Page>) -> AppResult<Vec<F::Row>> {
        self.bounded(cluster_repo::list_candidates(self.pool, &self.filter, page))
            .await
    }

    async fn clustered(&self, params: &ClusterParams) -> AppResult<Vec<F::Row>> {
        self.bounded(cluster_repo::cluster_candidates(self.pool, &self.filter, params))
            .await
    }
}

/// Map request knobs, already validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterRequest {
    pub zoom: f64,
    pub zoom_threshold: f64,
    pub eps_m: Option<f64>,
    pub min_points: Option<i64>,
    pub eps_pixels: f64,
    pub backend: ClusterBackend,
    /// Budget for in-process clustering; the store enforces its own.
    pub timeout: Duration,
}

impl ClusterRequest {
    /// Validates the caller's map knobs against one entity variant's threshold.
    pub fn validated(
        zoom: Option<f64>,
        eps_m: Option<f64>,
        min_points: Option<i64>,
        zoom_threshold: f64,
        config: &Config,
    ) -> AppResult<Self> {
        Ok(Self {
            zoom: query_params::zoom(zoom)?,
            zoom_threshold,
            eps_m: query_params::eps(eps_m)?,
            min_points: query_params::min_points(min_points)?,
            eps_pixels: config.cluster_eps_pixels,
            backend: config.cluster_backend,
            timeout: config.query_timeout,
        })
    }

    /// Whether a candidate set of `count` rows stays unclustered.
    pub fn keeps_raw(&self, count: i64) -> bool {
        self.zoom >= self.zoom_threshold || count < MIN_CLUSTER_CANDIDATES
    }
}

/// Returns the candidate set as plain rows when zoomed in far enough or too
/// sparse, otherwise as noise rows plus one summary per DBSCAN cluster.
pub async fn cluster_or_list<S: CandidateSource>(
    source: &S,
    request: &ClusterRequest,
) -> AppResult<Vec<ResultRow<S::Row>>> {
    let count = source.count().await?;
    if count == 0 {
        return Ok(Vec::new());
    }

    if request.keeps_raw(count) {
        debug!(
            "📍 Raw points: count={}, zoom={}, threshold={}",
            count, request.zoom, request.zoom_threshold
        );
        let rows = source.candidates(None).await?;
        return Ok(assembler::from_store(rows));
    }

    let params = ClusterParams::derive(
        request.zoom,
        count,
        request.eps_m,
        request.min_points,
        request.eps_pixels,
    );
    debug!(
        "📍 Clustering: count={}, zoom={}, eps_m={:.1}, min_points={}, backend={:?}",
        count, request.zoom, params.eps_m, params.min_points, request.backend
    );

    match request.backend {
        ClusterBackend::Postgis => {
            let rows = source.clustered(&params).await?;
            Ok(assembler::from_store(rows))
        }
        ClusterBackend::Local => {
            let rows = source.candidates(None).await?;
            let points: Vec<_> = rows.iter().map(|r| r.position()).collect();
            let labels = local_dbscan(points, &params, request.timeout).await?;
            Ok(assembler::from_labels(rows, &labels))
        }
    }
}

/// Runs DBSCAN off the async workers. On timeout the task is detached and
/// finishes in the background; its result is dropped.
async fn local_dbscan(
    points: Vec<GeoPoint>,
    params: &ClusterParams,
    timeout: Duration,
) -> AppResult<Vec<Option<usize>>> {
    let (eps_m, min_points) = (params.eps_m, params.min_points as usize);
    let task = tokio::task::spawn_blocking(move || dbscan(&points, eps_m, min_points));
    match tokio::time::timeout(timeout, task).await {
        Ok(labels) => Ok(labels?),
        Err(_) => {
            warn!("⏱️ Local clustering exceeded {:?}", timeout);
            Err(AppError::Timeout)
        }
    }
}

/// One page of the candidate set, never clustered.
pub async fn list_page<S: CandidateSource>(
    source: &S,
    page: Page,
) -> AppResult<(Vec<ResultRow<S::Row>>, Pagination)> {
    let count = source.count().await?;
    let rows = if page.offset() < count {
        source.candidates(Some(page)).await?
    } else {
        Vec::new()
    };
    Ok((
        assembler::from_store(rows),
        Pagination::new(count, page.number, page.size),
    ))
}
