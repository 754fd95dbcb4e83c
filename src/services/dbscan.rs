use std::collections::VecDeque;

use crate::geo::GeoPoint;

/// DBSCAN over geographic points with great-circle distance.
///
/// Returns one label per input point: `Some(cluster)` numbered from 0 in
/// discovery order, `None` for noise. A point is a core point when at least
/// `min_points` points (itself included) lie within `eps_m`, the same rule
/// `ST_ClusterDBSCAN` applies. Neighbourhoods are brute-forced, O(n²).
pub fn dbscan(points: &[GeoPoint], eps_m: f64, min_points: usize) -> Vec<Option<usize>> {
    let min_points = min_points.max(1);
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut next_cluster = 0;

    for start in 0..points.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;

        let neighbours = region_query(points, start, eps_m);
        if neighbours.len() < min_points {
            // may still be claimed as a border point later
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[start] = Some(cluster);

        let mut queue: VecDeque<usize> = neighbours.into();
        while let Some(idx) = queue.pop_front() {
            if labels[idx].is_none() {
                labels[idx] = Some(cluster);
            }
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            let expansion = region_query(points, idx, eps_m);
            if expansion.len() >= min_points {
                queue.extend(expansion);
            }
        }
    }

    labels
}

fn region_query(points: &[GeoPoint], idx: usize, eps_m: f64) -> Vec<usize> {
    let origin = &points[idx];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| origin.distance_m(p) <= eps_m)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GeoPoint {
        GeoPoint::new(37.6173, 55.7558)
    }

    #[test]
    fn tight_group_is_one_cluster() {
        let points: Vec<GeoPoint> = (0..10)
            .map(|i| base().offset_m(i as f64 * 4.0, i as f64 * 3.0))
            .collect();
        let labels = dbscan(&points, 100.0, 2);
        assert!(labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn far_points_are_noise() {
        let points = vec![
            base(),
            base().offset_m(5_000.0, 0.0),
            base().offset_m(0.0, 5_000.0),
        ];
        assert_eq!(dbscan(&points, 100.0, 2), vec![None, None, None]);
    }

    #[test]
    fn two_groups_and_an_outlier() {
        let a = base();
        let b = base().offset_m(3_000.0, 0.0);
        let points = vec![
            a,
            b,
            a.offset_m(10.0, 0.0),
            b.offset_m(0.0, 10.0),
            a.offset_m(0.0, 20.0),
            base().offset_m(-9_000.0, 0.0),
        ];
        let labels = dbscan(&points, 50.0, 2);
        assert_eq!(
            labels,
            vec![Some(0), Some(1), Some(0), Some(1), Some(0), None]
        );
    }

    #[test]
    fn border_point_joins_cluster_of_its_core() {
        // chain 0 - 1 - 2 with 60 m steps; only 1 sees both neighbours
        let points = vec![
            base(),
            base().offset_m(60.0, 0.0),
            base().offset_m(120.0, 0.0),
        ];
        let labels = dbscan(&points, 70.0, 3);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn min_points_one_makes_every_point_a_cluster() {
        let points = vec![base(), base().offset_m(10_000.0, 0.0)];
        assert_eq!(dbscan(&points, 10.0, 1), vec![Some(0), Some(1)]);
        assert_eq!(dbscan(&points, 10.0, 0), vec![Some(0), Some(1)]);
    }

    #[test]
    fn empty_input() {
        assert!(dbscan(&[], 10.0, 2).is_empty());
    }
}
