use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

/// Where DBSCAN runs for a clustered map request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterBackend {
    /// `ST_ClusterDBSCAN` inside the store, one composite round-trip.
    Postgis,
    /// Candidates are listed and clustered in process.
    Local,
}

impl FromStr for ClusterBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgis" | "db" | "database" => Ok(Self::Postgis),
            "local" | "memory" => Ok(Self::Local),
            other => Err(format!("unknown cluster backend '{other}'")),
        }
    }
}

/// Per-variant limits: users ("who is near") and ads (map).
#[derive(Debug, Clone, Copy)]
pub struct ProximityLimits {
    pub max_radius_m: f64,
    pub zoom_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub users: ProximityLimits,
    pub ads: ProximityLimits,
    pub distance_error: f64,
    pub cluster_eps_pixels: f64,
    pub cluster_backend: ClusterBackend,
    pub query_timeout: Duration,
    pub public_files_url: String,
    pub run_migrations: bool,
}

impl Config {
    pub fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10"),
            host: try_load("HOST", "127.0.0.1"),
            port: try_load("PORT", "3000"),
            users: ProximityLimits {
                max_radius_m: try_load("MAX_USERS_RADIUS", "60000"),
                zoom_threshold: try_load("USERS_ZOOM_THRESHOLD", "19.5"),
            },
            ads: ProximityLimits {
                max_radius_m: try_load("MAX_ADS_RADIUS", "250000"),
                zoom_threshold: try_load("ADS_ZOOM_THRESHOLD", "20"),
            },
            distance_error: try_load("DISTANCE_ERROR", "0.15"),
            cluster_eps_pixels: try_load("CLUSTER_EPS_PIXELS", "11"),
            cluster_backend: try_load("CLUSTER_BACKEND", "postgis"),
            query_timeout: Duration::from_millis(try_load("QUERY_TIMEOUT_MS", "5000")),
            public_files_url: try_load("PUBLIC_FILES_URL", "http://127.0.0.1:9000/files"),
            run_migrations: try_load("RUN_MIGRATIONS", "false"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 10,
            host: "127.0.0.1".to_string(),
            port: 3000,
            users: ProximityLimits {
                max_radius_m: 60_000.0,
                zoom_threshold: 19.5,
            },
            ads: ProximityLimits {
                max_radius_m: 250_000.0,
                zoom_threshold: 20.0,
            },
            distance_error: 0.15,
            cluster_eps_pixels: 11.0,
            cluster_backend: ClusterBackend::Postgis,
            query_timeout: Duration::from_millis(5000),
            public_files_url: "http://127.0.0.1:9000/files".to_string(),
            run_migrations: false,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_backend_parses_aliases() {
        assert_eq!("postgis".parse::<ClusterBackend>(), Ok(ClusterBackend::Postgis));
        assert_eq!(" Local ".parse::<ClusterBackend>(), Ok(ClusterBackend::Local));
        assert!("kmeans".parse::<ClusterBackend>().is_err());
    }

    #[test]
    fn users_and_ads_keep_separate_thresholds() {
        let config = Config::default();
        assert_eq!(config.users.zoom_threshold, 19.5);
        assert_eq!(config.ads.zoom_threshold, 20.0);
        assert!(config.users.max_radius_m < config.ads.max_radius_m);
    }

    #[test]
    fn unset_keys_fall_back_to_their_default() {
        let port: u16 = try_load("NEARBY_TEST_UNSET_PORT", "3000");
        let backend: ClusterBackend = try_load("NEARBY_TEST_UNSET_BACKEND", "local");
        assert_eq!(port, 3000);
        assert_eq!(backend, ClusterBackend::Local);
    }
}
