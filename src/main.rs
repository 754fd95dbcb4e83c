use std::net::SocketAddr;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nearby::config::Config;
use nearby::state::AppState;
use nearby::web;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // 2. Config + database
    let config = Config::load();
    info!(
        "Connecting to database (pool size {}, cluster backend {:?})",
        config.database_max_connections, config.cluster_backend
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Cannot connect to database");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Migrations failed");
        info!("Migrations applied");
    }

    // 3. Routes
    let host = config.host.clone();
    let port = config.port;
    let app = web::router(AppState::new(pool, config));

    // 4. Serve, with fallback port
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Cannot parse host/port");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(
                "⚠️  Could not bind {}: {}. Trying fallback {}:{}",
                addr,
                e,
                host,
                port + 1
            );
            let fallback: SocketAddr = format!("{}:{}", host, port + 1)
                .parse()
                .expect("Cannot parse fallback address");
            tokio::net::TcpListener::bind(fallback)
                .await
                .expect("Cannot bind fallback port")
        }
    };

    let bound_addr = listener.local_addr().expect("Listener has no local address");
    info!("🚀 nearby {} listening on http://{}", web::routes::health::BUILD_ID, bound_addr);

    axum::serve(listener, app).await.expect("Server error");
}
