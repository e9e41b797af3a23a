mod scores;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, header::CACHE_CONTROL},
    routing::get_service,
};
use clap::Parser;
use leaderboard::{
    LeaderboardService,
    clock::SystemClock,
    db::{self, DbStore},
    models::Limits,
    store::{MemoryStore, ScoreStore},
    validate,
};
use migration::{Migrator, MigratorTrait};
use tower_http::{cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer};

#[derive(Parser)]
#[command(name = "leaderboard-server", about = "Score backend for the browser game")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen: SocketAddr,
    /// Postgres connection string; omit to keep scores in memory
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    /// Connection pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    db_max_connections: u32,
    /// Directory holding the game's static assets
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    static_dir: String,
    /// Highest score accepted as plausible
    #[arg(long, env = "MAX_SCORE", default_value_t = validate::MAX_PLAUSIBLE_SCORE)]
    max_score: i64,
}

pub struct AppState {
    pub service: LeaderboardService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store: Arc<dyn ScoreStore> = match &args.database_url {
        Some(url) => {
            let db = db::connect(url, args.db_max_connections)
                .await
                .context("connecting to database")?;
            Migrator::up(&db, None).await.context("running migrations")?;
            Arc::new(DbStore::new(db))
        }
        None => {
            log::warn!("DATABASE_URL not set; scores will not survive a restart");
            Arc::new(MemoryStore::default())
        }
    };

    let limits = Limits {
        max_score: args.max_score,
        ..Limits::default()
    };
    let state = Arc::new(AppState {
        service: LeaderboardService::new(store, Arc::new(SystemClock), limits),
    });

    let assets = get_service(ServeDir::new(&args.static_dir)).layer(
        SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        ),
    );

    // The game is served from arbitrary origins during development, so CORS
    // stays permissive here rather than in the core.
    let app = Router::new()
        .nest("/api", scores::routes())
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .with_state(state);

    log::info!("listening on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .context("binding listen address")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
