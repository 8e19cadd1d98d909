use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playground_api::config::ServerConfig;
use playground_api::router::build_app_router;
use playground_api::state::AppState;
use playground_db::PgStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let addr = bind_addr(&config);
    let store = connect_store().await;

    let app = build_app_router(AppState::new(Arc::new(store), config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Cannot bind {addr}: {e}"));
    tracing::info!(%addr, "Playground API listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server stopped with an error");
    }
    tracing::info!("Shut down");
}

fn bind_addr(config: &ServerConfig) -> SocketAddr {
    let ip: IpAddr = config
        .host
        .parse()
        .unwrap_or_else(|e| panic!("HOST {:?} is not an IP address: {e}", config.host));
    SocketAddr::new(ip, config.port)
}

/// Connect to `DATABASE_URL`, confirm it answers, and bring the schema up to
/// date. Any failure aborts startup.
async fn connect_store() -> PgStore {
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| panic!("DATABASE_URL must be set"));

    let pool = playground_db::create_pool(&database_url)
        .await
        .unwrap_or_else(|e| panic!("Cannot connect to the database: {e}"));
    playground_db::health_check(&pool)
        .await
        .unwrap_or_else(|e| panic!("Database did not answer: {e}"));
    playground_db::run_migrations(&pool)
        .await
        .unwrap_or_else(|e| panic!("Migrations failed: {e}"));

    tracing::info!("Database ready");
    PgStore::new(pool)
}

/// `RUST_LOG` controls filtering; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "playground_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Interrupted, draining connections"),
        () = terminate => tracing::info!("Terminated, draining connections"),
    }
}
