use std::{env, fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

use tradebook::{
    AppState, Config, LogMailer, build_router, delete_expired_refresh_tokens, graceful_shutdown,
    logging_middleware, prune_rate_limiter,
};

/// How often expired refresh tokens and idle rate limiter entries are purged.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The REST API server for tradebook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Directory holding an SSL certificate `cert.pem` and key `key.pem`.
    /// The server speaks plain HTTP when this is not given.
    #[arg(long)]
    cert_path: Option<String>,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Requests per minute each client may send to the unauthenticated auth routes.
    #[arg(long, env = "AUTH_REQUESTS_PER_MINUTE", default_value_t = 30)]
    auth_requests_per_minute: u32,

    /// Lifetime of access tokens in minutes.
    #[arg(long, env = "ACCESS_TOKEN_MINUTES", default_value_t = 15)]
    access_token_minutes: i64,

    /// Lifetime of refresh tokens in days.
    #[arg(long, env = "REFRESH_TOKEN_DAYS", default_value_t = 30)]
    refresh_token_days: i64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .expect("Could not parse the host and port as a socket address.");

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let config = Config {
        access_token_duration: time::Duration::minutes(args.access_token_minutes),
        refresh_token_duration: time::Duration::days(args.refresh_token_days),
        auth_requests_per_minute: args.auth_requests_per_minute,
        secure_cookies: args.cert_path.is_some(),
        ..Default::default()
    };

    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    let state = AppState::new(conn, &secret, config, Arc::new(LogMailer))
        .expect("Could not initialize the database.");

    tokio::spawn(run_periodic_cleanup(state.clone()));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    let service = router.into_make_service_with_connect_info::<SocketAddr>();

    match args.cert_path {
        Some(cert_path) => {
            let tls_config = RustlsConfig::from_pem_file(
                PathBuf::from(&cert_path).join("cert.pem"),
                PathBuf::from(&cert_path).join("key.pem"),
            )
            .await
            .expect("Could not open TLS certificates.");

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(service)
                .await
                .expect("The server stopped unexpectedly.");
        }
        None => {
            tracing::warn!("No certificate given, serving plain HTTP.");
            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(service)
                .await
                .expect("The server stopped unexpectedly.");
        }
    }
}

async fn run_periodic_cleanup(state: AppState) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        interval.tick().await;

        let tracked_clients = prune_rate_limiter(&state.rate_limiter);
        tracing::debug!("Rate limiter is tracking {tracked_clients} clients.");

        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("Could not lock the database to purge refresh tokens: {error}");
                continue;
            }
        };

        match delete_expired_refresh_tokens(OffsetDateTime::now_utc(), &connection) {
            Ok(0) => {}
            Ok(count) => tracing::info!("Purged {count} expired refresh tokens."),
            Err(error) => tracing::error!("Could not purge expired refresh tokens: {error}"),
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    // RUST_LOG overrides the default levels of both layers.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter::LevelFilter::DEBUG.to_string()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged when they are turned into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
