use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use reflink_api::auth::{self, AppState, AppStateInner};
use reflink_api::middleware::{require_admin, require_auth};
use reflink_api::{admin, commissions, conversions, links, payouts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reflink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("REFLINK_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("REFLINK_DB_PATH").unwrap_or_else(|_| "reflink.db".into());
    let host = std::env::var("REFLINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("REFLINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = reflink_db::Database::open(&PathBuf::from(&db_path))?;

    // Bootstrap: promote a named account to admin at startup. The role
    // column is the single authorization source, so this is the only way
    // the first admin comes into existence.
    if let Ok(username) = std::env::var("REFLINK_BOOTSTRAP_ADMIN") {
        if db.promote_to_admin(&username)? {
            info!("Bootstrapped admin '{}'", username);
        } else {
            warn!("Bootstrap admin '{}' does not exist yet", username);
        }
    }

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/healthz", get(reflink_api::health::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/links", post(links::create_link))
        .route("/links", get(links::list_links))
        .route("/conversions", post(conversions::record_conversion))
        .route("/commissions", get(commissions::list_commissions))
        .route("/commissions/preview", get(commissions::preview_split))
        .route("/payouts", post(payouts::request_payout))
        .route("/payouts", get(payouts::list_payouts))
        .route("/balance", get(payouts::get_balance))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state.clone());

    let admin_routes = Router::new()
        .route("/admin/commissions/{id}/approve", post(admin::approve_commission))
        .route("/admin/commissions/{id}/void", post(admin::void_commission))
        .route("/admin/payouts", get(admin::list_all_payouts))
        .route("/admin/payouts/{id}/approve", post(admin::approve_payout))
        .route("/admin/payouts/{id}/reject", post(admin::reject_payout))
        .route("/admin/payouts/{id}/pay", post(admin::pay_payout))
        .layer(middleware::from_fn(require_admin))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Reflink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
