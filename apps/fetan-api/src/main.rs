mod auth;
mod cli;
mod error;
mod handlers;
mod services;
mod uploads;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::routing::{delete, get, post, put};
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fetan_db::repositories::api_key_repo::ApiKeyRepository;

use services::agent_service::AgentService;
use services::catalog_service::CatalogService;
use services::coupon_service::CouponService;
use services::notification_service::NotificationService;
use services::order_service::OrderService;
use services::payment_service::PaymentService;
use services::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub coupons: Arc<CouponService>,
    pub payments: Arc<PaymentService>,
    pub users: Arc<UserService>,
    pub agents: Arc<AgentService>,
    pub notifications: Arc<NotificationService>,
    pub api_keys: ApiKeyRepository,
    pub session_secret: String,
    pub bot_token: Option<String>,
    pub upload_dir: PathBuf,
}

#[derive(Parser)]
#[command(name = "fetan-api", about = "Fetan Shop backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Operator commands.
    Admin {
        #[command(subcommand)]
        action: cli::AdminAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let file_appender = tracing_appender::rolling::never(".", "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();

    let args = Cli::parse();
    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Admin { action } => cli::run(action).await,
    }
}

async fn serve() -> Result<()> {
    let pool = fetan_db::db::init_db().await?;

    let session_secret =
        std::env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?;
    let bot_token = std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty());
    let upload_dir = PathBuf::from(
        std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
    );
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .context("Failed to create upload directory")?;

    let state = AppState {
        pool: pool.clone(),
        orders: Arc::new(OrderService::new(pool.clone())),
        catalog: Arc::new(CatalogService::new(pool.clone())),
        coupons: Arc::new(CouponService::new(pool.clone())),
        payments: Arc::new(PaymentService::new(pool.clone())),
        users: Arc::new(UserService::new(pool.clone())),
        agents: Arc::new(AgentService::new(pool.clone())),
        notifications: Arc::new(NotificationService::new(bot_token.clone())),
        api_keys: ApiKeyRepository::new(pool.clone()),
        session_secret,
        bot_token,
        upload_dir: upload_dir.clone(),
    };

    let app = router(state, &upload_dir);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!("Listening on 0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState, upload_dir: &std::path::Path) -> Router {
    let public = Router::new()
        .route("/api/auth/telegram", post(handlers::auth::telegram_login))
        .route("/api/auth/login", post(handlers::auth::admin_login))
        .route("/api/products", get(handlers::catalog::list_products))
        .route("/api/products/{id}", get(handlers::catalog::get_product))
        .route(
            "/api/subscriptions",
            get(handlers::catalog::list_subscriptions),
        )
        .route(
            "/api/payment-methods",
            get(handlers::catalog::list_payment_methods),
        );

    let client = Router::new()
        .route(
            "/api/cart",
            get(handlers::cart::get).delete(handlers::cart::clear),
        )
        .route(
            "/api/cart/items",
            post(handlers::cart::add_item).put(handlers::cart::set_item),
        )
        .route("/api/orders", post(handlers::orders::create))
        .route("/api/orders/my-orders", get(handlers::orders::my_orders))
        .route("/api/orders/{id}", get(handlers::orders::get))
        .route(
            "/api/products/{id}/rate",
            post(handlers::catalog::rate_product),
        )
        .route("/api/coupons/validate", post(handlers::coupons::validate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let admin = Router::new()
        .route("/api/orders/admin", get(handlers::orders::list_all))
        .route("/api/orders/admin/stats", get(handlers::orders::stats))
        .route(
            "/api/orders/admin/{id}",
            get(handlers::orders::get_admin).delete(handlers::orders::delete),
        )
        .route(
            "/api/orders/admin/{id}/status",
            put(handlers::orders::update_status),
        )
        .route("/api/users", get(handlers::users::list))
        .route("/api/users/stats/overview", get(handlers::users::stats))
        .route(
            "/api/users/screenshots/pending",
            get(handlers::users::pending_screenshots),
        )
        .route(
            "/api/users/{id}/approve-payment",
            post(handlers::users::approve_payment),
        )
        .route(
            "/api/users/{id}/reject-payment",
            post(handlers::users::reject_payment),
        )
        .route(
            "/api/products/admin",
            get(handlers::catalog::list_products_admin).post(handlers::catalog::create_product),
        )
        .route(
            "/api/products/admin/{id}",
            put(handlers::catalog::update_product).delete(handlers::catalog::delete_product),
        )
        .route(
            "/api/products/admin/{id}/discounts",
            get(handlers::catalog::product_discounts)
                .post(handlers::catalog::set_product_discount),
        )
        .route(
            "/api/subscriptions/admin",
            get(handlers::catalog::list_subscriptions_admin)
                .post(handlers::catalog::create_subscription),
        )
        .route(
            "/api/subscriptions/admin/{id}",
            delete(handlers::catalog::delete_subscription),
        )
        .route(
            "/api/subscriptions/admin/{id}/active",
            put(handlers::catalog::set_subscription_active),
        )
        .route(
            "/api/payment-methods/admin",
            get(handlers::catalog::list_payment_methods_admin)
                .post(handlers::catalog::create_payment_method),
        )
        .route(
            "/api/payment-methods/admin/{id}",
            delete(handlers::catalog::delete_payment_method),
        )
        .route(
            "/api/payment-methods/admin/{id}/active",
            put(handlers::catalog::set_payment_method_active),
        )
        .route(
            "/api/coupons/admin",
            get(handlers::coupons::list).post(handlers::coupons::create),
        )
        .route(
            "/api/coupons/admin/{id}",
            delete(handlers::coupons::delete),
        )
        .route(
            "/api/coupons/admin/{id}/active",
            put(handlers::coupons::set_active),
        )
        .route(
            "/api/agents",
            get(handlers::agents::list).post(handlers::agents::create),
        )
        .route(
            "/api/agents/{id}",
            get(handlers::agents::get).delete(handlers::agents::delete),
        )
        .route(
            "/api/agents/{id}/referrals",
            get(handlers::agents::referrals),
        )
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let bot = Router::new()
        .route("/api/bot/users", post(handlers::bot::upsert_user))
        .route("/api/bot/users/{tg_id}", get(handlers::bot::get_user))
        .route(
            "/api/bot/users/{tg_id}/cart",
            get(handlers::bot::get_cart)
                .post(handlers::bot::add_cart_item)
                .delete(handlers::bot::clear_cart),
        )
        .route(
            "/api/bot/users/{tg_id}/screenshots",
            get(handlers::bot::list_screenshots).post(handlers::bot::add_screenshot),
        )
        .route(
            "/api/bot/users/{tg_id}/checkout",
            post(handlers::bot::checkout),
        )
        .route(
            "/api/bot/users/{tg_id}/orders",
            get(handlers::bot::list_orders),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::bot_auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(client)
        .merge(admin)
        .merge(bot)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(axum::extract::DefaultBodyLimit::max(
            uploads::MAX_SCREENSHOT_BYTES + 64 * 1024,
        ))
        .layer(RequestBodyLimitLayer::new(uploads::MAX_SCREENSHOT_BYTES + 64 * 1024))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
