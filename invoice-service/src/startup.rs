use crate::config::{InvoiceConfig, StoreBackend};
use crate::handlers;
use crate::middleware::{auth_middleware, require_admin};
use crate::services::{
    AdminService, AuthService, InvoiceService, JwtService, MemoryStore, MongoDb, Store,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use service_core::error::{expose_error_details, AppError};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::any::Any;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as CorsAny, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<InvoiceConfig>,
    pub store: Arc<dyn Store>,
    pub invoice_service: InvoiceService,
    pub auth_service: AuthService,
    pub admin_service: AdminService,
    pub auth_limiter: IpRateLimiter,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: InvoiceConfig, store: Arc<dyn Store>) -> Result<Self, AppError> {
        expose_error_details(!config.is_production());

        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let auth_limiter = create_ip_rate_limiter(
            config.rate_limit.auth_attempts,
            config.rate_limit.auth_window_seconds,
        );

        Ok(Self {
            invoice_service: InvoiceService::new(store.clone()),
            auth_service: AuthService::new(store.clone(), jwt),
            admin_service: AdminService::new(store.clone()),
            config: Arc::new(config),
            store,
            auth_limiter,
            started_at: Instant::now(),
        })
    }
}

/// Open the configured backend, creating indexes for MongoDB.
pub async fn connect_store(config: &InvoiceConfig) -> Result<Arc<dyn Store>, AppError> {
    match config.store {
        StoreBackend::Mongodb => {
            let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database).await?;
            db.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Route not found"))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::InternalError(anyhow::anyhow!("Handler panicked: {}", detail)).into_response()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(CorsAny)
            .allow_methods(CorsAny)
            .allow_headers(CorsAny);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route_layer(from_fn_with_state(
            state.auth_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let profile_routes = Router::new()
        .route(
            "/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route_layer(auth_layer.clone());

    let invoice_routes = Router::new()
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route("/invoices/stats", get(handlers::invoices::dashboard_stats))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route_layer(auth_layer.clone());

    // Outermost route_layer runs first: authenticate, then check the role.
    let admin_routes = Router::new()
        .route("/admin/users", get(handlers::admin::list_users))
        .route(
            "/admin/users/:id",
            get(handlers::admin::get_user).delete(handlers::admin::delete_user),
        )
        .route(
            "/admin/users/:id/toggle-admin",
            put(handlers::admin::toggle_admin),
        )
        .route("/admin/invoices", get(handlers::admin::list_all_invoices))
        .route("/admin/stats", get(handlers::admin::system_stats))
        .route_layer(from_fn(require_admin))
        .route_layer(auth_layer);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .merge(auth_routes)
        .merge(profile_routes)
        .merge(invoice_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

pub struct Application {
    port: u16,
    server: Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let store = connect_store(&config).await?;
        let addr = config.common.socket_addr();
        let bootstrap_admin = config.bootstrap_admin.clone();

        let state = AppState::new(config, store)?;

        if let Some(admin) = bootstrap_admin {
            state.auth_service.ensure_admin(&admin).await.map_err(|e| {
                tracing::error!("Failed to bootstrap admin account: {}", e);
                AppError::from(e)
            })?;
        }

        let app = build_router(state.clone());

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::pin(server.into_future()),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
