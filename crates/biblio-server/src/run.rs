use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use biblio_app::state::{AppConfig, AppState};
use futures::FutureExt;
use tower::Layer as _;
use tower_http::{normalize_path::NormalizePathLayer, trace::TraceLayer};
use tracing::{debug, info};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state);

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server stopped");
    Ok(())
}

#[cfg(feature = "openapi")]
fn api_docs() -> utoipa::openapi::OpenApi {
    #[derive(utoipa::OpenApi)]
    #[openapi(info(title = "Book inventory API"))]
    struct OpenApi;

    use utoipa::OpenApi as _;
    OpenApi::openapi().nest("/api/books", biblio_app::rest_api::book::api_docs())
}

fn main_router(state: AppState) -> Router<()> {
    let api = Router::new()
        .nest("/api/books", biblio_app::rest_api::book::router())
        .route("/api", get(biblio_app::rest_api::api_root))
        .with_state(state)
        .route("/health", get(health));
    // paths must be normalized before routing, so the layer wraps a whole router
    let api = NormalizePathLayer::trim_trailing_slash().layer(api);

    // swagger ui redirects to its trailing slash path, so it stays outside normalization
    #[allow(unused_mut)]
    let mut router = Router::new();
    #[cfg(feature = "openapi")]
    {
        let docs = api_docs();
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs),
        );
    }
    router
        .fallback_service(api)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        tokio::fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {}", data_dir.display());
    }

    let app_config: AppConfig = config.into();

    let database_url = config.database_url();
    let pool = biblio_dal::new_pool(&database_url).await?;
    biblio_dal::migrate(&pool).await?;
    debug!("Database {database_url} ready");

    Ok(AppState::new(app_config, pool))
}
