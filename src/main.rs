mod cart;
mod catalog;
mod config;
mod export;
mod http;
mod interactions;
mod jobs;
mod metrics;
mod models;
mod ui;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use cart::{CartError, CartStore};
use catalog::{CatalogConfig, CatalogError, CatalogStore};
use config::AppConfig;
use export::{ExportError, ExportFormat, Exporter, media::ImageFetcher};
use http::{ImageProxy, ProxyError};
use interactions::{Interaction, InteractionError, InteractionLog};
use jobs::{JobError, JobQueue};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, BuyerQuery, CartAddRequest, CartCustomRequest, CartRemoveRequest, CartResponse,
    ClientConfig, CountResponse, EnqueueResponse, HealthResponse, ImageQuery, OkResponse,
    ReloadResponse, SearchQuery, SearchResponse, UploadResponse, VersionResponse,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const SEARCH_LIMIT: usize = 200;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "showroom.api", "server crashed: {err:?}");
    }
}

async fn run() -> eyre::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    let catalog_config = CatalogConfig::from_env()?;
    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    let state = AppState::build(&config, catalog_config, prometheus_handle).await;

    let outcome = state.catalog.refresh().await;
    info!(
        target = "showroom.api",
        source = ?outcome.source,
        items = outcome.count,
        "initial catalog load"
    );

    let app = build_router(state, &config);
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!(target = "showroom.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    catalog: CatalogStore,
    carts: CartStore,
    interactions: Arc<InteractionLog>,
    exporter: Exporter,
    proxy: ImageProxy,
    queue: JobQueue,
    buyers: Arc<Vec<String>>,
    openapi: Arc<serde_json::Value>,
    prometheus_handle: PrometheusHandle,
}

impl AppState {
    async fn build(
        config: &AppConfig,
        catalog_config: CatalogConfig,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        let http = http::build_client();
        let image_version = catalog_config.image_version.clone();
        let catalog = CatalogStore::new(catalog_config, http.clone(), config.catalog_cache_path());
        let carts = CartStore::open(config.cart_path(), config.image_dir.clone()).await;
        let (queue, _worker) = JobQueue::spawn(config.image_sync_command.clone(), catalog.clone());
        let openapi: serde_json::Value = serde_yaml::from_str(include_str!("../docs/openapi.yaml"))
            .unwrap_or(serde_json::json!({"openapi":"3.0.3"}));
        Self {
            catalog,
            carts,
            interactions: Arc::new(InteractionLog::new(config.interactions_path())),
            exporter: Exporter::new(
                ImageFetcher::new(http.clone(), config.image_dir.clone()),
                image_version,
                config.export_title.clone(),
            ),
            proxy: ImageProxy::new(http, config.image_proxy_allowlist.clone()),
            queue,
            buyers: Arc::new(config.buyers.clone()),
            openapi: Arc::new(openapi),
            prometheus_handle,
        }
    }
}

fn build_router(state: AppState, config: &AppConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let api = Router::new()
        .route("/config", get(client_config))
        .route("/catalog_for_client", get(catalog_for_client))
        .route("/products", get(search_products))
        .route("/products/{model}", get(product_detail))
        .route("/reload", post(reload_catalog))
        .route("/upload_catalog", post(upload_catalog))
        .route("/reload_images", post(reload_images))
        .route("/jobs/{id}", get(get_job_status))
        .route("/interactions", post(log_interaction))
        .route("/cart", get(cart_get))
        .route("/cart/count", get(cart_count))
        .route("/cart/version", get(cart_version))
        .route("/cart/add", post(cart_add))
        .route("/cart/remove", post(cart_remove))
        .route("/cart/clear", post(cart_clear))
        .route("/cart/add_custom", post(cart_add_custom))
        .route("/download_cart_excel", get(download_cart_excel))
        .route("/download_cart_pdf", get(download_cart_pdf));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(openapi_json))
        .route(catalog::image::PROXY_PATH, get(image_proxy))
        .nest("/api", api)
        .nest_service("/images", ServeDir::new(&config.image_dir))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.body_limit))
}

async fn index() -> Html<&'static str> {
    Html(ui::INDEX_HTML)
}

/// Liveness plus the size of the loaded catalog.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalog = state.catalog.get();
    Json(HealthResponse {
        status: "ok",
        service: "showroom-api",
        items: catalog.items.len(),
        loaded_at: catalog.loaded_at,
    })
}

async fn openapi_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Ok(key) = std::env::var("OPENAPI_KEY") {
        let presented = headers
            .get("X-Docs-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != key {
            return Err(AppError::Unauthorized);
        }
    }
    Ok(Json((*state.openapi).clone()))
}

async fn metrics_endpoint(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Ok(secret) = std::env::var("METRICS_KEY") {
        let presented = headers
            .get("X-Metrics-Key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if presented != secret {
            return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
        }
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

async fn client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(ClientConfig {
        buyers: (*state.buyers).clone(),
        placeholder_image: state.catalog.config().placeholder_image.clone(),
        image_sync: state.queue.is_configured(),
    })
}

/// The whole catalog: items, headers, detected header row and sheet name.
async fn catalog_for_client(State(state): State<AppState>) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/api/catalog_for_client");
    let catalog = state.catalog.get();
    let body = serde_json::to_vec(&*catalog).map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    crate::metrics::inc_requests("/api/products");
    let catalog = state.catalog.get();
    let items = catalog
        .search(&query.q, &query.keywords, SEARCH_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    Json(SearchResponse { ok: true, items })
}

async fn product_detail(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<Json<catalog::Product>, AppError> {
    let catalog = state.catalog.get();
    catalog
        .find(model.trim())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {model}")))
}

async fn reload_catalog(State(state): State<AppState>) -> Json<ReloadResponse> {
    crate::metrics::inc_requests("/api/reload");
    let outcome = state.catalog.refresh().await;
    info!(target = "showroom.api", source = ?outcome.source, items = outcome.count, "catalog reloaded");
    Json(ReloadResponse { ok: true, outcome })
}

/// Replaces the catalog with an uploaded workbook (multipart field `file`).
async fn upload_catalog(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    crate::metrics::inc_requests("/api/upload_catalog");
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        let catalog = state.catalog.load_upload(bytes.to_vec()).await?;
        info!(target = "showroom.api", items = catalog.items.len(), "catalog uploaded");
        return Ok(Json(UploadResponse {
            ok: true,
            count: catalog.items.len(),
        }));
    }
    Err(AppError::BadRequest("missing multipart field `file`".into()))
}

async fn reload_images(State(state): State<AppState>) -> Result<Json<EnqueueResponse>, AppError> {
    crate::metrics::inc_requests("/api/reload_images");
    let id = state.queue.enqueue_image_sync().await?;
    Ok(Json(EnqueueResponse {
        ok: true,
        job_id: id.to_string(),
    }))
}

async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<jobs::JobInfo>, AppError> {
    let Ok(uuid) = uuid::Uuid::parse_str(&id) else {
        return Err(AppError::BadRequest("invalid_job_id".into()));
    };
    state
        .queue
        .get(uuid)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {id}")))
}

async fn log_interaction(
    State(state): State<AppState>,
    Json(event): Json<Interaction>,
) -> Result<Json<OkResponse>, AppError> {
    state.interactions.append(&event).await?;
    Ok(Json(OkResponse { ok: true }))
}

async fn cart_get(State(state): State<AppState>, Query(query): Query<BuyerQuery>) -> Json<CartResponse> {
    Json(state.carts.get(&query.buyer).await.into())
}

async fn cart_count(
    State(state): State<AppState>,
    Query(query): Query<BuyerQuery>,
) -> Json<CountResponse> {
    Json(CountResponse {
        ok: true,
        count: state.carts.count(&query.buyer).await,
        version: state.carts.version(&query.buyer).await,
    })
}

async fn cart_version(
    State(state): State<AppState>,
    Query(query): Query<BuyerQuery>,
) -> Json<VersionResponse> {
    Json(VersionResponse {
        ok: true,
        version: state.carts.version(&query.buyer).await,
    })
}

async fn cart_add(
    State(state): State<AppState>,
    Json(payload): Json<CartAddRequest>,
) -> Result<Json<CartResponse>, AppError> {
    crate::metrics::inc_requests("/api/cart/add");
    let snapshot = state.carts.add(&payload.buyer, payload.item).await?;
    Ok(Json(snapshot.into()))
}

async fn cart_remove(
    State(state): State<AppState>,
    Json(payload): Json<CartRemoveRequest>,
) -> Result<Json<CartResponse>, AppError> {
    let snapshot = state.carts.remove(&payload.buyer, &payload.model).await?;
    Ok(Json(snapshot.into()))
}

async fn cart_clear(
    State(state): State<AppState>,
    Json(payload): Json<BuyerQuery>,
) -> Result<Json<CartResponse>, AppError> {
    let snapshot = state.carts.clear(&payload.buyer).await?;
    Ok(Json(snapshot.into()))
}

async fn cart_add_custom(
    State(state): State<AppState>,
    Json(payload): Json<CartCustomRequest>,
) -> Result<Json<CartResponse>, AppError> {
    crate::metrics::inc_requests("/api/cart/add_custom");
    let item = payload.item.ok_or(CartError::MissingModel)?;
    let snapshot = state.carts.add_custom(&payload.buyer, item).await?;
    Ok(Json(snapshot.into()))
}

async fn download_cart_excel(
    State(state): State<AppState>,
    Query(query): Query<BuyerQuery>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/api/download_cart_excel");
    download(state, &query.buyer, ExportFormat::Excel).await
}

async fn download_cart_pdf(
    State(state): State<AppState>,
    Query(query): Query<BuyerQuery>,
) -> Result<Response, AppError> {
    crate::metrics::inc_requests("/api/download_cart_pdf");
    download(state, &query.buyer, ExportFormat::Pdf).await
}

async fn download(state: AppState, buyer: &str, format: ExportFormat) -> Result<Response, AppError> {
    let buyer = buyer.trim();
    let cart = state.carts.get(buyer).await;
    let catalog = state.catalog.get();
    let bytes = state
        .exporter
        .render(format, buyer, &cart.items, &catalog)
        .await?;

    let filename = export::attachment_name(&ascii_filename(buyer), format);
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn ascii_filename(buyer: &str) -> String {
    buyer
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

async fn image_proxy(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, AppError> {
    Ok(state.proxy.fetch(query.u.as_deref()).await?)
}

#[derive(Debug)]
enum AppError {
    Catalog(CatalogError),
    Cart(CartError),
    Export(ExportError),
    Job(JobError),
    Proxy(ProxyError),
    Interaction(InteractionError),
    BadRequest(String),
    NotFound(String),
    Unauthorized,
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<CartError> for AppError {
    fn from(value: CartError) -> Self {
        Self::Cart(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<JobError> for AppError {
    fn from(value: JobError) -> Self {
        Self::Job(value)
    }
}

impl From<ProxyError> for AppError {
    fn from(value: ProxyError) -> Self {
        Self::Proxy(value)
    }
}

impl From<InteractionError> for AppError {
    fn from(value: InteractionError) -> Self {
        Self::Interaction(value)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        use StatusCode as S;
        match self {
            AppError::Catalog(err @ CatalogError::Configuration) => {
                (S::INTERNAL_SERVER_ERROR, "catalog", err.to_string())
            }
            AppError::Catalog(err) => (S::BAD_REQUEST, "catalog", err.to_string()),
            AppError::Cart(err @ CartError::Io(_)) => {
                (S::INTERNAL_SERVER_ERROR, "cart", err.to_string())
            }
            AppError::Cart(err) => (S::BAD_REQUEST, "cart", err.to_string()),
            AppError::Export(err @ ExportError::Render(_)) => {
                (S::INTERNAL_SERVER_ERROR, "export", err.to_string())
            }
            AppError::Export(err) => (S::BAD_REQUEST, "export", err.to_string()),
            AppError::Job(err @ JobError::NotConfigured) => (S::BAD_REQUEST, "jobs", err.to_string()),
            AppError::Job(err) => (S::INTERNAL_SERVER_ERROR, "jobs", err.to_string()),
            AppError::Proxy(err @ ProxyError::Upstream(_)) => (S::BAD_GATEWAY, "image", err.to_string()),
            AppError::Proxy(err) => (S::BAD_REQUEST, "image", err.to_string()),
            AppError::Interaction(err @ InteractionError::MissingField) => {
                (S::BAD_REQUEST, "interactions", err.to_string())
            }
            AppError::Interaction(err) => {
                (S::INTERNAL_SERVER_ERROR, "interactions", err.to_string())
            }
            AppError::BadRequest(detail) => (S::BAD_REQUEST, "invalid_input", detail.clone()),
            AppError::NotFound(detail) => (S::NOT_FOUND, "not_found", detail.clone()),
            AppError::Unauthorized => (S::UNAUTHORIZED, "unauthorized", "unauthorized".into()),
            AppError::Internal(detail) => (S::INTERNAL_SERVER_ERROR, "internal", detail.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, detail) = self.parts();
        if status.is_server_error() {
            warn!(target = "showroom.api", status = %status, error, detail = %detail, "request failed");
        }
        let payload = ApiError {
            error: error.to_string(),
            detail: Some(detail),
        };
        (status, Json(payload)).into_response()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use std::path::{Path as FsPath, PathBuf};
    use tower::ServiceExt;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("showroom-api-{}", uuid::Uuid::new_v4()))
    }

    fn app_config(dir: &FsPath, sync: Option<&str>) -> AppConfig {
        AppConfig {
            port: 0,
            data_dir: dir.join("data"),
            image_dir: dir.join("images"),
            buyers: vec!["HEB".into(), "SORIANA".into()],
            image_sync_command: sync.map(str::to_string),
            image_proxy_allowlist: Vec::new(),
            export_title: "Showroom".into(),
            body_limit: 10 * 1024 * 1024,
        }
    }

    fn workbook() -> Vec<u8> {
        let mut book = rust_xlsxwriter::Workbook::new();
        let ws = book.add_worksheet();
        let header = [
            "Item #",
            "Short",
            "Precio FOB Soriana ($USD)",
            "PVP Soriana Estimado ($MXN)",
        ];
        for (col, title) in header.iter().enumerate() {
            ws.write_string(0, col as u16, *title).unwrap();
        }
        let rows = [
            ["SKU-1", "Nice lamp", "12.50", "750.00"],
            ["SKU-2", "Garland", "$3.10", ""],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                ws.write_string(r as u32 + 1, c as u16, *value).unwrap();
            }
        }
        book.save_to_buffer().unwrap()
    }

    async fn test_app(sync: Option<&str>) -> (Router, AppState, PathBuf) {
        let dir = temp_dir();
        let config = app_config(&dir, sync);
        let catalog_config = CatalogConfig {
            placeholder_image: String::new(),
            ..CatalogConfig::default()
        };
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState::build(&config, catalog_config, handle).await;
        state.catalog.load_bytes(workbook()).await.unwrap();
        (build_router(state.clone(), &config), state, dir)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let (status, _, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_catalog_size() {
        let (app, _, _) = test_app(None).await;
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["items"], 2);
    }

    #[tokio::test]
    async fn catalog_search_and_detail() {
        let (app, _, _) = test_app(None).await;
        let (_, catalog) = get_json(&app, "/api/catalog_for_client").await;
        assert_eq!(catalog["headerRow"], 1);
        assert_eq!(catalog["items"][0]["prices"]["SORIANA"]["fob"], 12.5);
        assert_eq!(catalog["items"][0]["prices"]["SORIANA"]["pvp"], 750.0);

        let (_, found) = get_json(&app, "/api/products?q=garl").await;
        assert_eq!(found["items"].as_array().unwrap().len(), 1);
        let (_, found) = get_json(&app, "/api/products?keywords=lamp,garland").await;
        assert_eq!(found["items"].as_array().unwrap().len(), 2);

        let (status, product) = get_json(&app, "/api/products/SKU-2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(product["prices"]["SORIANA"]["fob"], 3.1);
        assert!(product["prices"]["SORIANA"]["pvp"].is_null());
        let (status, body) = get_json(&app, "/api/products/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn cart_round_trip() {
        let (app, _, _) = test_app(None).await;
        let (_, start) = get_json(&app, "/api/cart/version?buyer=HEB").await;
        let start = start["version"].as_u64().unwrap();
        let add = json!({"buyer": "HEB", "item": {"model": "SKU-1", "note": "rojo", "price": 12.5}});
        let (status, body) = post_json(&app, "/api/cart/add", add).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["note"], "rojo");

        let merge = json!({"buyer": "HEB", "item": {"model": "SKU-1", "note": "azul"}});
        let (_, body) = post_json(&app, "/api/cart/add", merge).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["price"], 12.5);
        assert_eq!(body["version"], start + 2);

        let (_, count) = get_json(&app, "/api/cart/count?buyer=HEB").await;
        assert_eq!(count["count"], 1);
        let (_, version) = get_json(&app, "/api/cart/version?buyer=HEB").await;
        assert_eq!(version["version"], start + 2);
        let (_, other) = get_json(&app, "/api/cart?buyer=SORIANA").await;
        assert!(other["items"].as_array().unwrap().is_empty());

        let (_, body) = post_json(&app, "/api/cart/remove", json!({"buyer": "HEB", "model": "SKU-1"})).await;
        assert!(body["items"].as_array().unwrap().is_empty());

        let (status, body) = post_json(&app, "/api/cart/add", json!({"buyer": "", "item": {"model": "A"}})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "cart");
        let (status, _) = post_json(&app, "/api/cart/add_custom", json!({"buyer": "HEB"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exports_require_items_and_name_the_attachment() {
        let (app, _, _) = test_app(None).await;
        let (status, body) = get_json(&app, "/api/download_cart_pdf?buyer=HEB").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "cart is empty");
        let (status, _) = get_json(&app, "/api/download_cart_excel").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        post_json(&app, "/api/cart/add", json!({"buyer": "HEB", "item": {"model": "SKU-1"}})).await;
        post_json(
            &app,
            "/api/cart/add_custom",
            json!({"buyer": "HEB", "item": {"model": "Muestra", "note": "hecha a mano"}}),
        )
        .await;

        let request = Request::builder()
            .uri("/api/download_cart_excel?buyer=HEB")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"seleccion-HEB.xlsx\""
        );
        assert_eq!(&body[..2], b"PK");

        let request = Request::builder()
            .uri("/api/download_cart_pdf?buyer=HEB")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert!(body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn image_proxy_rejects_bad_input() {
        let (app, _, _) = test_app(None).await;
        let (status, _) = get_json(&app, "/img").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(&app, "/img?u=file%3A%2F%2F%2Fetc%2Fpasswd").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn interactions_are_logged() {
        let (app, _, dir) = test_app(None).await;
        let (status, _) = post_json(&app, "/api/interactions", json!({"buyer": "HEB", "model": "SKU-1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let event = json!({"buyer": "HEB", "model": "SKU-1", "action": "view", "device": "desktop"});
        let (status, body) = post_json(&app, "/api/interactions", event).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        let log = std::fs::read_to_string(dir.join("data/interactions.csv")).unwrap();
        assert!(log.starts_with("time,buyer,model,action,note,device,price"));
        assert!(log.contains(",HEB,SKU-1,view,,desktop,"));
    }

    #[tokio::test]
    async fn upload_replaces_catalog_and_rejects_garbage() {
        let (app, state, dir) = test_app(None).await;
        let boundary = "showroomboundary";
        let multipart = |bytes: &[u8]| {
            let mut body = Vec::new();
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"c.xlsx\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
            Request::builder()
                .method("POST")
                .uri("/api/upload_catalog")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap()
        };

        let (status, _, _) = send(&app, multipart(b"not a workbook")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(state.catalog.get().items.len(), 2);

        let (status, _, body) = send(&app, multipart(&workbook())).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["count"], 2);
        assert!(dir.join("data/last.xlsx").exists());
    }

    #[tokio::test]
    async fn reload_keeps_catalog_when_source_missing() {
        let (app, _, _) = test_app(None).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/reload")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["count"], 2);
        assert_eq!(body["source"], "retained");
    }

    #[tokio::test]
    async fn image_jobs_need_a_command() {
        let (app, _, _) = test_app(None).await;
        let (status, body) = post_json(&app, "/api/reload_images", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "jobs");

        let (status, _) = get_json(&app, "/api/jobs/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get_json(&app, &format!("/api/jobs/{}", uuid::Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn image_job_is_queued_and_tracked() {
        let (app, _, _) = test_app(Some("echo done")).await;
        let (status, body) = post_json(&app, "/api/reload_images", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let id = body["job_id"].as_str().unwrap().to_string();
        let (status, job) = get_json(&app, &format!("/api/jobs/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(job["id"], id.as_str());
    }

    #[tokio::test]
    async fn index_and_openapi_are_served() {
        let (app, _, _) = test_app(None).await;
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("/api/cart/add"));
        let (status, spec) = get_json(&app, "/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(spec["paths"]["/api/cart/add"].is_object());
    }
}
