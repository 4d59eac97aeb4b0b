use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use divide::cell::Cell;
use divide::config::Params;
use divide::divide::{Mode, Step};
use divide::{ContinentMap, Summary, render};

type Shared = Arc<Mutex<ContinentMap>>;

#[derive(Deserialize, Default)]
#[serde(default)]
struct RunRequest {
    step: bool,
}

#[derive(Deserialize)]
struct CellQuery {
    x: i64,
    y: i64,
}

#[derive(Serialize)]
struct MapResponse {
    size: usize,
    seed: u64,
    active: Option<Mode>,
    classified: bool,
    /// Root resolved by a single step, absent otherwise.
    root: Option<(usize, usize)>,
    summary: Summary,
    layers: Vec<Layer>,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, err: impl ToString) -> ApiError {
    (status, Json(ErrorBody { error: err.to_string() }))
}

/// Pixels per cell, chosen so small maps stay visible.
fn layer_scale(size: usize) -> usize {
    (512 / size.max(1)).clamp(1, 64)
}

fn encode_layer(name: &str, rgba: &[u8], side: usize) -> Result<Layer, ApiError> {
    let png = render::encode_png(rgba, side)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(Layer {
        name: name.into(),
        data_url: format!("data:image/png;base64,{}", b64),
    })
}

fn describe(map: &ContinentMap, step: Option<Step>) -> Result<MapResponse, ApiError> {
    let scale = layer_scale(map.size());
    let side = map.size() * scale;
    let layers = vec![
        encode_layer("heightmap", &render::render_heightmap(map.grid(), scale), side)?,
        encode_layer("divide", &render::render_divide(map.grid(), scale), side)?,
    ];
    let root = match step {
        Some(Step::Resolved { root, .. }) => Some(root),
        _ => None,
    };
    Ok(MapResponse {
        size: map.size(),
        seed: map.seed(),
        active: map.active_mode(),
        classified: map.is_classified(),
        root,
        summary: map.summary(),
        layers,
    })
}

/// Run `f` against the map on the blocking pool, holding the lock throughout.
async fn with_map<T, F>(state: &Shared, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut ContinentMap) -> Result<T, ApiError> + Send + 'static,
{
    let mut guard = state.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || f(&mut guard))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
}

async fn generate_handler(
    State(state): State<Shared>,
    Json(params): Json<Params>,
) -> Result<Json<MapResponse>, ApiError> {
    with_map(&state, move |map| {
        let fresh = ContinentMap::new(params)
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;
        *map = fresh;
        describe(map, None)
    })
    .await
    .map(Json)
}

async fn reset_handler(State(state): State<Shared>) -> Result<Json<MapResponse>, ApiError> {
    with_map(&state, |map| {
        map.reset_flow();
        describe(map, None)
    })
    .await
    .map(Json)
}

async fn run_handler(state: Shared, mode: Mode, req: RunRequest) -> Result<Json<MapResponse>, ApiError> {
    with_map(&state, move |map| {
        let step = map
            .run(mode, req.step)
            .map_err(|e| api_error(StatusCode::CONFLICT, e))?;
        describe(map, req.step.then_some(step))
    })
    .await
    .map(Json)
}

async fn uphill_handler(
    State(state): State<Shared>,
    Json(req): Json<RunRequest>,
) -> Result<Json<MapResponse>, ApiError> {
    run_handler(state, Mode::Uphill, req).await
}

async fn downhill_handler(
    State(state): State<Shared>,
    Json(req): Json<RunRequest>,
) -> Result<Json<MapResponse>, ApiError> {
    run_handler(state, Mode::Downhill, req).await
}

async fn cell_handler(
    State(state): State<Shared>,
    Query(q): Query<CellQuery>,
) -> Result<Json<Cell>, ApiError> {
    let map = state.lock().await;
    map.cell_at(q.x, q.y)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("({}, {}) is off the map", q.x, q.y)))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state: Shared = Arc::new(Mutex::new(ContinentMap::illustrative()));

    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/uphill", post(uphill_handler))
        .route("/api/downhill", post(downhill_handler))
        .route("/api/cell", get(cell_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!(%addr, "divide server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
