use std::env;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chart_views::{ChartSpec, PayloadRange, SiteFilter};
use dashboard_shell::{AppContext, ControlEvent, ControlState, Dashboard, ViewId};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use launch_data::Dataset;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

const BIND_ADDR_ENV: &str = "LAUNCHBOARD_ADDR";
const DATASET_PATH_ENV: &str = "LAUNCHBOARD_DATA";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8051";
const DEFAULT_DATASET_PATH: &str = "data/launch_records.csv";
const STATIC_DIR: &str = "backend/static";

#[derive(Clone)]
struct ServerState {
    ctx: AppContext,
}

/// Optional overrides for the stateless /api/charts endpoint.
#[derive(Debug, Deserialize)]
struct ChartsParams {
    site: Option<String>,
    low: Option<f64>,
    high: Option<f64>,
}

/// One recomputed chart pushed to the renderer.
#[derive(Debug, Serialize)]
struct ChartUpdate {
    view: ViewId,
    chart: ChartSpec,
}

fn params_to_state(ctx: &AppContext, params: &ChartsParams) -> ControlState {
    let dataset = ctx.dataset();
    let mut state = ControlState::defaults(dataset);
    if let Some(site) = &params.site {
        state.site = SiteFilter::from_value(site);
    }
    let low = params.low.unwrap_or(dataset.min_payload());
    let high = params.high.unwrap_or(dataset.max_payload());
    state.payload_range =
        PayloadRange::new(low, high).normalized(dataset.min_payload(), dataset.max_payload());
    state
}

async fn controls(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.ctx.surface().clone())
}

/// Both charts for the given (or default) control values, in one response.
async fn charts(
    State(state): State<ServerState>,
    Query(params): Query<ChartsParams>,
) -> impl IntoResponse {
    let control_state = params_to_state(&state.ctx, &params);
    let dashboard = Dashboard::with_state(state.ctx.clone(), control_state);
    let mut pending: Vec<(ViewId, ChartSpec)> = Vec::new();
    dashboard.render_all(&mut pending);
    let updates: Vec<ChartUpdate> = pending
        .into_iter()
        .map(|(view, chart)| ChartUpdate { view, chart })
        .collect();
    Json(updates)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(stream: WebSocket, state: ServerState) {
    let (mut sender, mut receiver) = stream.split();

    // Per-connection session: each renderer owns its own control state,
    // sharing only the immutable dataset.
    let mut dashboard = Dashboard::new(state.ctx.clone());
    let mut pending: Vec<(ViewId, ChartSpec)> = Vec::new();

    // Initial paint with the default control values.
    dashboard.render_all(&mut pending);
    if send_updates(&mut sender, &mut pending).await.is_err() {
        return;
    }

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => break,
        };
        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<ControlEvent>(&text) {
                Ok(event) => {
                    debug!(?event, "control event");
                    dashboard.apply(&event, &mut pending);
                    if send_updates(&mut sender, &mut pending).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    // Malformed events are dropped; the session stays up.
                    warn!("ignoring malformed control event: {err}");
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
}

async fn send_updates(
    sender: &mut SplitSink<WebSocket, WsMessage>,
    pending: &mut Vec<(ViewId, ChartSpec)>,
) -> Result<(), axum::Error> {
    for (view, chart) in pending.drain(..) {
        if let Ok(text) = serde_json::to_string(&ChartUpdate { view, chart }) {
            sender.send(WsMessage::Text(text)).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_path =
        env::var(DATASET_PATH_ENV).unwrap_or_else(|_| DEFAULT_DATASET_PATH.to_string());
    let dataset = match Dataset::from_csv_path(&data_path) {
        Ok(dataset) => dataset,
        Err(err) => {
            error!("cannot load dataset from {data_path}: {err}");
            std::process::exit(1);
        }
    };
    info!(
        rows = dataset.len(),
        sites = dataset.sites().len(),
        min_payload = dataset.min_payload(),
        max_payload = dataset.max_payload(),
        "dataset loaded"
    );

    let state = ServerState {
        ctx: AppContext::new(Arc::new(dataset)),
    };

    let app = Router::new()
        .route("/api/controls", get(controls))
        .route("/api/charts", get(charts))
        .route("/api/ws", get(ws_handler))
        .fallback_service(ServeDir::new(STATIC_DIR))
        .with_state(state);

    let addr = env::var(BIND_ADDR_ENV).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    info!("dashboard listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("bind");
    axum::serve(listener, app).await.expect("serve");
}
