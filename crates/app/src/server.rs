//! Actix Web console server exposing the map page, scene snapshots, and query actions.
//!
//! The server runs on a dedicated thread with its own Actix system. Query
//! flows are blocking (the backend client waits on HTTP), so every action is
//! handed to the blocking pool with `web::block`; overlapping actions are
//! resolved by the orchestrator's generation check.

use std::{net::IpAddr, sync::Arc, time::Duration};

use actix_web::{
    App, HttpResponse, HttpServer,
    http::{StatusCode, header},
    web::{self, Bytes},
};
use anyhow::{Context, Result, anyhow};
use async_stream::stream;
use map_query::{GeoPoint, QueryError, QueryOrchestrator, QueryOutcome, SpatialBackend};
use serde::{Deserialize, Serialize};
use serde_json::to_string;
use tracing::{error, info};

use crate::scene::{SceneSurface, SharedScene, snapshot};

pub(crate) type ConsoleBackend = Box<dyn SpatialBackend + Send + Sync>;
pub(crate) type ConsoleOrchestrator = QueryOrchestrator<ConsoleBackend, SceneSurface>;

/// Shared state backing HTTP handlers.
pub(crate) struct ConsoleState {
    pub(crate) orchestrator: Arc<ConsoleOrchestrator>,
    pub(crate) scene: SharedScene,
}

/// Handle for the console server thread.
pub(crate) struct ConsoleServer {
    handle: std::thread::JoinHandle<std::io::Result<()>>,
}

impl ConsoleServer {
    /// Block until the server stops. Actix installs its own Ctrl+C handling,
    /// so this returns after a graceful shutdown or with the bind/run error.
    pub(crate) fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| anyhow!("console server thread panicked"))?
            .context("console server failed")
    }
}

#[derive(Deserialize)]
struct PointForm {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct NearestForm {
    location: String,
}

#[derive(Deserialize)]
struct RangeForm {
    center: String,
    radius_km: String,
}

#[derive(Deserialize)]
struct AreaForm {
    area: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ActionResponse {
    pub(crate) ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) outcome: Option<QueryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

/// Register console routes on an Actix app.
pub(crate) fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_route))
        .route("/overlays", web::get().to(overlays_handler))
        .route("/stream_overlays", web::get().to(stream_overlays_handler))
        .route("/actions/point", web::post().to(add_point_handler))
        .route("/actions/nearest", web::post().to(nearest_handler))
        .route("/actions/range", web::post().to(range_handler))
        .route("/actions/intersection", web::post().to(intersection_handler));
}

/// Spawn the console server thread and return a handle to wait on it.
pub(crate) fn spawn_console_server(
    orchestrator: Arc<ConsoleOrchestrator>,
    scene: SharedScene,
    bind: IpAddr,
    port: u16,
) -> Result<ConsoleServer> {
    let handle = std::thread::Builder::new()
        .name("map-console-server".into())
        .spawn(move || {
            let result = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(ConsoleState {
                            orchestrator: orchestrator.clone(),
                            scene: scene.clone(),
                        }))
                        .configure(configure)
                })
                .bind((bind, port))?
                .run();
                info!("Map console listening on http://{bind}:{port}/");
                server.await
            });
            if let Err(err) = &result {
                error!("HTTP server error: {err}");
            }
            result
        })
        .context("Failed to spawn console server thread")?;
    Ok(ConsoleServer { handle })
}

/// Serve the map console page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(crate::html::console::CONSOLE_HTML)
}

/// Return the current scene as JSON.
async fn overlays_handler(state: web::Data<ConsoleState>) -> HttpResponse {
    HttpResponse::Ok().json(snapshot(&state.scene))
}

/// Stream scene snapshots as Server-Sent Events whenever the revision changes.
async fn stream_overlays_handler(state: web::Data<ConsoleState>) -> HttpResponse {
    let state = state.clone();
    let stream = stream! {
        yield Ok::<Bytes, actix_web::Error>(Bytes::from_static(b"retry: 500\n\n"));
        let mut interval = actix_web::rt::time::interval(Duration::from_millis(250));
        let mut last_revision = None;
        loop {
            interval.tick().await;
            let scene = snapshot(&state.scene);
            if last_revision == Some(scene.revision) {
                yield Ok::<Bytes, actix_web::Error>(Bytes::from_static(b": keep-alive\n\n"));
                continue;
            }
            last_revision = Some(scene.revision);
            match to_string(&scene) {
                Ok(json) => {
                    let mut sse_chunk = String::with_capacity(json.len() + 32);
                    sse_chunk.push_str("id: ");
                    sse_chunk.push_str(&scene.revision.to_string());
                    sse_chunk.push('\n');
                    sse_chunk.push_str("data: ");
                    sse_chunk.push_str(&json);
                    sse_chunk.push_str("\n\n");
                    yield Ok::<Bytes, actix_web::Error>(Bytes::from(sse_chunk));
                }
                Err(err) => {
                    let error_chunk = format!("event: error\ndata: {}\n\n", err);
                    yield Ok::<Bytes, actix_web::Error>(Bytes::from(error_chunk));
                }
            }
        }
    };

    HttpResponse::Ok()
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .append_header(("Cache-Control", "no-cache"))
        .append_header(("Content-Type", "text/event-stream"))
        .append_header(("Connection", "keep-alive"))
        .streaming(stream)
}

async fn add_point_handler(
    state: web::Data<ConsoleState>,
    form: web::Json<PointForm>,
) -> HttpResponse {
    let point = GeoPoint::new(form.lat, form.lng);
    run_action(&state, move |orchestrator| {
        orchestrator.add_point(point).map(|()| None)
    })
    .await
}

async fn nearest_handler(
    state: web::Data<ConsoleState>,
    form: web::Json<NearestForm>,
) -> HttpResponse {
    let form = form.into_inner();
    run_action(&state, move |orchestrator| {
        orchestrator.nearest_neighbor(&form.location).map(Some)
    })
    .await
}

async fn range_handler(state: web::Data<ConsoleState>, form: web::Json<RangeForm>) -> HttpResponse {
    let form = form.into_inner();
    run_action(&state, move |orchestrator| {
        orchestrator
            .range_query(&form.center, &form.radius_km)
            .map(Some)
    })
    .await
}

async fn intersection_handler(
    state: web::Data<ConsoleState>,
    form: web::Json<AreaForm>,
) -> HttpResponse {
    let form = form.into_inner();
    run_action(&state, move |orchestrator| {
        orchestrator.intersection(&form.area).map(Some)
    })
    .await
}

/// Run a query flow on the blocking pool and translate its result into JSON.
async fn run_action<F>(state: &ConsoleState, action: F) -> HttpResponse
where
    F: FnOnce(&ConsoleOrchestrator) -> Result<Option<QueryOutcome>, QueryError> + Send + 'static,
{
    let orchestrator = state.orchestrator.clone();
    match web::block(move || action(orchestrator.as_ref())).await {
        Ok(Ok(outcome)) => HttpResponse::Ok().json(ActionResponse {
            ok: true,
            outcome,
            message: None,
        }),
        Ok(Err(err)) => {
            let status = match err {
                QueryError::Parse(_) => StatusCode::BAD_REQUEST,
                QueryError::Backend(_) => StatusCode::BAD_GATEWAY,
            };
            HttpResponse::build(status).json(ActionResponse {
                ok: false,
                outcome: None,
                message: Some(err.user_message()),
            })
        }
        Err(err) => {
            error!("Query worker failed: {err}");
            HttpResponse::InternalServerError().json(ActionResponse {
                ok: false,
                outcome: None,
                message: Some("internal error".to_string()),
            })
        }
    }
}
