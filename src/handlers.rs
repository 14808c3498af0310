use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::Stream;
use log::{error, info};
use serde_json::json;
use tokio::sync::{broadcast, watch};

use crate::checker::{DiagnosticReport, ScheduleChecker};
use crate::dataset::SchedulingDataSet;
use crate::error::SchedulerError;
use crate::ga::optimizer::GeneticOptimizer;
use crate::ga::repair::repair_conflicts;
use crate::models::{
    CheckRequest, HealthResponse, OptimizationProgress, ScheduleRequest, ScheduleResponse,
};

#[derive(Clone)]
pub struct AppState {
    pub status_tx: broadcast::Sender<OptimizationProgress>,
    pub stop_tx: watch::Sender<bool>,
}

type ClientError = (StatusCode, Json<serde_json::Value>);

fn client_error(err: SchedulerError) -> ClientError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "message": err.to_string() })),
    )
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "API is running. Send scheduling data to /schedule/generate.".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stop_handler(State(state): State<AppState>) -> Response {
    state.stop_tx.send_replace(true);
    Json(json!({ "success": true })).into_response()
}

pub async fn status_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>> + 'static> {
    let mut rx = state.status_tx.subscribe();

    let stream = async_stream::stream! {
        while let Ok(status) = rx.recv().await {
            match serde_json::to_string(&status) {
                Ok(data) => {
                    yield Ok(Event::default().data(data).event("status"));
                }
                Err(e) => error!("serialization error: {e}"),
            }
        }
    };

    Sse::new(stream)
}

pub async fn generate_handler(
    State(state): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ClientError> {
    let config = req.config.unwrap_or_default();
    config.validate().map_err(client_error)?;

    let data = SchedulingDataSet::build(&req.data).map_err(client_error)?;
    info!(
        "data set loaded: {} rooms, {} course-division pairs, {} days",
        req.data.rooms.len(),
        data.pairs().len(),
        data.days().len()
    );

    // rearm the stop flag for this run
    state.stop_tx.send_replace(false);
    let stop_rx = state.stop_tx.subscribe();
    let status_tx = state.status_tx.clone();

    let started = std::time::Instant::now();
    let (fitness_score, generations_run, schedule, warnings, repair) =
        tokio::task::spawn_blocking(move || {
            let mut engine = GeneticOptimizer::new(&data, config);
            let outcome = engine.run(Some(&status_tx), Some(&stop_rx));

            let mut best = outcome.best;
            let repair = repair_conflicts(&mut best, &data);
            let schedule = crate::ga::format_schedule(&best, &data);

            let mut warnings = data.warnings().to_vec();
            if !repair.residual.is_empty() {
                warnings.push(format!(
                    "{} room conflicts remain after repair",
                    repair.residual.len()
                ));
            }
            (
                outcome.best_fitness,
                outcome.generations_run,
                schedule,
                warnings,
                repair,
            )
        })
        .await
        .map_err(|e| {
            error!("scheduling task failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "internal scheduling failure" })),
            )
        })?;

    info!(
        "schedule ready: fitness {fitness_score:.2}, {} sessions, {} repaired",
        schedule.len(),
        repair.resolved
    );

    Ok(Json(ScheduleResponse {
        success: true,
        message: format!(
            "schedule generated in {:.2}s",
            started.elapsed().as_secs_f64()
        ),
        total_assignments: schedule.len(),
        schedule,
        fitness_score,
        generations_run,
        warnings,
        residual_conflicts: repair.residual,
    }))
}

pub async fn check_handler(
    Json(req): Json<CheckRequest>,
) -> Result<Json<DiagnosticReport>, ClientError> {
    let report = ScheduleChecker::analyze(&req.sessions).map_err(client_error)?;
    Ok(Json(report))
}
