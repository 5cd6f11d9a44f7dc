// src/api/handlers/exercises.rs
use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;
use uuid::Uuid;

use super::error_response;
use super::ws::{WsBroker, WsSink};
use crate::api::AppState;
use crate::errors::GraderError;
use crate::exercise::CodeExercise;
use crate::models::{CodeRequest, RunResponse};
use crate::runner::{NullSink, ReportSink};
use crate::widget::Widget;

fn exercise(
    state: &AppState,
    name: &str,
    sink: Arc<dyn ReportSink>,
) -> std::result::Result<CodeExercise, GraderError> {
    let config = state
        .catalog
        .exercise(name)
        .ok_or_else(|| GraderError::ExerciseNotFound(name.to_string()))?;
    Ok(CodeExercise::from_config(
        config,
        Arc::clone(&state.store),
        state.runner.clone(),
        sink,
    ))
}

/// GET /api/v1/exercises/{name}
pub async fn get_exercise(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let widget = match exercise(&state, &name, Arc::new(NullSink)) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.render().await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// PUT /api/v1/exercises/{name}/code
pub async fn save_code(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<CodeRequest>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let widget = match exercise(&state, &name, Arc::new(NullSink)) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.save_code(&req.code).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(error_response(&e)),
    }
}

/// POST /api/v1/exercises/{name}/run
pub async fn run_exercise(
    state: web::Data<AppState>,
    broker: web::Data<WsBroker>,
    path: web::Path<String>,
    req: web::Json<CodeRequest>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let run_id = Uuid::new_v4().to_string();
    let sink = WsSink::new(broker.get_ref().clone(), run_id.clone(), name.clone());

    let widget = match exercise(&state, &name, Arc::new(sink)) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };

    log::info!("Running exercise {} (run {})", name, run_id);
    match widget.handle_submit(req.into_inner().code).await {
        Ok(report) => Ok(HttpResponse::Ok().json(RunResponse::new(run_id, name, report))),
        Err(e) => Ok(error_response(&e)),
    }
}

/// POST /api/v1/exercises/{name}/reset
pub async fn reset_exercise(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let widget = match exercise(&state, &name, Arc::new(NullSink)) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.handle_reset().await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(e) => Ok(error_response(&e)),
    }
}
