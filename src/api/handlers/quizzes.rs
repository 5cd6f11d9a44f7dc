// src/api/handlers/quizzes.rs
use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;

use super::error_response;
use crate::api::AppState;
use crate::errors::GraderError;
use crate::quiz::{QuizAnswer, QuizWidget};
use crate::widget::Widget;

fn quiz(state: &AppState, name: &str) -> std::result::Result<QuizWidget, GraderError> {
    let definition = state
        .catalog
        .quiz(name)
        .ok_or_else(|| GraderError::QuizNotFound(name.to_string()))?;
    Ok(QuizWidget::new(definition.clone(), Arc::clone(&state.store)))
}

/// GET /api/v1/quizzes/{name}
pub async fn get_quiz(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let widget = match quiz(&state, &path.into_inner()) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.render().await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// POST /api/v1/quizzes/{name}/submit
pub async fn submit_quiz(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<QuizAnswer>,
) -> Result<HttpResponse> {
    let widget = match quiz(&state, &path.into_inner()) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.handle_submit(req.into_inner()).await {
        Ok(feedback) => Ok(HttpResponse::Ok().json(feedback)),
        Err(e) => Ok(error_response(&e)),
    }
}

/// POST /api/v1/quizzes/{name}/reset
pub async fn reset_quiz(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let widget = match quiz(&state, &path.into_inner()) {
        Ok(widget) => widget,
        Err(e) => return Ok(error_response(&e)),
    };
    match widget.handle_reset().await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        Err(e) => Ok(error_response(&e)),
    }
}
