// src/api/handlers/mod.rs
mod health;
mod exercises;
mod quizzes;
pub mod ws;

use actix_web::HttpResponse;

use crate::errors::GraderError;
use crate::models::ApiError;

pub use health::health_check;
pub use exercises::{get_exercise, save_code, run_exercise, reset_exercise};
pub use quizzes::{get_quiz, submit_quiz, reset_quiz};
pub use ws::{ws_handler, WsBroker};

/// Maps a crate error onto the HTTP response shown to the client.
pub(crate) fn error_response(e: &GraderError) -> HttpResponse {
    let body = ApiError { error: e.to_string() };
    match e {
        GraderError::ExerciseNotFound(_) | GraderError::QuizNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        GraderError::InvalidSubmission(_) | GraderError::Pattern(_) => {
            HttpResponse::BadRequest().json(body)
        }
        _ => {
            log::error!("Request failed: {}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}
