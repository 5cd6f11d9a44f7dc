// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/ws", web::get().to(handlers::ws_handler))
            .service(
                web::scope("/exercises")
                    .route("/{name}", web::get().to(handlers::get_exercise))
                    .route("/{name}/code", web::put().to(handlers::save_code))
                    .route("/{name}/run", web::post().to(handlers::run_exercise))
                    .route("/{name}/reset", web::post().to(handlers::reset_exercise))
            )
            .service(
                web::scope("/quizzes")
                    .route("/{name}", web::get().to(handlers::get_quiz))
                    .route("/{name}/submit", web::post().to(handlers::submit_quiz))
                    .route("/{name}/reset", web::post().to(handlers::reset_quiz))
            )
    );
}
