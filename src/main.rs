use actix_web::{web, App, HttpServer, middleware};
use actix_cors::Cors;
use std::sync::Arc;

use exercise_grader::api::{configure_routes, handlers::WsBroker, AppState};
use exercise_grader::banner;
use exercise_grader::config::{AppConfig, Catalog};
use exercise_grader::database::SqliteStore;
use exercise_grader::sandbox::PythonSandbox;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Print the startup banner
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  Warning: Could not load .env file: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let catalog = match &app_config.catalog_path {
        Some(path) => {
            log::info!("Loading catalog from {}", path.display());
            Catalog::load(path)
        }
        None => {
            log::info!("GRADER_CATALOG not set, using the built-in catalog");
            Catalog::builtin()
        }
    }
    .map_err(std::io::Error::other)?;
    log::info!(
        "Catalog has {} exercises and {} quizzes",
        catalog.exercises.len(),
        catalog.quizzes.len()
    );

    let store = SqliteStore::open(&app_config.storage_path)
        .await
        .map_err(std::io::Error::other)?;

    let sandbox = PythonSandbox::new(app_config.python.clone());
    let state = AppState::new(catalog, Arc::new(store), Arc::new(sandbox));
    let broker = WsBroker::new();

    println!("🚀 Starting server on {}", app_config.bind);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(broker.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(app_config.bind.as_str())?
    .run()
    .await
}
