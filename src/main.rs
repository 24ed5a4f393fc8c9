use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use dfw_viet_biz::config::AppConfig;
use dfw_viet_biz::database::Database;
use dfw_viet_biz::handlers;
use dfw_viet_biz::state::AppState;

fn startup_error(err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{err}");
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;
    let bind_address = config.bind_address();

    let db = Database::connect(&config.database_url)
        .await
        .map_err(|err| startup_error(format!("Failed to initialize database: {err}")))?;
    log::info!("Database ready, migrations applied");

    let state = AppState::from_config(&config, Arc::new(db)).map_err(startup_error)?;
    let state = web::Data::new(state);

    log::info!("🚀 Starting DFW Vietnamese business directory on {bind_address}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}
