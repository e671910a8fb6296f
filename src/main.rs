use std::io;

use actix_web::{middleware, web, App, HttpServer};
use covidvax::{
    api,
    booking::BookingService,
    config::Config,
    store::{initialize_db_pool, PgStore},
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(config.default_log_filter()));

    // initialize DB pool outside of `HttpServer::new` so that it is shared across all workers
    let pool = initialize_db_pool(&config.database_url, config.pool_size)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("database pool: {}", e)))?;
    let service = web::Data::new(BookingService::new(PgStore::new(pool)));

    log::info!("starting HTTP server at http://{}", config.listen);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Logger::default())
            .configure(api::configure::<PgStore>)
    })
    .bind(config.listen.as_str())?
    .run()
    .await
}
