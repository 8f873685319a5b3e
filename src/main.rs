use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use exam_prep_server::{
    app_state::AppState,
    config::Config,
    graphql::create_schema,
    handlers::{graphiql, graphql, health_check, health_check_ready},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    if !cfg!(debug_assertions) {
        config.validate_for_production();
    }
    let bind_address = (config.web_server_host.clone(), config.web_server_port);

    let state = AppState::new(config)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let schema = create_schema(state.clone());

    log::info!(
        "Starting HTTP server on {}:{} (GraphiQL at /graphiql)",
        bind_address.0,
        bind_address.1
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(schema.clone()))
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .service(graphql)
            .service(graphiql)
            .service(health_check)
            .service(health_check_ready)
    })
    .bind(bind_address)?
    .run()
    .await
}
