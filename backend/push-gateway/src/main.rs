use actix_web::{middleware, web, App, HttpServer};
use push_gateway::{handlers, logging, metrics, AppState, Config};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init_tracing(config.log_format);

    tracing::info!("Starting push gateway");

    let state = AppState::from_config(&config)?;
    tracing::info!("WebSocket connection registry initialized");

    let (host, port) = config.bind_addr();
    tracing::info!(host = %host, port, "Starting HTTP server");

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .configure(handlers::register_routes)
    });
    if let Some(workers) = config.http_workers {
        server = server.workers(workers);
    }

    server.bind((host.as_str(), port))?.run().await?;

    tracing::info!("Push gateway stopped");
    Ok(())
}
