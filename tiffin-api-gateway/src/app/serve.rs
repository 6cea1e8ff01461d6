use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;
use crate::handlers::{AppState, router};

fn cors(config: &Config) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let Some(origin) = &config.cors_origin else {
        return Ok(CorsLayer::permissive());
    };
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

pub async fn main(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(&config);

    let mut app: Router = router(state);
    if let Some(dir) = &config.static_dir {
        // Unknown paths fall through to the single-page app.
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
        info!(dir = %dir.display(), "serving static files");
    }
    let app = app.layer(cors(&config)?).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Tiffin API listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
