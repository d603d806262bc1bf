//! # rcserver - Surface HTTP de RadioCast
//!
//! Expose le registre des stations via une API REST documentée :
//! - `POST /api/stations` : créer une station
//! - `GET /api/stations` : lister les stations
//! - `POST /api/stations/{id}/tracks/{filename}` : uploader une piste
//! - `GET /api/stations/{id}/stream` : rejoindre la diffusion en cours
//! - `GET /api/stations/{id}/status` : état instantané
//!
//! La documentation Swagger est servie sur `/swagger-ui`.

mod api;

pub use api::{
    station_api_router, ErrorResponse, StationResponse, StationStatusResponse, UploadResponse,
};

use std::net::SocketAddr;

use axum::Router;
use rcstation::StationRegistry;
use tokio::signal;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::list_stations,
        api::create_station,
        api::upload_track,
        api::stream_station,
        api::station_status,
    ),
    components(schemas(
        api::StationResponse,
        api::UploadResponse,
        api::StationStatusResponse,
        api::ErrorResponse,
    )),
    tags(
        (name = "stations", description = "Gestion et diffusion des stations")
    )
)]
pub struct ApiDoc;

/// Construit le router complet (API + Swagger UI)
pub fn build_router(registry: StationRegistry) -> Router {
    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/stations.json", ApiDoc::openapi());

    Router::new()
        .nest("/api/stations", station_api_router(registry))
        .merge(swagger)
}

/// Démarre le serveur HTTP et bloque jusqu'à Ctrl+C
pub async fn serve(registry: StationRegistry, http_port: u16) -> anyhow::Result<()> {
    let router = build_router(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));

    info!(
        "RadioCast server running at [http://0.0.0.0:{}](http://0.0.0.0:{})",
        http_port, http_port
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Ctrl+C reçu, arrêt gracieux");
        })
        .await?;

    Ok(())
}
