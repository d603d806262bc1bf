//! API REST pour la gestion des stations.

use std::time::SystemTime;

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use rcstation::{StationId, StationRegistry, StationStatus};

/// Router `/api/stations` combinant les différents endpoints REST.
pub fn station_api_router(registry: StationRegistry) -> Router {
    Router::new()
        .route("/", get(list_stations).post(create_station))
        .route("/{station_id}/tracks/{filename}", post(upload_track))
        .route("/{station_id}/stream", get(stream_station))
        .route("/{station_id}/status", get(station_status))
        .with_state(registry)
}

/// Référence d'une station (utilisée dans les listings et à la création).
#[derive(Debug, Serialize, ToSchema)]
pub struct StationResponse {
    pub id: String,
}

/// Réponse après upload d'une piste.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub station: String,
    pub track: String,
    pub size: u64,
}

/// État instantané d'une station.
#[derive(Debug, Serialize, ToSchema)]
pub struct StationStatusResponse {
    pub id: String,
    pub playing: bool,
    pub current_track: Option<String>,
    pub size: u64,
    pub position_secs: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub queue_len: usize,
    pub listeners: usize,
}

/// Réponse d'erreur REST générique.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/stations",
    tag = "stations",
    responses(
        (status = 200, description = "Liste de toutes les stations", body = [StationResponse])
    )
)]
pub async fn list_stations(State(registry): State<StationRegistry>) -> Response {
    let payload: Vec<StationResponse> = registry
        .list()
        .await
        .into_iter()
        .map(|id| StationResponse { id: id.to_string() })
        .collect();
    (StatusCode::OK, Json(payload)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/stations",
    tag = "stations",
    responses(
        (status = 201, description = "Station créée", body = StationResponse),
        (status = 500, description = "Erreur de stockage", body = ErrorResponse)
    )
)]
pub async fn create_station(State(registry): State<StationRegistry>) -> Response {
    match registry.create_station().await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(StationResponse { id: id.to_string() }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/stations/{station_id}/tracks/{filename}",
    tag = "stations",
    params(
        ("station_id" = String, Path, description = "Identifiant de la station"),
        ("filename" = String, Path, description = "Nom du fichier audio")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Piste uploadée et mise en file", body = UploadResponse),
        (status = 400, description = "Requête invalide", body = ErrorResponse),
        (status = 404, description = "Station introuvable", body = ErrorResponse)
    )
)]
pub async fn upload_track(
    Path((station_id, filename)): Path<(String, String)>,
    State(registry): State<StationRegistry>,
    body: bytes::Bytes,
) -> Response {
    let id = match parse_station_id(&station_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if filename.trim().is_empty() {
        return map_status(
            StatusCode::BAD_REQUEST,
            "INVALID_FILENAME",
            "Track filename cannot be empty",
        );
    }
    if body.is_empty() {
        return map_status(
            StatusCode::BAD_REQUEST,
            "EMPTY_PAYLOAD",
            "Track body cannot be empty",
        );
    }

    match registry.upload_track(id, &filename, body).await {
        Ok(track) => (
            StatusCode::CREATED,
            Json(UploadResponse {
                station: station_id,
                track: track.display_name(),
                size: track.size,
            }),
        )
            .into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/stream",
    tag = "stations",
    params(
        ("station_id" = String, Path, description = "Identifiant de la station")
    ),
    responses(
        (status = 200, description = "Flux audio de la piste en cours", content_type = "audio/mpeg"),
        (status = 404, description = "Station introuvable ou sans piste en cours", body = ErrorResponse)
    )
)]
pub async fn stream_station(
    Path(station_id): Path<String>,
    State(registry): State<StationRegistry>,
) -> Response {
    let id = match parse_station_id(&station_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match registry.join(id).await {
        Ok(session) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "audio/mpeg")
            .body(Body::from_stream(session.into_byte_stream()))
            .unwrap(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/status",
    tag = "stations",
    params(
        ("station_id" = String, Path, description = "Identifiant de la station")
    ),
    responses(
        (status = 200, description = "État instantané de la station", body = StationStatusResponse),
        (status = 404, description = "Station introuvable", body = ErrorResponse)
    )
)]
pub async fn station_status(
    Path(station_id): Path<String>,
    State(registry): State<StationRegistry>,
) -> Response {
    let id = match parse_station_id(&station_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match registry.status(id).await {
        Ok(status) => (StatusCode::OK, Json(StationStatusResponse::from(status))).into_response(),
        Err(err) => map_error(err),
    }
}

impl From<StationStatus> for StationStatusResponse {
    fn from(value: StationStatus) -> Self {
        Self {
            id: value.id.to_string(),
            playing: value.playing,
            current_track: value.current_track.map(|track| track.display_name()),
            size: value.size,
            position_secs: value.position.as_secs(),
            started_at: value.started_at.map(system_time_to_datetime),
            queue_len: value.queue_len,
            listeners: value.listeners,
        }
    }
}

fn system_time_to_datetime(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

fn parse_station_id(raw: &str) -> Result<StationId, Response> {
    raw.parse::<StationId>().map_err(|_| {
        map_status(
            StatusCode::BAD_REQUEST,
            "INVALID_STATION_ID",
            &format!("'{}' is not a valid station id", raw),
        )
    })
}

fn map_status<S: Into<String>>(status: StatusCode, error: &str, message: S) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

fn map_error(error: rcstation::Error) -> Response {
    let status = match error {
        rcstation::Error::StationNotFound(_) | rcstation::Error::NoCurrentTrack(_) => {
            StatusCode::NOT_FOUND
        }
        rcstation::Error::TrackRead { .. }
        | rcstation::Error::UploadWrite { .. }
        | rcstation::Error::Storage(_)
        | rcstation::Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: format!("{:?}", error),
            message: error.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_response_from_idle_station() {
        let status = StationStatus {
            id: uuid::Uuid::new_v4(),
            playing: false,
            current_track: None,
            size: 0,
            position: Duration::ZERO,
            started_at: None,
            queue_len: 0,
            listeners: 0,
        };

        let response = StationStatusResponse::from(status);
        assert!(!response.playing);
        assert!(response.current_track.is_none());
        assert!(response.started_at.is_none());
        assert_eq!(response.position_secs, 0);
    }

    #[test]
    fn test_status_response_from_playing_station() {
        let id = uuid::Uuid::new_v4();
        let status = StationStatus {
            id,
            playing: true,
            current_track: Some(rcstation::TrackRef::new("/tmp/a.mp3", 1000)),
            size: 1000,
            position: Duration::from_secs(42),
            started_at: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
            queue_len: 2,
            listeners: 3,
        };

        let response = StationStatusResponse::from(status);
        assert_eq!(response.id, id.to_string());
        assert_eq!(response.current_track.as_deref(), Some("a.mp3"));
        assert_eq!(response.position_secs, 42);
        assert_eq!(response.queue_len, 2);
        assert_eq!(response.listeners, 3);
        assert!(response.started_at.is_some());
    }

    #[test]
    fn test_invalid_station_id_is_rejected() {
        assert!(parse_station_id("not-a-uuid").is_err());
        assert!(parse_station_id(&uuid::Uuid::new_v4().to_string()).is_ok());
    }
}
