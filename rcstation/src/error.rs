//! Types d'erreurs pour rcstation

use crate::StationId;

/// Erreurs de gestion des stations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Station not found: {0}")]
    StationNotFound(StationId),

    #[error("No current track for station: {0}")]
    NoCurrentTrack(StationId),

    #[error("Failed to read track {track}: {source}")]
    TrackRead {
        track: String,
        source: std::io::Error,
    },

    #[error("Failed to write uploaded track {filename}: {source}")]
    UploadWrite {
        filename: String,
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type Result spécialisé pour rcstation
pub type Result<T> = std::result::Result<T, Error>;
