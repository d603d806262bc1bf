//! Référence de piste et collaborateur de stockage
//!
//! Le cœur ne construit jamais de chemins lui-même : toutes les opérations
//! sur les fichiers passent par le trait [`TrackStore`], fourni par la
//! couche de stockage (voir `rcstorage` pour l'implémentation filesystem).

use crate::{Result, StationId};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::AsyncRead;

/// Lecteur de piste (flux d'octets avec longueur restante connue)
pub type TrackReader = Box<dyn AsyncRead + Send + Unpin>;

/// Référence vers un fichier audio stocké
///
/// Établie quand le fichier devient jouable : à la fin d'un upload réussi,
/// ou lors de la découverte des fichiers pré-existants d'une station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    pub path: PathBuf,
    pub size: u64,
}

impl TrackRef {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }

    /// Nom de fichier de la piste (chemin complet si non décomposable)
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Collaborateur de stockage des pistes
///
/// Une implémentation gère un répertoire par station et expose les fichiers
/// uploadés comme des flux d'octets.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Prépare le stockage d'une station (répertoire, etc.)
    async fn ensure_station_storage(&self, station: StationId) -> Result<()>;

    /// Écrit un fichier uploadé et retourne sa référence
    ///
    /// Un échec d'écriture ne doit jamais laisser de fichier partiel
    /// jouable.
    async fn write_track(
        &self,
        station: StationId,
        filename: &str,
        data: Bytes,
    ) -> Result<TrackRef>;

    /// Liste les pistes déjà présentes pour une station (ordre stable)
    async fn list_existing_tracks(&self, station: StationId) -> Result<Vec<TrackRef>>;

    /// Ouvre une piste en lecture à partir de `start_byte`
    async fn open_for_read(&self, track: &TrackRef, start_byte: u64) -> Result<TrackReader>;

    /// Taille actuelle d'une piste en octets
    async fn size_of(&self, track: &TrackRef) -> Result<u64>;
}
