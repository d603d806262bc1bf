//! StationRegistry : carte process-wide des stations
//!
//! Le registre est un objet explicite construit une fois au démarrage puis
//! passé à toutes les opérations (état axum, tests), jamais un singleton
//! ambiant. La carte est en ajout seul : aucune suppression de station.

use crate::station::{BroadcastSettings, ListenerSession, Station, StationStatus};
use crate::track::{TrackRef, TrackStore};
use crate::{Error, Result, StationId};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

struct RegistryInner {
    stations: RwLock<HashMap<StationId, Station>>,
    store: Arc<dyn TrackStore>,
    settings: BroadcastSettings,
}

/// Registre central des stations
#[derive(Clone)]
pub struct StationRegistry {
    inner: Arc<RegistryInner>,
}

impl StationRegistry {
    pub fn new(store: Arc<dyn TrackStore>, settings: BroadcastSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                stations: RwLock::new(HashMap::new()),
                store,
                settings,
            }),
        }
    }

    /// Crée une nouvelle station
    ///
    /// Initialise le stockage côté collaborateur, puis enfile les pistes
    /// pré-existantes découvertes pour cet identifiant : s'il y en a, la
    /// lecture démarre immédiatement.
    pub async fn create_station(&self) -> Result<StationId> {
        let id = StationId::new_v4();
        self.inner.store.ensure_station_storage(id).await?;

        let station = Station::new(id, self.inner.store.clone(), self.inner.settings.clone());

        {
            let mut stations = self.inner.stations.write().await;
            stations.insert(id, station.clone());
        }

        // Pistes déjà présentes pour cette station
        let existing = self.inner.store.list_existing_tracks(id).await?;
        let discovered = existing.len();
        for track in existing {
            station.enqueue(track).await;
        }

        info!(station = %id, discovered, "Created new station");
        Ok(id)
    }

    /// Unique chemin d'accès à une station
    pub async fn get(&self, id: StationId) -> Result<Station> {
        let stations = self.inner.stations.read().await;
        stations
            .get(&id)
            .cloned()
            .ok_or(Error::StationNotFound(id))
    }

    /// Liste les identifiants de toutes les stations
    pub async fn list(&self) -> Vec<StationId> {
        let stations = self.inner.stations.read().await;
        stations.keys().copied().collect()
    }

    /// Upload d'une piste vers une station
    ///
    /// La piste n'est enfilée que si l'écriture a entièrement réussi : un
    /// fichier partiel ne devient jamais jouable. Sur une station idle,
    /// l'upload déclenche le démarrage de la lecture.
    pub async fn upload_track(
        &self,
        id: StationId,
        filename: &str,
        data: Bytes,
    ) -> Result<TrackRef> {
        let station = self.get(id).await?;
        let track = self.inner.store.write_track(id, filename, data).await?;
        station.enqueue(track.clone()).await;
        Ok(track)
    }

    /// Rejoint la diffusion en direct d'une station
    pub async fn join(&self, id: StationId) -> Result<ListenerSession> {
        self.get(id).await?.join().await
    }

    /// Statut d'une station (lecture pure)
    pub async fn status(&self, id: StationId) -> Result<StationStatus> {
        Ok(self.get(id).await?.status().await)
    }
}
