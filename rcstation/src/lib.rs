//! # rcstation - Moteur de diffusion multi-stations
//!
//! Cette crate fournit le cœur de RadioCast :
//! - File FIFO des pistes avec rotation infinie (round-robin)
//! - État de lecture par station (piste courante, taille, position)
//! - Passe de diffusion avec fan-out vers buffer glissant et flux primaire
//! - Sessions d'écoute indépendantes pour les auditeurs tardifs
//! - Registre process-wide des stations
//!
//! # Architecture
//!
//! - **StationRegistry** : carte explicite id -> station, passée aux
//!   opérations (jamais un singleton ambiant)
//! - **Station** : file + état de lecture + auditeurs, mutations
//!   sérialisées par un verrou d'état unique
//! - **ListenerSession** : abonnement éphémère d'une connexion à la
//!   diffusion en cours
//! - **TrackStore** : collaborateur de stockage (voir `rcstorage`)
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use rcstation::{BroadcastSettings, StationRegistry};
//! use std::sync::Arc;
//!
//! # async fn demo(store: Arc<dyn rcstation::TrackStore>) -> rcstation::Result<()> {
//! let registry = StationRegistry::new(store, BroadcastSettings::default());
//!
//! let id = registry.create_station().await?;
//! registry
//!     .upload_track(id, "a.mp3", bytes::Bytes::from_static(b"..."))
//!     .await?;
//!
//! let mut session = registry.join(id).await?;
//! while let Some(chunk) = session.recv().await {
//!     println!("chunk: {} bytes", chunk.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod playback;
mod queue;
mod registry;
mod station;
mod track;

#[cfg(feature = "rcconfig")]
mod config_ext;

/// Identifiant opaque d'une station (jamais réutilisé)
pub type StationId = uuid::Uuid;

// Réexports publics
pub use error::{Error, Result};
pub use playback::{estimated_offset, PlaybackState};
pub use queue::TrackQueue;
pub use registry::StationRegistry;
pub use station::{BroadcastSettings, ListenerSession, Station, StationStatus};
pub use track::{TrackRef, TrackReader, TrackStore};

#[cfg(feature = "rcconfig")]
pub use config_ext::BroadcastConfigExt;
