//! État de lecture d'une station
//!
//! Machine à deux états : `Idle` (aucune piste courante) et `Playing`
//! (piste courante, taille connue, horodatage de départ). L'enum interdit
//! par construction tout état partiel incohérent.

use crate::track::TrackRef;
use std::time::{Duration, Instant, SystemTime};

/// État de lecture courant
#[derive(Debug, Clone)]
pub enum PlaybackState {
    /// Rien ne joue, pas de piste courante
    Idle,
    /// Une piste joue depuis `started_at`
    Playing {
        track: TrackRef,
        started_at: Instant,
        started_wall: SystemTime,
    },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }

    /// Piste courante, s'il y en a une
    pub fn current_track(&self) -> Option<&TrackRef> {
        match self {
            PlaybackState::Playing { track, .. } => Some(track),
            PlaybackState::Idle => None,
        }
    }

    /// Taille de la piste courante en octets (0 si idle)
    pub fn current_size(&self) -> u64 {
        self.current_track().map(|t| t.size).unwrap_or(0)
    }

    /// Position de lecture écoulée (zéro si idle, jamais négative)
    pub fn position(&self) -> Duration {
        match self {
            PlaybackState::Playing { started_at, .. } => started_at.elapsed(),
            PlaybackState::Idle => Duration::ZERO,
        }
    }

    /// Horodatage mur du début de lecture
    pub fn started_wall(&self) -> Option<SystemTime> {
        match self {
            PlaybackState::Playing { started_wall, .. } => Some(*started_wall),
            PlaybackState::Idle => None,
        }
    }

    /// Démarre la lecture d'une piste (transition vers `Playing`)
    pub fn start(track: TrackRef) -> Self {
        PlaybackState::Playing {
            track,
            started_at: Instant::now(),
            started_wall: SystemTime::now(),
        }
    }
}

/// Offset de reprise approximatif pour un auditeur qui rejoint en cours de
/// piste
///
/// Heuristique modulo héritée du comportement d'origine : l'offset dépend du
/// temps écoulé et de la taille du fichier, sans viser une position exacte
/// dans le flux canonique. Les auditeurs tardifs ne sont donc pas
/// synchronisés à l'octet près avec la diffusion principale.
pub fn estimated_offset(elapsed: Duration, size: u64) -> u64 {
    if size == 0 {
        return 0;
    }
    (elapsed.as_millis() as u64) % size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_exposes_nothing() {
        let state = PlaybackState::Idle;
        assert!(!state.is_playing());
        assert!(state.current_track().is_none());
        assert_eq!(state.current_size(), 0);
        assert_eq!(state.position(), Duration::ZERO);
    }

    #[test]
    fn test_playing_exposes_track_and_position() {
        let state = PlaybackState::start(TrackRef::new("a.mp3", 100_000));
        assert!(state.is_playing());
        assert_eq!(state.current_size(), 100_000);

        // La position part de zéro et ne régresse jamais
        let p1 = state.position();
        let p2 = state.position();
        assert!(p2 >= p1);
    }

    #[test]
    fn test_estimated_offset_stays_within_track() {
        let size = 100_000;
        for secs in [0u64, 1, 7, 3600] {
            let offset = estimated_offset(Duration::from_secs(secs), size);
            assert!(offset < size);
        }
    }

    #[test]
    fn test_estimated_offset_empty_track() {
        assert_eq!(estimated_offset(Duration::from_secs(10), 0), 0);
    }
}
