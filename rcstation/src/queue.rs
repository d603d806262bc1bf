//! File FIFO des pistes en attente d'une station

use crate::track::TrackRef;
use std::collections::VecDeque;

/// File ordonnée des pistes en attente (ordre d'insertion = ordre de lecture)
#[derive(Debug, Default)]
pub struct TrackQueue {
    tracks: VecDeque<TrackRef>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self {
            tracks: VecDeque::new(),
        }
    }

    /// Ajoute une piste en queue
    pub fn push_back(&mut self, track: TrackRef) {
        self.tracks.push_back(track);
    }

    /// Retire et retourne la tête de file
    ///
    /// `None` signifie « rien à jouer », ce n'est pas une erreur.
    pub fn pop_front(&mut self) -> Option<TrackRef> {
        self.tracks.pop_front()
    }

    /// Vérifie si une piste est déjà en attente (même chemin)
    pub fn contains(&self, track: &TrackRef) -> bool {
        self.tracks.iter().any(|t| t.path == track.path)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Snapshot de toutes les pistes en attente
    pub fn snapshot(&self) -> Vec<TrackRef> {
        self.tracks.iter().cloned().collect()
    }
}
