//! Station de radio : file, état de lecture et diffusion
//!
//! Une station possède une unique boucle logique de diffusion : la passe de
//! diffusion lit la piste courante séquentiellement, pousse chaque chunk
//! vers le buffer glissant et le flux primaire, puis déclenche l'avancement
//! en fin de piste. Toutes les mutations (file, piste courante, auditeurs)
//! sont sérialisées par le verrou d'état ; un compteur de génération,
//! incrémenté à chaque transition, garantit qu'une fin de piste ne provoque
//! qu'un seul avancement même quand plusieurs flux se terminent.

use crate::playback::{estimated_offset, PlaybackState};
use crate::queue::TrackQueue;
use crate::track::{TrackRef, TrackStore};
use crate::{Error, Result, StationId};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Paramètres de diffusion d'une station
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Taille des chunks lus puis diffusés (octets)
    pub chunk_size: usize,
    /// Nombre de chunks conservés dans le buffer glissant
    pub buffer_chunks: usize,
    /// Débit nominal de diffusion en bits par seconde (0 = pas de régulation)
    pub stream_bitrate: u64,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            chunk_size: 32 * 1024,
            buffer_chunks: 256,
            stream_bitrate: 128_000,
        }
    }
}

impl BroadcastSettings {
    fn bytes_per_second(&self) -> u64 {
        self.stream_bitrate / 8
    }
}

/// Régulateur de débit d'un flux d'octets
///
/// La source d'origine diffusait à la vitesse du disque ; la passe de
/// diffusion est régulée au débit nominal pour que la position horloge et
/// les arrivées en cours de piste aient un sens.
struct Throttle {
    bytes_per_sec: u64,
    started: Instant,
    sent: u64,
}

impl Throttle {
    fn new(bytes_per_sec: u64) -> Self {
        Self {
            bytes_per_sec,
            started: Instant::now(),
            sent: 0,
        }
    }

    async fn pace(&mut self, len: usize) {
        if self.bytes_per_sec == 0 {
            return;
        }
        self.sent += len as u64;
        let due = Duration::from_secs_f64(self.sent as f64 / self.bytes_per_sec as f64);
        let elapsed = self.started.elapsed();
        if due > elapsed {
            tokio::time::sleep(due - elapsed).await;
        }
    }
}

/// État interne d'une station (discipline mono-écrivain via le Mutex)
struct StationState {
    queue: TrackQueue,
    playback: PlaybackState,
    /// Incrémenté à chaque transition Idle/Playing ou changement de piste
    generation: u64,
    /// Sessions d'écoute actives (identifiants)
    listeners: Vec<u64>,
    next_listener_id: u64,
    /// Buffer glissant des derniers chunks diffusés
    buffer: VecDeque<Bytes>,
}

struct StationInner {
    id: StationId,
    store: Arc<dyn TrackStore>,
    settings: BroadcastSettings,
    state: Mutex<StationState>,
    /// Flux primaire : diffusion canonique, abonnable
    feed_tx: broadcast::Sender<Bytes>,
    /// Publie la génération courante (fermeture des sessions en fin de piste)
    gen_tx: watch::Sender<u64>,
}

/// Handle public d'une station
#[derive(Clone)]
pub struct Station {
    inner: Arc<StationInner>,
}

impl std::fmt::Debug for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Station").field("id", &self.inner.id).finish()
    }
}

/// Snapshot de l'état d'une station (lecture pure)
#[derive(Debug, Clone)]
pub struct StationStatus {
    pub id: StationId,
    pub playing: bool,
    pub current_track: Option<TrackRef>,
    pub size: u64,
    pub position: Duration,
    pub started_at: Option<SystemTime>,
    pub queue_len: usize,
    pub listeners: usize,
}

impl Station {
    pub(crate) fn new(
        id: StationId,
        store: Arc<dyn TrackStore>,
        settings: BroadcastSettings,
    ) -> Self {
        let (feed_tx, _) = broadcast::channel(settings.buffer_chunks.max(1));
        let (gen_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(StationInner {
                id,
                store,
                settings,
                state: Mutex::new(StationState {
                    queue: TrackQueue::new(),
                    playback: PlaybackState::Idle,
                    generation: 0,
                    listeners: Vec::new(),
                    next_listener_id: 0,
                    buffer: VecDeque::new(),
                }),
                feed_tx,
                gen_tx,
            }),
        }
    }

    pub fn id(&self) -> StationId {
        self.inner.id
    }

    /// Ajoute une piste à la station
    ///
    /// Effet de bord documenté : sur une station idle, la première piste
    /// ajoutée démarre immédiatement la lecture au lieu d'être mise en
    /// attente.
    pub async fn enqueue(&self, track: TrackRef) {
        let mut state = self.inner.state.lock().await;

        // Invariant : une piste n'est jamais à la fois courante et en attente
        let already_current = state
            .playback
            .current_track()
            .map(|c| c.path == track.path)
            .unwrap_or(false);
        if already_current || state.queue.contains(&track) {
            debug!(
                station = %self.inner.id,
                track = %track.display_name(),
                "Track already current or queued, ignoring enqueue"
            );
            return;
        }

        if state.playback.is_playing() {
            state.queue.push_back(track);
        } else {
            self.start_playing(&mut state, track);
        }
    }

    /// Transition Idle -> Playing : démarre une passe de diffusion
    fn start_playing(&self, state: &mut StationState, track: TrackRef) {
        info!(
            station = %self.inner.id,
            track = %track.display_name(),
            size = track.size,
            "Starting broadcast"
        );
        state.playback = PlaybackState::start(track.clone());
        state.generation += 1;
        let generation = state.generation;
        let _ = self.inner.gen_tx.send(generation);

        let station = self.clone();
        tokio::spawn(async move {
            station.broadcast_pass(track, generation).await;
        });
    }

    /// Passe de diffusion : lecture séquentielle de la piste courante
    ///
    /// Chaque chunk alimente le buffer glissant puis le flux primaire. Une
    /// erreur de lecture abandonne la passe sans retenter (lacune connue de
    /// la conception d'origine). Une passe périmée (la génération a changé)
    /// s'arrête sans avancer une seconde fois.
    // Récursion asynchrone (via `advance_if_current`) : le futur doit être
    // boxé pour que le compilateur puisse prouver qu'il est `Send`.
    fn broadcast_pass(
        self,
        track: TrackRef,
        generation: u64,
    ) -> futures::future::BoxFuture<'static, ()> {
        Box::pin(async move {
        let mut reader = match self.inner.store.open_for_read(&track, 0).await {
            Ok(reader) => reader,
            Err(err) => {
                error!(
                    station = %self.inner.id,
                    track = %track.display_name(),
                    "Failed to open track for broadcast: {}",
                    err
                );
                return;
            }
        };

        let mut throttle = Throttle::new(self.inner.settings.bytes_per_second());
        let mut buf = vec![0u8; self.inner.settings.chunk_size.max(1)];

        loop {
            if *self.inner.gen_tx.borrow() != generation {
                // La station a progressé entre-temps, passe périmée
                return;
            }

            let read = match reader.read(&mut buf).await {
                Ok(read) => read,
                Err(err) => {
                    error!(
                        station = %self.inner.id,
                        track = %track.display_name(),
                        "Read error during broadcast, abandoning pass: {}",
                        err
                    );
                    return;
                }
            };

            if read == 0 {
                break;
            }

            let chunk = Bytes::copy_from_slice(&buf[..read]);

            {
                let mut state = self.inner.state.lock().await;
                if state.generation != generation {
                    return;
                }
                state.buffer.push_back(chunk.clone());
                while state.buffer.len() > self.inner.settings.buffer_chunks {
                    state.buffer.pop_front();
                }
            }

            // Flux primaire : ignoré s'il n'y a aucun abonné
            let _ = self.inner.feed_tx.send(chunk);

            throttle.pace(read).await;
        }

        debug!(
            station = %self.inner.id,
            track = %track.display_name(),
            "Track exhausted"
        );
        self.advance_if_current(generation).await;
        })
    }

    /// Avancement : requeue la piste courante, passe à la suivante ou à Idle
    ///
    /// Ne fait rien si la génération a changé depuis le début de la passe
    /// (exactement un avancement par fin de piste). Toutes les sessions
    /// actives sont fermées via le canal de génération.
    pub(crate) async fn advance_if_current(&self, generation: u64) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            return false;
        }

        // Boucle infinie : la piste terminée repart en queue
        if let Some(current) = state.playback.current_track().cloned() {
            state.queue.push_back(current);
        }

        state.generation += 1;
        let next_generation = state.generation;
        state.listeners.clear();

        match state.queue.pop_front() {
            Some(next) => {
                info!(
                    station = %self.inner.id,
                    track = %next.display_name(),
                    "Advancing to next track"
                );
                state.playback = PlaybackState::start(next.clone());
                let _ = self.inner.gen_tx.send(next_generation);

                let station = self.clone();
                tokio::spawn(async move {
                    station.broadcast_pass(next, next_generation).await;
                });
            }
            None => {
                info!(station = %self.inner.id, "Queue empty, station going idle");
                state.playback = PlaybackState::Idle;
                let _ = self.inner.gen_tx.send(next_generation);
            }
        }

        true
    }

    /// Crée une session d'écoute sur la diffusion en cours
    ///
    /// Une station idle retourne `NoCurrentTrack` : un auditeur ne reste
    /// jamais bloqué sur un flux vide. Un auditeur qui rejoint en cours de
    /// piste reçoit une lecture indépendante de la piste courante, démarrée
    /// à un offset approximatif (voir [`estimated_offset`]), jusqu'à la fin
    /// de la piste.
    pub async fn join(&self) -> Result<ListenerSession> {
        let (track, offset, generation, listener_id) = {
            let mut state = self.inner.state.lock().await;
            let track = match state.playback.current_track() {
                Some(track) => track.clone(),
                None => return Err(Error::NoCurrentTrack(self.inner.id)),
            };
            let offset = estimated_offset(state.playback.position(), track.size);
            state.next_listener_id += 1;
            let listener_id = state.next_listener_id;
            state.listeners.push(listener_id);
            (track, offset, state.generation, listener_id)
        };

        debug!(
            station = %self.inner.id,
            listener = listener_id,
            track = %track.display_name(),
            offset,
            "Listener joined"
        );

        let (tx, rx) = mpsc::channel(self.inner.settings.buffer_chunks.max(1));
        let station = self.clone();
        tokio::spawn(async move {
            station
                .pump_listener(track, offset, generation, listener_id, tx)
                .await;
        });

        Ok(ListenerSession {
            guard: DetachGuard {
                station: self.clone(),
                id: listener_id,
            },
            rx,
        })
    }

    /// Alimente la session d'un auditeur par une lecture indépendante
    ///
    /// S'arrête à la fin du fichier, à la déconnexion de l'auditeur, ou dès
    /// que la station change de piste (canal de génération). En fin de
    /// fichier, déclenche l'avancement si la station n'a pas déjà progressé.
    async fn pump_listener(
        self,
        track: TrackRef,
        offset: u64,
        generation: u64,
        listener_id: u64,
        tx: mpsc::Sender<Bytes>,
    ) {
        let mut gen_rx = self.inner.gen_tx.subscribe();
        if *gen_rx.borrow() != generation {
            self.detach(listener_id).await;
            return;
        }

        let mut reader = match self.inner.store.open_for_read(&track, offset).await {
            Ok(reader) => reader,
            Err(err) => {
                error!(
                    station = %self.inner.id,
                    listener = listener_id,
                    track = %track.display_name(),
                    "Failed to open track for listener: {}",
                    err
                );
                self.detach(listener_id).await;
                return;
            }
        };

        let mut throttle = Throttle::new(self.inner.settings.bytes_per_second());
        let mut buf = vec![0u8; self.inner.settings.chunk_size.max(1)];

        let exhausted = loop {
            let read = tokio::select! {
                changed = gen_rx.changed() => {
                    // Fin de piste côté station : clôture de la session
                    let _ = changed;
                    break false;
                }
                read = reader.read(&mut buf) => match read {
                    Ok(0) => break true,
                    Ok(read) => read,
                    Err(err) => {
                        warn!(
                            station = %self.inner.id,
                            listener = listener_id,
                            "Read error on listener stream: {}",
                            err
                        );
                        break false;
                    }
                },
            };

            let chunk = Bytes::copy_from_slice(&buf[..read]);
            tokio::select! {
                changed = gen_rx.changed() => {
                    let _ = changed;
                    break false;
                }
                sent = tx.send(chunk) => {
                    if sent.is_err() {
                        // Auditeur déconnecté : n'affecte ni la diffusion ni
                        // les autres sessions
                        break false;
                    }
                }
            }

            throttle.pace(read).await;
        };

        drop(tx); // clôt le flux de l'auditeur
        self.detach(listener_id).await;

        if exhausted {
            debug!(
                station = %self.inner.id,
                listener = listener_id,
                "Listener stream exhausted, requesting advancement"
            );
            self.advance_if_current(generation).await;
        }
    }

    /// Retire une session du registre des auditeurs (idempotent)
    pub(crate) async fn detach(&self, listener_id: u64) {
        let mut state = self.inner.state.lock().await;
        state.listeners.retain(|id| *id != listener_id);
    }

    /// S'abonne au flux primaire (diffusion canonique)
    ///
    /// Les sessions d'écoute HTTP sont servies par [`Station::join`] via des
    /// lectures indépendantes ; le flux primaire n'a pas de consommateur en
    /// production et sert aux tests et au diagnostic.
    pub fn subscribe_feed(&self) -> broadcast::Receiver<Bytes> {
        self.inner.feed_tx.subscribe()
    }

    /// Snapshot complet de l'état (lecture pure, état toujours committé)
    pub async fn status(&self) -> StationStatus {
        let state = self.inner.state.lock().await;
        StationStatus {
            id: self.inner.id,
            playing: state.playback.is_playing(),
            current_track: state.playback.current_track().cloned(),
            size: state.playback.current_size(),
            position: state.playback.position(),
            started_at: state.playback.started_wall(),
            queue_len: state.queue.len(),
            listeners: state.listeners.len(),
        }
    }

    /// Piste courante (`None` si idle)
    pub async fn current_file(&self) -> Option<TrackRef> {
        self.inner.state.lock().await.playback.current_track().cloned()
    }

    /// Taille de la piste courante (0 si idle)
    pub async fn current_file_size(&self) -> u64 {
        self.inner.state.lock().await.playback.current_size()
    }

    /// Position de lecture écoulée (zéro si idle)
    pub async fn current_position(&self) -> Duration {
        self.inner.state.lock().await.playback.position()
    }

    /// Pistes en attente (snapshot)
    pub async fn queue_snapshot(&self) -> Vec<TrackRef> {
        self.inner.state.lock().await.queue.snapshot()
    }

    /// Nombre de chunks retenus dans le buffer glissant
    pub async fn buffered_chunks(&self) -> usize {
        self.inner.state.lock().await.buffer.len()
    }
}

/// Détache la session du registre des auditeurs à la destruction
struct DetachGuard {
    station: Station,
    id: u64,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        let station = self.station.clone();
        let id = self.id;
        tokio::spawn(async move {
            station.detach(id).await;
        });
    }
}

/// Session d'écoute d'un auditeur connecté
///
/// Éphémère : détruite à la déconnexion ou à la fin de la piste courante.
/// La destruction désenregistre automatiquement la session sans perturber
/// la diffusion ni les autres auditeurs.
pub struct ListenerSession {
    guard: DetachGuard,
    rx: mpsc::Receiver<Bytes>,
}

impl ListenerSession {
    /// Identifiant de la station écoutée
    pub fn station_id(&self) -> StationId {
        self.guard.station.id()
    }

    /// Reçoit le prochain chunk (`None` = flux terminé)
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Convertit la session en flux d'octets (pour un body HTTP chunké)
    ///
    /// Le flux est fini : il se termine quand la piste courante s'achève ou
    /// quand la session est fermée côté station.
    pub fn into_byte_stream(self) -> BoxStream<'static, std::io::Result<Bytes>> {
        let guard = self.guard;
        ReceiverStream::new(self.rx)
            .map(move |chunk| {
                let _guard = &guard;
                Ok(chunk)
            })
            .boxed()
    }
}
