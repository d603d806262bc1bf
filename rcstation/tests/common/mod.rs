//! Outillage partagé des tests d'intégration rcstation

use async_trait::async_trait;
use bytes::Bytes;
use rcstation::{
    BroadcastSettings, Error, Result, Station, StationId, TrackReader, TrackRef, TrackStore,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

/// Lecture ouverte par le moteur, pilotée par le test
///
/// Le test écrit dans `writer` pour alimenter le flux correspondant ; le
/// drop de `writer` signale la fin de fichier.
pub struct OpenedRead {
    pub track: TrackRef,
    pub start: u64,
    pub writer: DuplexStream,
}

/// Magasin de test : chaque `open_for_read` crée un duplex dont l'écrivain
/// est remis au test via un canal
pub struct ManualStore {
    sizes: Mutex<HashMap<PathBuf, u64>>,
    preloaded: Mutex<Vec<TrackRef>>,
    fail_writes: Mutex<bool>,
    poisoned: Mutex<HashSet<PathBuf>>,
    opened_tx: mpsc::UnboundedSender<OpenedRead>,
}

impl ManualStore {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OpenedRead>) {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                sizes: Mutex::new(HashMap::new()),
                preloaded: Mutex::new(Vec::new()),
                fail_writes: Mutex::new(false),
                poisoned: Mutex::new(HashSet::new()),
                opened_tx,
            }),
            opened_rx,
        )
    }

    /// Déclare une piste pré-existante, retournée par `list_existing_tracks`
    pub fn preload(&self, name: &str, size: u64) -> TrackRef {
        let track = TrackRef::new(name, size);
        self.sizes
            .lock()
            .unwrap()
            .insert(track.path.clone(), track.size);
        self.preloaded.lock().unwrap().push(track.clone());
        track
    }

    /// Fait échouer tous les `write_track` suivants
    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    /// Les lectures suivantes de cette piste échouent en fin de données au
    /// lieu de signaler une fin de fichier propre
    pub fn poison(&self, name: &str) {
        self.poisoned.lock().unwrap().insert(PathBuf::from(name));
    }
}

/// Lecteur qui transforme la fin de fichier en erreur d'entrée/sortie
struct FailAtEof {
    inner: DuplexStream,
}

impl AsyncRead for FailAtEof {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == before => Poll::Ready(Err(
                std::io::Error::new(std::io::ErrorKind::Other, "injected read failure"),
            )),
            other => other,
        }
    }
}

#[async_trait]
impl TrackStore for ManualStore {
    async fn ensure_station_storage(&self, _station: StationId) -> Result<()> {
        Ok(())
    }

    async fn write_track(
        &self,
        _station: StationId,
        filename: &str,
        data: Bytes,
    ) -> Result<TrackRef> {
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::UploadWrite {
                filename: filename.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "injected write failure"),
            });
        }
        let track = TrackRef::new(filename, data.len() as u64);
        self.sizes
            .lock()
            .unwrap()
            .insert(track.path.clone(), track.size);
        Ok(track)
    }

    async fn list_existing_tracks(&self, _station: StationId) -> Result<Vec<TrackRef>> {
        Ok(self.preloaded.lock().unwrap().clone())
    }

    async fn open_for_read(&self, track: &TrackRef, start_byte: u64) -> Result<TrackReader> {
        let (reader, writer) = tokio::io::duplex(1024 * 1024);
        self.opened_tx
            .send(OpenedRead {
                track: track.clone(),
                start: start_byte,
                writer,
            })
            .map_err(|_| Error::Storage("test harness dropped".into()))?;
        if self.poisoned.lock().unwrap().contains(&track.path) {
            return Ok(Box::new(FailAtEof { inner: reader }));
        }
        Ok(Box::new(reader))
    }

    async fn size_of(&self, track: &TrackRef) -> Result<u64> {
        self.sizes
            .lock()
            .unwrap()
            .get(&track.path)
            .copied()
            .ok_or_else(|| Error::Storage(format!("unknown track: {}", track.path.display())))
    }
}

/// Paramètres sans régulation de débit (les tests pilotent les EOF)
pub fn test_settings() -> BroadcastSettings {
    BroadcastSettings {
        chunk_size: 1024,
        buffer_chunks: 8,
        stream_bitrate: 0,
    }
}

/// Attend que la piste courante porte le nom attendu
pub async fn wait_for_current(station: &Station, expected: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = station.status().await;
        if status
            .current_track
            .as_ref()
            .map(|t| t.display_name() == expected)
            .unwrap_or(false)
        {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for current track {expected}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Attend la prochaine lecture ouverte par le moteur
pub async fn next_opened(opened_rx: &mut mpsc::UnboundedReceiver<OpenedRead>) -> OpenedRead {
    tokio::time::timeout(Duration::from_secs(5), opened_rx.recv())
        .await
        .expect("timed out waiting for an opened read")
        .expect("store dropped")
}
