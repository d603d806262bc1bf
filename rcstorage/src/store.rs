//! FsTrackStore : un répertoire par station

use async_trait::async_trait;
use bytes::Bytes;
use rcstation::{Error, Result, StationId, TrackReader, TrackRef, TrackStore};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tracing::{debug, info};

/// Extensions de fichiers considérées comme jouables
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav"];

/// Stockage filesystem des pistes
pub struct FsTrackStore {
    root: PathBuf,
}

impl FsTrackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn station_dir(&self, station: StationId) -> PathBuf {
        self.root.join(station.to_string())
    }

    /// Rejette les noms vides, les séparateurs de chemin et les fichiers
    /// cachés : le nom d'upload ne doit jamais sortir du répertoire de la
    /// station.
    fn validate_filename(filename: &str) -> Result<()> {
        let valid = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains('/')
            && !filename.contains('\\')
            && !filename.contains("..");
        if valid {
            Ok(())
        } else {
            Err(Error::Storage(format!("invalid track filename: {filename}")))
        }
    }

    fn is_audio_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl TrackStore for FsTrackStore {
    async fn ensure_station_storage(&self, station: StationId) -> Result<()> {
        let dir = self.station_dir(station);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Storage(format!("cannot create {}: {e}", dir.display())))?;
        debug!(station = %station, directory = %dir.display(), "Station storage ready");
        Ok(())
    }

    async fn write_track(
        &self,
        station: StationId,
        filename: &str,
        data: Bytes,
    ) -> Result<TrackRef> {
        Self::validate_filename(filename)?;

        let dir = self.station_dir(station);
        let final_path = dir.join(filename);
        // Écriture en deux temps : un upload interrompu ne devient jamais
        // un fichier jouable
        let tmp_path = dir.join(format!(".{filename}.part"));

        let write_result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&data).await?;
            file.flush().await?;
            fs::rename(&tmp_path, &final_path).await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(source) = write_result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(Error::UploadWrite {
                filename: filename.to_string(),
                source,
            });
        }

        info!(
            station = %station,
            track = filename,
            size = data.len(),
            "Track written"
        );
        Ok(TrackRef::new(final_path, data.len() as u64))
    }

    async fn list_existing_tracks(&self, station: StationId) -> Result<Vec<TrackRef>> {
        let dir = self.station_dir(station);
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| Error::Storage(format!("cannot read {}: {e}", dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            let path = entry.path();
            if Self::is_audio_file(&path) {
                paths.push(path);
            }
        }
        // Ordre stable : tri par nom de fichier
        paths.sort();

        let mut tracks = Vec::with_capacity(paths.len());
        for path in paths {
            let metadata = fs::metadata(&path)
                .await
                .map_err(|e| Error::Storage(format!("cannot stat {}: {e}", path.display())))?;
            tracks.push(TrackRef::new(path, metadata.len()));
        }
        Ok(tracks)
    }

    async fn open_for_read(&self, track: &TrackRef, start_byte: u64) -> Result<TrackReader> {
        let mut file = fs::File::open(&track.path)
            .await
            .map_err(|source| Error::TrackRead {
                track: track.display_name(),
                source,
            })?;

        if start_byte > 0 {
            file.seek(SeekFrom::Start(start_byte))
                .await
                .map_err(|source| Error::TrackRead {
                    track: track.display_name(),
                    source,
                })?;
        }

        Ok(Box::new(file))
    }

    async fn size_of(&self, track: &TrackRef) -> Result<u64> {
        let metadata = fs::metadata(&track.path)
            .await
            .map_err(|source| Error::TrackRead {
                track: track.display_name(),
                source,
            })?;
        Ok(metadata.len())
    }
}
