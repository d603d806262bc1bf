//! Extension de rcconfig pour le stockage des stations

use std::path::PathBuf;

/// Trait d'extension pour rcconfig::Config
pub trait StorageConfigExt {
    /// Racine du stockage des stations (créée si nécessaire)
    fn station_storage_root(&self) -> PathBuf;
}

impl StorageConfigExt for rcconfig::Config {
    fn station_storage_root(&self) -> PathBuf {
        let root = self
            .get_station_storage_dir()
            .expect("Failed to get or create station storage directory");
        PathBuf::from(root)
    }
}
