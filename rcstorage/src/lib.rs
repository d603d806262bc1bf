//! # rcstorage - Stockage filesystem des pistes
//!
//! Implémentation filesystem du collaborateur [`TrackStore`] : un
//! sous-répertoire par station sous la racine configurée, contenant les
//! fichiers audio uploadés. Aucun autre état n'est persisté (file et
//! position de lecture sont en mémoire seulement).

mod store;

#[cfg(feature = "rcconfig")]
mod config_ext;

pub use store::FsTrackStore;

#[cfg(feature = "rcconfig")]
pub use config_ext::StorageConfigExt;
