//! Extension de rcconfig pour la diffusion

use crate::station::BroadcastSettings;

/// Trait d'extension pour rcconfig::Config
pub trait BroadcastConfigExt {
    /// Construit les paramètres de diffusion depuis la configuration
    fn broadcast_settings(&self) -> BroadcastSettings;
}

impl BroadcastConfigExt for rcconfig::Config {
    fn broadcast_settings(&self) -> BroadcastSettings {
        BroadcastSettings {
            chunk_size: self.get_chunk_size(),
            buffer_chunks: self.get_buffer_chunks(),
            stream_bitrate: self.get_stream_bitrate(),
        }
    }
}
