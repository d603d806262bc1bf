use std::sync::Arc;

use rcconfig::get_config;
use rcstation::{BroadcastConfigExt, StationRegistry};
use rcstorage::{FsTrackStore, StorageConfigExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = get_config();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ========== PHASE 1 : Stockage ==========

    info!("📦 Initializing track storage...");
    let storage_root = config.station_storage_root();
    info!("  Storage root: {}", storage_root.display());
    let store = Arc::new(FsTrackStore::new(storage_root));

    // ========== PHASE 2 : Registre des stations ==========

    info!("📻 Creating station registry...");
    let settings = config.broadcast_settings();
    info!(
        "  chunk_size={} buffer_chunks={} stream_bitrate={}",
        settings.chunk_size, settings.buffer_chunks, settings.stream_bitrate
    );
    let registry = StationRegistry::new(store, settings);

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    info!("✅ RadioCast is ready!");
    info!("Press Ctrl+C to stop...");
    rcserver::serve(registry, config.get_http_port()).await?;

    Ok(())
}
