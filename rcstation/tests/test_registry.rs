//! Tests d'intégration du registre des stations

mod common;

use bytes::Bytes;
use common::{next_opened, test_settings, ManualStore};
use rcstation::{Error, StationRegistry};

#[tokio::test]
async fn test_unknown_station_is_rejected_everywhere() {
    let (store, _opened_rx) = ManualStore::new();
    let registry = StationRegistry::new(store, test_settings());
    let unknown = uuid::Uuid::new_v4();

    assert!(matches!(
        registry.status(unknown).await,
        Err(Error::StationNotFound(id)) if id == unknown
    ));
    assert!(matches!(
        registry.join(unknown).await.err(),
        Some(Error::StationNotFound(_))
    ));
    assert!(matches!(
        registry
            .upload_track(unknown, "a.mp3", Bytes::from_static(b"x"))
            .await,
        Err(Error::StationNotFound(_))
    ));
}

#[tokio::test]
async fn test_station_ids_are_unique_and_listed() {
    let (store, _opened_rx) = ManualStore::new();
    let registry = StationRegistry::new(store, test_settings());

    let first = registry.create_station().await.unwrap();
    let second = registry.create_station().await.unwrap();
    assert_ne!(first, second);

    let mut listed = registry.list().await;
    listed.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_create_station_discovers_existing_tracks() {
    let (store, mut opened_rx) = ManualStore::new();
    store.preload("old-1.mp3", 100);
    store.preload("old-2.mp3", 200);

    let registry = StationRegistry::new(store, test_settings());
    let id = registry.create_station().await.unwrap();

    // Les pistes découvertes démarrent immédiatement la lecture
    let status = registry.status(id).await.unwrap();
    assert!(status.playing);
    assert_eq!(status.current_track.unwrap().display_name(), "old-1.mp3");
    assert_eq!(status.queue_len, 1);

    let opened = next_opened(&mut opened_rx).await;
    assert_eq!(opened.track.display_name(), "old-1.mp3");
    assert_eq!(opened.start, 0);
}

#[tokio::test]
async fn test_failed_upload_enqueues_nothing() {
    let (store, mut opened_rx) = ManualStore::new();
    store.fail_writes();

    let registry = StationRegistry::new(store, test_settings());
    let id = registry.create_station().await.unwrap();

    let result = registry
        .upload_track(id, "a.mp3", Bytes::from_static(b"xxxx"))
        .await;
    assert!(matches!(result, Err(Error::UploadWrite { .. })));

    // Rien n'est enfilé et la station reste idle : aucune lecture ouverte
    let status = registry.status(id).await.unwrap();
    assert!(!status.playing);
    assert!(status.current_track.is_none());
    assert_eq!(status.queue_len, 0);
    assert!(opened_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stations_are_isolated() {
    let (store, mut opened_rx) = ManualStore::new();
    let registry = StationRegistry::new(store, test_settings());

    let first = registry.create_station().await.unwrap();
    let second = registry.create_station().await.unwrap();

    registry
        .upload_track(first, "a.mp3", Bytes::from(vec![0u8; 100]))
        .await
        .unwrap();
    let _pass = next_opened(&mut opened_rx).await;

    // L'autre station reste idle : aucun état partagé
    let status = registry.status(second).await.unwrap();
    assert!(!status.playing);
    assert!(matches!(
        registry.join(second).await.err(),
        Some(Error::NoCurrentTrack(_))
    ));
}
