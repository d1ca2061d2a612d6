use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tcb_autosave::{FileStorage, SnapshotStorage};
use tcb_config::{extract_editable_sections, EditableSection};
use tcb_core::{ConfigStore, EditorConfig, EditorSession, FsConfigStore, SaveOptions};
use tcb_deps::EntityKind;
use tcb_test_utils::{programs_edit, sample_config, TENANT};

#[tokio::test]
async fn test_session_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsConfigStore::new(dir.path().join("configs")));
    store
        .save_config(TENANT, &sample_config(), SaveOptions::default())
        .await
        .unwrap();

    let snapshots = Arc::new(FileStorage::new(dir.path().join("autosave")));
    let config = EditorConfig::default().with_backup_on_deploy(false);
    let mut session = EditorSession::open(TENANT, store.clone(), snapshots.clone(), config)
        .await
        .unwrap();

    session
        .update(EntityKind::Program, "p1", json!({"program_id": "p1", "name": "Mentoring+"}))
        .unwrap();
    assert!(session.flush_on_exit());
    assert!(snapshots.get("tcb-autosave-acme").unwrap().is_some());

    session.deploy().await.unwrap();
    assert!(snapshots.get("tcb-autosave-acme").unwrap().is_none());
    assert!(store.list_backups(TENANT).await.unwrap().is_empty());

    let meta = store.get_metadata(TENANT).await.unwrap();
    assert_eq!(meta.read_only_fingerprint, sample_config().read_only_fingerprint());

    let editable = store.load_config(TENANT, true).await.unwrap();
    let full = store.load_config(TENANT, false).await.unwrap();
    assert_eq!(editable, extract_editable_sections(&full));
    assert_eq!(
        editable.entities(EditableSection::Programs)["p1"]["name"],
        json!("Mentoring+")
    );
}

#[tokio::test]
async fn test_server_side_merge_ignores_read_only_in_payload() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsConfigStore::new(dir.path());
    store
        .save_config(TENANT, &sample_config(), SaveOptions::default())
        .await
        .unwrap();

    let mut edits = programs_edit(&["p7"]);
    edits.insert("branding", json!({"color": "red"}));
    store
        .save_config(TENANT, &edits, SaveOptions::default().with_merge(true))
        .await
        .unwrap();

    let stored = store.load_config(TENANT, false).await.unwrap();
    assert_eq!(stored.get("branding"), sample_config().get("branding"));
    let programs = stored.entities(EditableSection::Programs);
    assert_eq!(programs.keys().collect::<Vec<_>>(), ["p7"]);
    assert_eq!(store.list_backups(TENANT).await.unwrap().len(), 1);
}
