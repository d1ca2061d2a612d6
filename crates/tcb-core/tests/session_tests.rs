use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tcb_autosave::{AutoSaveSnapshot, MemoryStorage, SnapshotStorage};
use tcb_config::{verify_read_only_preserved, EditableSection};
use tcb_core::{ConfigStore, EditorConfig, EditorSession, MemoryConfigStore, SessionError};
use tcb_deps::EntityKind;
use tcb_entity::{CrudError, DeleteOutcome, EditorState};
use tcb_test_utils::{minimal_config, sample_config, ConfigBuilder, TENANT};

const SNAPSHOT_KEY: &str = "tcb-autosave-acme";

fn store_with(config: tcb_config::TenantConfig) -> Arc<MemoryConfigStore> {
    let store = Arc::new(MemoryConfigStore::new());
    store.seed(TENANT, config).unwrap();
    store
}

async fn open(store: &Arc<MemoryConfigStore>, snapshots: &Arc<MemoryStorage>) -> EditorSession {
    EditorSession::open(TENANT, store.clone(), snapshots.clone(), EditorConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_added_program_survives_merge_and_diff() {
    let store = store_with(minimal_config(TENANT));
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    session
        .create(EntityKind::Program, json!({"program_id": "p2", "name": "Tutoring"}))
        .unwrap();

    let merged = session.merged_config();
    assert_eq!(merged.get("branding"), Some(&json!({"color": "blue"})));
    let programs = merged.entities(EditableSection::Programs);
    let ids: Vec<&String> = programs.keys().collect();
    assert_eq!(ids, ["p1", "p2"]);
    assert!(verify_read_only_preserved(session.base(), &merged));

    let diff = session.config_diff();
    assert!(diff.has_changes);
    assert_eq!(diff.section(EditableSection::Programs).unwrap().added, ["p2"]);
}

#[tokio::test]
async fn test_reordering_showcase_is_a_deployable_change() {
    let config = ConfigBuilder::new(TENANT)
        .showcase(json!([{"id": "s1"}, {"id": "s2"}]))
        .build();
    let store = store_with(config);
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    session.set_content_showcase(vec![json!({"id": "s2"}), json!({"id": "s1"})]);
    assert!(session.has_unsaved_changes());

    let diff = session.config_diff();
    assert!(diff.has_changes);
    assert!(diff.section(EditableSection::ContentShowcase).unwrap().reordered);
}

#[tokio::test]
async fn test_referenced_cta_needs_confirmation_and_leaves_dangling_reference() {
    let store = store_with(sample_config());
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    let report = session
        .get_dependencies(EditableSection::CtaDefinitions, "cta2")
        .unwrap();
    assert!(report.contains(EntityKind::Branch, "b1"));

    let outcome = session.request_delete(EntityKind::Cta, "cta2").unwrap();
    assert!(matches!(outcome, DeleteOutcome::NeedsConfirmation(_)));
    assert!(session.entities(EntityKind::Cta).contains_key("cta2"));
    assert!(!session.has_unsaved_changes());

    assert_eq!(session.confirm_delete(EntityKind::Cta).unwrap(), "cta2");
    assert!(!session.entities(EntityKind::Cta).contains_key("cta2"));
    assert_eq!(
        session.entities(EntityKind::Branch)["b1"]["available_ctas"]["secondary"],
        json!(["cta2"])
    );

    session.deploy().await.unwrap();
    let stored = store.load_config(TENANT, false).await.unwrap();
    assert!(!stored.entities(EditableSection::CtaDefinitions).contains_key("cta2"));
    assert_eq!(
        stored.entities(EditableSection::ConversationBranches)["b1"]["available_ctas"]["secondary"],
        json!(["cta2"])
    );
}

#[tokio::test]
async fn test_cancelled_deletion_keeps_entity() {
    let store = store_with(sample_config());
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    session.request_delete(EntityKind::Form, "f1").unwrap();
    let pending = session.cancel_delete(EntityKind::Form).unwrap();
    assert_eq!(pending.id, "f1");

    let err = session.confirm_delete(EntityKind::Form).unwrap_err();
    assert!(matches!(err.as_crud(), Some(CrudError::NoPendingDeletion { .. })));
    assert!(session.entities(EntityKind::Form).contains_key("f1"));
}

#[tokio::test]
async fn test_deploy_keeps_read_only_and_stamps_document() {
    let store = store_with(sample_config());
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    session.set_metadata("chat_title", json!("Acme Help")).unwrap();
    session.set_content_showcase(vec![json!({"id": "s2", "title": "Fall drive"})]);
    let result = session.deploy().await.unwrap();
    assert!(result.success);

    let stored = store.load_config(TENANT, false).await.unwrap();
    assert!(verify_read_only_preserved(&sample_config(), &stored));
    assert_eq!(stored.get("chat_title"), Some(&json!("Acme Help")));
    assert_eq!(stored.tenant_id(), Some(TENANT));
    assert_ne!(stored.get("generated_at"), sample_config().get("generated_at"));
    assert!(stored.get("last_updated").is_some());
    assert_eq!(store.list_backups(TENANT).await.unwrap().len(), 1);
    assert_eq!(session.base(), &stored);
}

#[tokio::test]
async fn test_missing_tenant_fails_to_open() {
    let store: Arc<dyn ConfigStore> = Arc::new(MemoryConfigStore::new());
    let snapshots = Arc::new(MemoryStorage::new());
    let err = EditorSession::open(TENANT, store, snapshots, EditorConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Store(e) if e.is_not_found()));
}

#[tokio::test(start_paused = true)]
async fn test_unsaved_edits_are_recovered_until_deployed() {
    let store = store_with(minimal_config(TENANT));
    let snapshots = Arc::new(MemoryStorage::new());

    {
        let mut session = open(&store, &snapshots).await;
        assert!(!session.recovered_from_autosave());
        session.create(EntityKind::Program, json!({"program_id": "p2"})).unwrap();
        session.create(EntityKind::Program, json!({"program_id": "p3"})).unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(snapshots.write_count(), 1);
    }

    let mut session = open(&store, &snapshots).await;
    assert!(session.recovered_from_autosave());
    assert!(session.has_unsaved_changes());
    assert_eq!(session.entities(EntityKind::Program).len(), 3);

    session.deploy().await.unwrap();
    assert!(!snapshots.contains(SNAPSHOT_KEY));

    let session = open(&store, &snapshots).await;
    assert!(!session.recovered_from_autosave());
    assert_eq!(session.entities(EntityKind::Program).len(), 3);
}

#[tokio::test]
async fn test_snapshot_of_other_tenant_is_ignored() {
    let store = store_with(minimal_config(TENANT));
    let snapshots = Arc::new(MemoryStorage::new());
    let mut foreign = EditorState::new();
    foreign.set_content_showcase(vec![json!({"id": "x"})]);
    let snapshot = AutoSaveSnapshot::capture("someone-else", &foreign);
    snapshots
        .set(SNAPSHOT_KEY, &serde_json::to_string(&snapshot).unwrap())
        .unwrap();

    let session = open(&store, &snapshots).await;
    assert!(!session.recovered_from_autosave());
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.state(), &EditorState::from_config(&minimal_config(TENANT)));
    assert!(snapshots.contains(SNAPSHOT_KEY));
}

#[tokio::test]
async fn test_flush_on_exit_writes_without_waiting() {
    let store = store_with(minimal_config(TENANT));
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    assert!(!session.flush_on_exit());
    session.create(EntityKind::Program, json!({"program_id": "p2"})).unwrap();
    assert!(session.flush_on_exit());

    let stored: AutoSaveSnapshot =
        serde_json::from_str(&snapshots.get(SNAPSHOT_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.tenant_id, TENANT);
    assert!(stored.programs.contains_key("p2"));
}

#[tokio::test]
async fn test_events_report_every_outcome() {
    let store = store_with(sample_config());
    let snapshots = Arc::new(MemoryStorage::new());
    let mut session = open(&store, &snapshots).await;

    session.create(EntityKind::Cta, json!({"cta_id": "cta3", "label": "Donate"})).unwrap();
    session.update(EntityKind::Cta, "cta9", json!({})).unwrap_err();
    session.request_delete(EntityKind::Cta, "cta3").unwrap();

    let events = session.events();
    assert_eq!(events.len(), 3);
    assert!(!events[0].is_error());
    assert!(events[1].is_error());
    assert!(!events[2].is_error());
}
