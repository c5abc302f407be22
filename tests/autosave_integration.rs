//! Autosave behavior against real and recording stores

mod common;

use common::builders::test_catalog;
use common::mock_helpers::RecordingStore;
use common::{definition, sample_graph};
use locol_graph::autosave::{DirectoryStore, VersionId};
use locol_graph::{
    AutosaveScheduler, AutosavedGraph, ComponentKind, ConfigGraph, ConfigValue, SaveStatus, Stage,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const DEBOUNCE: Duration = Duration::from_secs(2);

fn autosaved(store: Arc<RecordingStore>) -> AutosavedGraph {
    let handle = AutosaveScheduler::spawn(store, "edge", DEBOUNCE);
    AutosavedGraph::new(ConfigGraph::new("v0.91.0"), handle)
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_saves_once_after_quiet_period() {
    let store = Arc::new(RecordingStore::new());
    let mut graph = autosaved(store.clone());
    let start = Instant::now();

    graph.edit(|g| g.add_pipeline("traces")).unwrap();
    sleep(Duration::from_secs(1)).await;
    graph.edit(|g| g.add_pipeline("metrics")).unwrap();
    sleep(Duration::from_secs(5)).await;

    let saves = store.saves();
    assert_eq!(saves.len(), 1);
    let elapsed = saves[0].at - start;
    assert!(
        elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100),
        "saved after {:?}",
        elapsed
    );
    assert!(saves[0].autosave);
    assert_eq!(saves[0].collector_id, "edge");
    assert!(saves[0].document.contains("metrics: {}"));
    assert_eq!(store.current(), Some(VersionId(1)));
    assert_eq!(graph.save_status(), Some(SaveStatus::Saved { version: VersionId(1) }));

    graph.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_rejected_edits_do_not_schedule() {
    let store = Arc::new(RecordingStore::new());
    let mut graph = autosaved(store.clone());

    graph.edit(|g| g.add_pipeline("traces")).unwrap();
    sleep(Duration::from_secs(3)).await;
    assert_eq!(store.saves().len(), 1);

    // duplicate pipeline name is rejected and leaves the generation alone
    assert!(graph.edit(|g| g.add_pipeline("traces")).is_err());
    sleep(Duration::from_secs(3)).await;
    assert_eq!(store.saves().len(), 1);

    graph.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_failure_then_recovery() {
    let store = Arc::new(RecordingStore::new());
    store.set_failing(true);
    let mut graph = autosaved(store.clone());

    graph.edit(|g| g.add_pipeline("traces")).unwrap();
    sleep(Duration::from_secs(3)).await;
    assert!(matches!(graph.save_status(), Some(SaveStatus::Failed { .. })));
    assert!(store.saves().is_empty());

    // failed saves are not retried on their own
    sleep(Duration::from_secs(10)).await;
    assert!(store.saves().is_empty());

    store.set_failing(false);
    graph.edit(|g| g.add_pipeline("logs")).unwrap();
    sleep(Duration::from_secs(3)).await;

    let saves = store.saves();
    assert_eq!(saves.len(), 1);
    assert!(saves[0].document.contains("logs: {}"));
    assert!(saves[0].document.contains("traces: {}"));
    assert_eq!(graph.save_status(), Some(SaveStatus::Saved { version: VersionId(1) }));

    graph.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_edits_during_save_are_saved_afterwards() {
    let store = Arc::new(RecordingStore::with_latency(Duration::from_secs(1)));
    let mut graph = autosaved(store.clone());
    let mut status = graph.subscribe().unwrap();

    graph.edit(|g| g.add_pipeline("traces")).unwrap();
    // wait for the first save to start
    while *status.borrow_and_update() != SaveStatus::Saving {
        status.changed().await.unwrap();
    }
    graph.edit(|g| g.add_pipeline("metrics")).unwrap();
    sleep(Duration::from_secs(10)).await;

    let saves = store.saves();
    assert_eq!(saves.len(), 2);
    assert!(!saves[0].document.contains("metrics"));
    assert!(saves[1].document.contains("metrics: {}"));
    assert!(saves[1].at - saves[0].at >= DEBOUNCE);

    graph.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_flushes_pending_change() {
    let store = Arc::new(RecordingStore::new());
    let mut graph = autosaved(store.clone());
    let start = Instant::now();

    graph.edit(|g| g.add_pipeline("traces")).unwrap();
    let graph = graph.close().await;

    let saves = store.saves();
    assert_eq!(saves.len(), 1);
    assert!(saves[0].at - start < DEBOUNCE);
    assert!(graph.pipeline_by_name("traces").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_close_without_changes_saves_nothing() {
    let store = Arc::new(RecordingStore::new());
    let graph = autosaved(store.clone());
    sleep(Duration::from_secs(5)).await;
    graph.close().await;
    assert!(store.saves().is_empty());
}

#[tokio::test]
async fn test_directory_store_receives_autosaves() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(DirectoryStore::new(dir.path()));
    let handle = AutosaveScheduler::spawn(store.clone(), "default", Duration::from_millis(20));
    let mut graph = AutosavedGraph::new(sample_graph(), handle);

    let catalog = test_catalog();
    let debug = definition(&catalog, ComponentKind::Exporter, "debug");
    graph.edit(|g| {
        let traces = g.pipeline_by_name("traces").unwrap().id;
        let id = g.create_instance(debug, "verbose").id;
        g.set_value(id, "verbosity", ConfigValue::from("basic")).unwrap();
        g.attach(id, traces, Stage::Exporters).unwrap();
    });
    let graph = graph.close().await;

    let versions = store.versions("default").await.unwrap();
    assert_eq!(versions, vec![(VersionId(1), true)]);
    assert!(dir.path().join("default").join("000001.autosave.yaml").exists());
    assert_eq!(store.current("default").await.unwrap(), Some(VersionId(1)));

    let saved = store.load("default", VersionId(1)).await.unwrap();
    assert_eq!(saved, locol_graph::document::to_yaml(&graph).unwrap());
    assert!(saved.contains("debug/verbose:\n    verbosity: basic\n"));

    let reloaded = locol_graph::document::from_yaml(&saved, &catalog).unwrap();
    assert!(reloaded.graph_eq(&graph));
}
