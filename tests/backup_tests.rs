use confkeep::{
    backup_device, maybe_store, run_backup, BackupConfig, BackupError, DeviceOutcome,
    DeviceReport, Platform, RunReport, RunTimestamp, SnapshotDecision, StatusUpdate,
};
use std::sync::Arc;
use test_utils::{RecordingStore, ScriptedConnector};


fn entry_for<'a>(report: &'a RunReport, address: &str) -> &'a DeviceReport {
    report
        .entries
        .iter()
        .find(|e| e.address == address)
        .unwrap()
}

#[tokio::test]
async fn first_poll_always_stores() {
    let store = RecordingStore::new().with_device("core-sw-1", "10.0.0.1", Platform::Ios);
    let config = BackupConfig::default();

    let decision = maybe_store(&store, &config, "core-sw-1", &Platform::Ios, "hostname R1\n")
        .await
        .unwrap();

    assert_eq!(decision, SnapshotDecision::FirstSnapshot);
    assert_eq!(store.config_write_count("core-sw-1"), 1);
    assert_eq!(store.stored_config("core-sw-1").as_deref(), Some("hostname R1\n"));
}

#[tokio::test]
async fn identical_configs_rewrite_the_snapshot() {
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .with_previous_config("core-sw-1", "interface Gi0/1\n!");
    let config = BackupConfig::default();

    let decision = maybe_store(
        &store,
        &config,
        "core-sw-1",
        &Platform::Ios,
        "interface Gi0/1\n!",
    )
    .await
    .unwrap();

    // An unchanged configuration is written again, not skipped
    assert_eq!(decision, SnapshotDecision::Rewritten);
    assert_eq!(store.config_write_count("core-sw-1"), 1);
}

#[tokio::test]
async fn changed_configs_withhold_the_snapshot() {
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .with_previous_config("core-sw-1", "hostname R1");
    let config = BackupConfig::default();

    let decision = maybe_store(&store, &config, "core-sw-1", &Platform::Ios, "hostname R2")
        .await
        .unwrap();

    // A detected change performs no store call at all
    assert_eq!(decision, SnapshotDecision::ChangeDetected);
    assert_eq!(store.config_write_count("core-sw-1"), 0);
    assert_eq!(store.stored_config("core-sw-1").as_deref(), Some("hostname R1"));
}

#[tokio::test]
async fn normalization_applies_to_both_sides_of_the_comparison() {
    // The stored snapshot still carries a clock-period line; the fresh
    // candidate does not. Normalized views must match.
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .with_previous_config("core-sw-1", "hostname R1\nntp clock-period 17208078\n!\n");
    let config = BackupConfig::default();

    let decision = maybe_store(
        &store,
        &config,
        "core-sw-1",
        &Platform::Ios,
        "hostname R1\n!\n",
    )
    .await
    .unwrap();

    assert_eq!(decision, SnapshotDecision::Rewritten);
    assert_eq!(store.config_write_count("core-sw-1"), 1);
}

#[tokio::test]
async fn raw_candidate_is_persisted_not_the_normalized_view() {
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .with_previous_config("core-sw-1", "hostname R1\n");
    let config = BackupConfig::default();

    let candidate = "ntp clock-period 17208078\nhostname R1\n";
    let decision = maybe_store(&store, &config, "core-sw-1", &Platform::Ios, candidate)
        .await
        .unwrap();

    assert_eq!(decision, SnapshotDecision::Rewritten);
    assert_eq!(store.stored_config("core-sw-1").as_deref(), Some(candidate));
}

#[tokio::test]
async fn successful_device_writes_one_status_and_one_snapshot() {
    let connector = ScriptedConnector::new().succeeds("10.0.0.1", "core-sw-1", "hostname core\n");
    let store = RecordingStore::new().with_device("core-sw-1", "10.0.0.1", Platform::Ios);
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "10.0.0.1",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(
        entry.outcome,
        DeviceOutcome::Completed(SnapshotDecision::FirstSnapshot)
    ));
    assert_eq!(entry.device_id.as_deref(), Some("core-sw-1"));
    assert_eq!(entry.hostname.as_deref(), Some("core-sw-1"));

    let statuses = store.status_writes_for("core-sw-1");
    assert_eq!(statuses.len(), 1);
    match &statuses[0] {
        StatusUpdate::Success(env) => {
            assert_eq!(env.connection_status, "Ok");
            assert_eq!(env.connection_driver, "ios");
            assert_eq!(env.timestamp, timestamp.to_string());
        }
        other => panic!("expected a success status, got {:?}", other),
    }
    assert_eq!(store.config_write_count("core-sw-1"), 1);
}

#[tokio::test]
async fn connection_failure_records_exactly_one_failure_status() {
    let connector = ScriptedConnector::new().fails("10.0.0.1");
    let store = RecordingStore::new().with_device("core-sw-1", "10.0.0.1", Platform::Ios);
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "10.0.0.1",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(
        entry.outcome,
        DeviceOutcome::Failed(BackupError::Connect(_))
    ));

    let statuses = store.status_writes_for("core-sw-1");
    assert_eq!(statuses.len(), 1);
    assert!(matches!(
        &statuses[0],
        StatusUpdate::Failure { timestamp: t } if *t == timestamp.to_string()
    ));
    // No snapshot logic runs after a connection failure
    assert_eq!(store.total_config_writes(), 0);
}

#[tokio::test]
async fn invalid_address_is_skipped_with_no_records() {
    let connector = ScriptedConnector::new();
    let store = RecordingStore::new().with_device("core-sw-1", "10.0.0.1", Platform::Ios);
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "not-an-ip",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(entry.outcome, DeviceOutcome::Skipped));
    assert_eq!(entry.device_id, None);
    assert_eq!(store.total_status_writes(), 0);
    assert_eq!(store.total_config_writes(), 0);
}

#[tokio::test]
async fn unresolved_address_is_a_hard_device_error() {
    let connector = ScriptedConnector::new().succeeds("10.0.0.9", "ghost", "hostname ghost\n");
    let store = RecordingStore::new();
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "10.0.0.9",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(
        entry.outcome,
        DeviceOutcome::Failed(BackupError::UnresolvedDevice { .. })
    ));
    // Without a directory entry there is nowhere to record status
    assert_eq!(store.total_status_writes(), 0);
}

#[tokio::test]
async fn status_write_failure_stops_that_device() {
    let connector = ScriptedConnector::new().succeeds("10.0.0.1", "core-sw-1", "hostname core\n");
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .fail_status_writes();
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "10.0.0.1",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(
        entry.outcome,
        DeviceOutcome::Failed(BackupError::Store(_))
    ));
    // The snapshot gateway never ran
    assert_eq!(store.total_config_writes(), 0);
}

#[tokio::test]
async fn snapshot_write_failure_is_reported_after_status() {
    let connector = ScriptedConnector::new().succeeds("10.0.0.1", "core-sw-1", "hostname core\n");
    let store = RecordingStore::new()
        .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
        .fail_config_writes();
    let config = BackupConfig::default();
    let timestamp = RunTimestamp::now();

    let entry = backup_device(
        &connector,
        &store,
        &config,
        &timestamp,
        "10.0.0.1",
        &Platform::Ios,
    )
    .await;

    assert!(matches!(
        entry.outcome,
        DeviceOutcome::Failed(BackupError::Store(_))
    ));
    // The status row for the attempt still landed
    assert_eq!(store.status_writes_for("core-sw-1").len(), 1);
}

#[tokio::test]
async fn one_failing_device_never_blocks_the_others() {
    let connector = ScriptedConnector::new()
        .fails("10.0.0.1")
        .succeeds("10.0.0.2", "edge-fw-1", "set system host-name edge\n");
    let store = Arc::new(
        RecordingStore::new()
            .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
            .with_device("edge-fw-1", "10.0.0.2", Platform::Junos),
    );

    let report = run_backup(
        Arc::new(connector),
        store.clone(),
        Arc::new(BackupConfig::default()),
    )
    .await
    .unwrap();

    assert_eq!(report.entries.len(), 2);
    assert!(matches!(
        entry_for(&report, "10.0.0.1").outcome,
        DeviceOutcome::Failed(_)
    ));
    assert!(matches!(
        entry_for(&report, "10.0.0.2").outcome,
        DeviceOutcome::Completed(SnapshotDecision::FirstSnapshot)
    ));

    // The healthy device's writes all landed
    assert_eq!(store.config_write_count("edge-fw-1"), 1);
    assert_eq!(store.status_writes_for("edge-fw-1").len(), 1);
    assert_eq!(store.status_writes_for("core-sw-1").len(), 1);
}

#[tokio::test]
async fn panicking_device_task_is_contained() {
    let connector = ScriptedConnector::new()
        .panics("10.0.0.1")
        .succeeds("10.0.0.2", "edge-fw-1", "set system host-name edge\n");
    let store = Arc::new(
        RecordingStore::new()
            .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
            .with_device("edge-fw-1", "10.0.0.2", Platform::Junos),
    );

    let report = run_backup(
        Arc::new(connector),
        store.clone(),
        Arc::new(BackupConfig::default()),
    )
    .await
    .unwrap();

    assert!(matches!(
        entry_for(&report, "10.0.0.1").outcome,
        DeviceOutcome::Failed(BackupError::TaskJoin(_))
    ));
    assert!(matches!(
        entry_for(&report, "10.0.0.2").outcome,
        DeviceOutcome::Completed(_)
    ));
    assert_eq!(store.config_write_count("edge-fw-1"), 1);
}

#[tokio::test]
async fn every_status_row_shares_the_run_timestamp() {
    let connector = ScriptedConnector::new()
        .succeeds("10.0.0.1", "core-sw-1", "hostname core\n")
        .succeeds("10.0.0.2", "edge-fw-1", "set system host-name edge\n");
    let store = Arc::new(
        RecordingStore::new()
            .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
            .with_device("edge-fw-1", "10.0.0.2", Platform::Junos),
    );

    let report = run_backup(
        Arc::new(connector),
        store.clone(),
        Arc::new(BackupConfig::default()),
    )
    .await
    .unwrap();

    let stamp = report.timestamp.to_string();
    for id in ["core-sw-1", "edge-fw-1"] {
        let statuses = store.status_writes_for(id);
        assert_eq!(statuses.len(), 1);
        match &statuses[0] {
            StatusUpdate::Success(env) => assert_eq!(env.timestamp, stamp),
            other => panic!("expected a success status, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn report_counts_cover_every_outcome_class() {
    let connector = ScriptedConnector::new()
        .succeeds("10.0.0.1", "core-sw-1", "hostname core\n")
        .succeeds("10.0.0.2", "edge-fw-1", "set system host-name NEW\n")
        .fails("10.0.0.3");
    let store = Arc::new(
        RecordingStore::new()
            .with_device("core-sw-1", "10.0.0.1", Platform::Ios)
            .with_device("edge-fw-1", "10.0.0.2", Platform::Junos)
            .with_device("acc-sw-9", "10.0.0.3", Platform::Ios)
            .with_device("mangled", "not-an-ip", Platform::Ios)
            .with_previous_config("edge-fw-1", "set system host-name OLD\n"),
    );

    let report = run_backup(
        Arc::new(connector),
        store.clone(),
        Arc::new(BackupConfig::default()),
    )
    .await
    .unwrap();

    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.stored(), 1);
    assert_eq!(report.withheld(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.skipped(), 1);
}
