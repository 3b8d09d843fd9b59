use crate::config::BackupConfig;
use crate::diff::has_changed;
use crate::errors::StoreError;
use crate::model::{DeviceEnv, DeviceFacts, Platform, RunTimestamp};
use crate::normalize::normalize;
use crate::store::{DeviceStore, StatusUpdate};
use tracing::{debug, info};

/// Outcome of the conditional-write decision for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecision {
    /// No previous snapshot existed; the candidate is now the baseline
    FirstSnapshot,
    /// Normalized texts matched; the snapshot was rewritten in place
    Rewritten,
    /// Normalized texts differ; nothing was written
    ChangeDetected,
}

/// Decide whether the candidate configuration becomes the stored snapshot
///
/// The raw candidate is what gets persisted; normalization shapes only
/// the comparison views.
pub async fn maybe_store(
    store: &dyn DeviceStore,
    config: &BackupConfig,
    device_id: &str,
    platform: &Platform,
    candidate: &str,
) -> Result<SnapshotDecision, StoreError> {
    let previous = match store.last_config(device_id).await? {
        Some(previous) => previous,
        None => {
            store.write_config(device_id, candidate).await?;
            info!("device {}: first snapshot stored", device_id);
            return Ok(SnapshotDecision::FirstSnapshot);
        }
    };

    let candidate_view = normalize(candidate, platform, config);
    let previous_view = normalize(&previous, platform, config);

    // Identical views rewrite the snapshot; a detected change withholds it.
    // TODO: review this gating with operations; if it inverts, update the
    // two literal cases in tests/backup_tests.rs (tracked in DESIGN.md).
    if has_changed(&candidate_view, &previous_view) {
        info!("device {}: configuration changed, snapshot withheld", device_id);
        Ok(SnapshotDecision::ChangeDetected)
    } else {
        store.write_config(device_id, candidate).await?;
        debug!("device {}: no change, snapshot rewritten", device_id);
        Ok(SnapshotDecision::Rewritten)
    }
}

/// Record a successful poll: the full environment block plus the run stamp
pub async fn record_success(
    store: &dyn DeviceStore,
    device_id: &str,
    facts: &DeviceFacts,
    platform: &Platform,
    timestamp: &RunTimestamp,
) -> Result<(), StoreError> {
    let env = DeviceEnv::from_facts(facts, platform, timestamp);
    store
        .write_status(device_id, StatusUpdate::Success(env))
        .await
}

/// Record a failed poll: status flag and run stamp only
pub async fn record_failure(
    store: &dyn DeviceStore,
    device_id: &str,
    timestamp: &RunTimestamp,
) -> Result<(), StoreError> {
    store
        .write_status(
            device_id,
            StatusUpdate::Failure {
                timestamp: timestamp.to_string(),
            },
        )
        .await
}
