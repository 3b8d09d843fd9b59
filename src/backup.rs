use crate::config::BackupConfig;
use crate::connector::DeviceConnector;
use crate::errors::BackupError;
use crate::model::{Platform, RunTimestamp};
use crate::report::{DeviceOutcome, DeviceReport, RunReport};
use crate::snapshot::{maybe_store, record_failure, record_success, SnapshotDecision};
use crate::store::DeviceStore;
use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// The fallible part of one device's backup run
///
/// Resolve the address, fetch facts and configuration, record status,
/// then hand the candidate to the snapshot gateway. Identity fields are
/// filled into `entry` as they become known so the caller can report
/// them even when a later step fails.
async fn device_workflow(
    connector: &dyn DeviceConnector,
    store: &dyn DeviceStore,
    config: &BackupConfig,
    timestamp: &RunTimestamp,
    entry: &mut DeviceReport,
) -> Result<SnapshotDecision, BackupError> {
    let ip: IpAddr = entry
        .address
        .parse()
        .map_err(|_| BackupError::InvalidAddress(entry.address.clone()))?;

    let device_id = store
        .resolve_id(ip)
        .await?
        .ok_or_else(|| BackupError::UnresolvedDevice { ip: ip.to_string() })?;
    entry.device_id = Some(device_id.clone());

    let fetch = match connector.fetch(ip, &entry.platform).await {
        Ok(fetch) => fetch,
        Err(e) => {
            if let Err(store_err) = record_failure(store, &device_id, timestamp).await {
                warn!(
                    "device {} ({}): failure status not recorded: {}",
                    device_id, ip, store_err
                );
            }
            return Err(e.into());
        }
    };
    entry.hostname = Some(fetch.facts.hostname.clone());

    record_success(store, &device_id, &fetch.facts, &entry.platform, timestamp).await?;

    let decision = maybe_store(
        store,
        config,
        &device_id,
        &entry.platform,
        &fetch.config.running,
    )
    .await?;
    Ok(decision)
}

/// Run the backup workflow for one polling target
///
/// Every failure is folded into the returned report entry; this function
/// never aborts the caller.
pub async fn backup_device(
    connector: &dyn DeviceConnector,
    store: &dyn DeviceStore,
    config: &BackupConfig,
    timestamp: &RunTimestamp,
    address: &str,
    platform: &Platform,
) -> DeviceReport {
    let mut entry = DeviceReport {
        address: address.to_string(),
        device_id: None,
        hostname: None,
        platform: platform.clone(),
        outcome: DeviceOutcome::Skipped,
    };

    let outcome = match device_workflow(connector, store, config, timestamp, &mut entry).await {
        Ok(decision) => DeviceOutcome::Completed(decision),
        // An unparseable address is not a manageable device; nothing is
        // recorded for it
        Err(BackupError::InvalidAddress(_)) => DeviceOutcome::Skipped,
        Err(e) => {
            match &entry.device_id {
                Some(id) => error!("device {} ({}): {}", id, entry.address, e),
                None => error!("device {}: {}", entry.address, e),
            }
            DeviceOutcome::Failed(e)
        }
    };
    entry.outcome = outcome;
    entry
}

/// Poll every device in the directory once, with bounded concurrency
///
/// One tokio task per device, spawned lazily as the bounded stream pulls
/// targets in. A panicking device task is folded into a failure entry
/// without disturbing its siblings.
pub async fn run_backup(
    connector: Arc<dyn DeviceConnector>,
    store: Arc<dyn DeviceStore>,
    config: Arc<BackupConfig>,
) -> Result<RunReport, BackupError> {
    let started = Instant::now();
    let timestamp = RunTimestamp::now();
    let targets = store.list_devices().await?;

    info!(
        "starting backup run for {} devices via {}",
        targets.len(),
        connector.name()
    );

    let concurrency = config.max_concurrent_backups.max(1);

    let entries: Vec<DeviceReport> = stream::iter(targets)
        .map(|target| {
            let connector = Arc::clone(&connector);
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let timestamp = timestamp.clone();
            let address = target.address.clone();
            let platform = target.platform.clone();

            let handle = tokio::spawn(async move {
                backup_device(
                    connector.as_ref(),
                    store.as_ref(),
                    &config,
                    &timestamp,
                    &target.address,
                    &target.platform,
                )
                .await
            });

            async move {
                match handle.await {
                    Ok(entry) => entry,
                    Err(e) => {
                        error!("device task for {} aborted: {}", address, e);
                        DeviceReport {
                            address,
                            device_id: None,
                            hostname: None,
                            platform,
                            outcome: DeviceOutcome::Failed(BackupError::TaskJoin(e.to_string())),
                        }
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let duration = started.elapsed();
    info!("backup run finished in {:.2}s", duration.as_secs_f64());

    Ok(RunReport {
        timestamp,
        entries,
        duration,
    })
}
