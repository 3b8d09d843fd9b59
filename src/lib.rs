//! confkeep - change-aware network device configuration backup
//!
//! This library polls a fleet of network devices and keeps:
//! - a per-device status/environment record, refreshed on every run
//! - the latest accepted configuration snapshot, written only when the
//!   change-detection pipeline decides to
//! - a per-run report covering every polled device

pub mod backup;
pub mod config;
pub mod connector;
pub mod diff;
pub mod errors;
pub mod model;
pub mod normalize;
pub mod report;
pub mod snapshot;
pub mod store;

// Re-export commonly used types for convenience
pub use backup::{backup_device, run_backup};
pub use config::{load_config, BackupConfig};
pub use connector::{CommandConnector, DeviceConnector, DeviceFetch, RunningConfig};
pub use errors::{BackupError, ConnectError, StoreError};
pub use model::{DeviceEnv, DeviceFacts, DeviceId, Platform, RunTimestamp};
pub use report::{DeviceOutcome, DeviceReport, RunReport};
pub use snapshot::{maybe_store, record_failure, record_success, SnapshotDecision};
pub use store::{DeviceRecord, DeviceStore, DeviceTarget, FileStore, StatusUpdate};
