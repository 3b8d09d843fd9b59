use std::time::Duration;
use thiserror::Error;

/// Errors raised by the per-device backup workflow and the fleet runner
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Device {ip} has no inventory entry")]
    UnresolvedDevice { ip: String },

    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device task aborted: {0}")]
    TaskJoin(String),
}

/// Connection-class failures from the device connector
///
/// Every way a fetch can go wrong on the wire folds into one of these
/// variants, so the orchestrator only ever handles a single failure
/// class per device.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("fetch command could not be started: {0}")]
    Spawn(String),

    #[error("fetch command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed device payload: {0}")]
    Payload(String),
}

/// Failures from the device directory / persistence store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("device not found in inventory: {0}")]
    UnknownDevice(String),

    #[error("inventory file error: {0}")]
    Inventory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
