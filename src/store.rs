use crate::errors::StoreError;
use crate::model::{ConnectionStatus, DeviceEnv, DeviceId, Platform};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

/// One entry of the device directory, as persisted in the inventory
///
/// `ip` and `platform` are seeded by the operator; the remaining fields
/// are filled in by backup runs. A failed run touches only
/// `connection_status` and `timestamp`, so the last successfully
/// collected facts stay visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub ip: String,
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_driver: Option<String>,
}

pub type DeviceMap = BTreeMap<DeviceId, DeviceRecord>;

/// One device as the fleet driver polls it
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTarget {
    pub id: DeviceId,
    pub address: String,
    pub platform: Platform,
}

/// One status write, success or failure
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Successful poll: the full stringified environment block
    Success(DeviceEnv),
    /// Failed poll: only the status flag and the run stamp change
    Failure { timestamp: String },
}

/// Device directory plus snapshot persistence
///
/// Devices are never created through this interface; an id that is not
/// already in the directory is an error. `last_config` returns `None`
/// for a device that has no stored snapshot yet.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceTarget>, StoreError>;

    /// Device id for an address, `None` when the directory has no entry
    async fn resolve_id(&self, ip: IpAddr) -> Result<Option<DeviceId>, StoreError>;

    async fn last_config(&self, device_id: &str) -> Result<Option<String>, StoreError>;

    async fn write_config(&self, device_id: &str, raw: &str) -> Result<(), StoreError>;

    async fn write_status(&self, device_id: &str, update: StatusUpdate) -> Result<(), StoreError>;
}

/// File-backed store: a JSON inventory plus one raw config file per device
///
/// Layout under the data directory:
///   inventory.json   device records keyed by id
///   configs/<id>.cfg latest accepted snapshot, raw text
///
/// The inventory is held in memory behind an RwLock and rewritten
/// wholesale on every status or env update.
pub struct FileStore {
    devices: RwLock<DeviceMap>,
    inventory_path: PathBuf,
    configs_dir: PathBuf,
}

impl FileStore {
    /// Open an existing data directory
    ///
    /// The inventory file must exist; this tool records devices, it does
    /// not enroll them.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let inventory_path = data_dir.join("inventory.json");
        let configs_dir = data_dir.join("configs");

        if !inventory_path.exists() {
            return Err(StoreError::Inventory(format!(
                "no inventory at {} (seed it with the devices to back up)",
                inventory_path.display()
            )));
        }

        let content = tokio::fs::read_to_string(&inventory_path).await?;
        let devices: DeviceMap = serde_json::from_str(&content)
            .map_err(|e| StoreError::Inventory(format!("{}: {}", inventory_path.display(), e)))?;
        tokio::fs::create_dir_all(&configs_dir).await?;

        info!(
            "loaded {} devices from {}",
            devices.len(),
            inventory_path.display()
        );
        Ok(Self {
            devices: RwLock::new(devices),
            inventory_path,
            configs_dir,
        })
    }

    fn config_path(&self, device_id: &str) -> PathBuf {
        self.configs_dir.join(format!("{}.cfg", device_id))
    }

    /// Serialize and rewrite the inventory file
    ///
    /// Callers invoke this while still holding the write guard, so file
    /// contents always land in mutation order.
    async fn persist(&self, devices: &DeviceMap) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(devices)
            .map_err(|e| StoreError::Inventory(e.to_string()))?;
        tokio::fs::write(&self.inventory_path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for FileStore {
    async fn list_devices(&self) -> Result<Vec<DeviceTarget>, StoreError> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .map(|(id, record)| DeviceTarget {
                id: id.clone(),
                address: record.ip.clone(),
                platform: record.platform.clone(),
            })
            .collect())
    }

    async fn resolve_id(&self, ip: IpAddr) -> Result<Option<DeviceId>, StoreError> {
        let devices = self.devices.read().await;
        // Compare as parsed addresses; equivalent IPv6 spellings
        // ("::0:1", "::1") still resolve
        let found = devices.iter().find_map(|(id, record)| {
            match record.ip.parse::<IpAddr>() {
                Ok(recorded) if recorded == ip => Some(id.clone()),
                _ => None,
            }
        });
        Ok(found)
    }

    async fn last_config(&self, device_id: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.config_path(device_id)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write_config(&self, device_id: &str, raw: &str) -> Result<(), StoreError> {
        {
            let devices = self.devices.read().await;
            if !devices.contains_key(device_id) {
                return Err(StoreError::UnknownDevice(device_id.to_string()));
            }
        }
        tokio::fs::write(self.config_path(device_id), raw).await?;
        Ok(())
    }

    async fn write_status(&self, device_id: &str, update: StatusUpdate) -> Result<(), StoreError> {
        let mut devices = self.devices.write().await;
        let record = devices
            .get_mut(device_id)
            .ok_or_else(|| StoreError::UnknownDevice(device_id.to_string()))?;

        match update {
            StatusUpdate::Success(env) => {
                record.hostname = Some(env.hostname);
                record.vendor = Some(env.vendor);
                record.model = Some(env.model);
                record.os_version = Some(env.os_version);
                record.serial_number = Some(env.serial_number);
                record.uptime = Some(env.uptime);
                record.timestamp = Some(env.timestamp);
                record.connection_status = Some(env.connection_status);
                record.connection_driver = Some(env.connection_driver);
            }
            StatusUpdate::Failure { timestamp } => {
                record.timestamp = Some(timestamp);
                record.connection_status = Some(ConnectionStatus::ConnectionError.to_string());
            }
        }

        self.persist(&devices).await
    }
}
