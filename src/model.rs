use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Stable identifier assigned to a device by the inventory
pub type DeviceId = String;

/// Driver family a device is managed with
///
/// The label doubles as the connection driver name recorded in the
/// device's status row, so `Display`/`FromStr` round-trip on the short
/// lowercase form used in inventory and configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Ios,
    IosXr,
    NxOs,
    Eos,
    Junos,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Ios => "ios",
            Platform::IosXr => "iosxr",
            Platform::NxOs => "nxos",
            Platform::Eos => "eos",
            Platform::Junos => "junos",
            Platform::Other(label) => label,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_platform_label(s: &str) -> Platform {
    match s.trim().to_lowercase().as_str() {
        "ios" => Platform::Ios,
        "iosxr" => Platform::IosXr,
        "nxos" => Platform::NxOs,
        "eos" => Platform::Eos,
        "junos" => Platform::Junos,
        other => Platform::Other(other.to_string()),
    }
}

impl FromStr for Platform {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_platform_label(s))
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        parse_platform_label(&s)
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}

/// Serial number field as devices report it: a single value or a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SerialNumber {
    One(String),
    Many(Vec<String>),
}

/// Identity facts returned by a device, NAPALM `get_facts` shaped
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceFacts {
    pub hostname: String,
    pub vendor: String,
    pub model: String,
    pub os_version: String,
    #[serde(default)]
    pub serial_number: Option<SerialNumber>,
    /// Uptime in seconds; devices report fractional values on occasion
    #[serde(default)]
    pub uptime: f64,
}

impl DeviceFacts {
    /// Canonical serial number for storage
    ///
    /// Lists resolve to their first element. A missing, empty or blank
    /// serial resolves to the literal `"undefined"` so the stored value
    /// is never null.
    pub fn serial(&self) -> String {
        let resolved = match &self.serial_number {
            Some(SerialNumber::One(value)) => Some(value.clone()),
            Some(SerialNumber::Many(values)) => values.first().cloned(),
            None => None,
        };
        match resolved {
            Some(value) if !value.trim().is_empty() => value,
            _ => "undefined".to_string(),
        }
    }

    /// Uptime rendered as human-readable text
    pub fn uptime_text(&self) -> String {
        format_uptime(self.uptime)
    }
}

/// Render an uptime in seconds as `H:MM:SS`, prefixed with a day count
/// once the duration passes one day; fractional seconds are truncated.
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = total / 86_400;
    let rest = total % 86_400;
    let hours = rest / 3_600;
    let minutes = rest % 3_600 / 60;
    let secs = rest % 60;
    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, secs),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, secs),
        n => format!("{} days, {}:{:02}:{:02}", n, hours, minutes, secs),
    }
}

/// Outcome of a polling attempt as recorded in the device's status row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Ok,
    ConnectionError,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Ok => f.write_str("Ok"),
            ConnectionStatus::ConnectionError => f.write_str("Connection error"),
        }
    }
}

/// Environment row written for a device after a successful poll
///
/// Every field is already coerced to text; this is exactly what the
/// store persists, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEnv {
    pub hostname: String,
    pub vendor: String,
    pub model: String,
    pub os_version: String,
    pub serial_number: String,
    pub uptime: String,
    pub timestamp: String,
    pub connection_status: String,
    pub connection_driver: String,
}

impl DeviceEnv {
    pub fn from_facts(facts: &DeviceFacts, platform: &Platform, timestamp: &RunTimestamp) -> Self {
        DeviceEnv {
            hostname: facts.hostname.clone(),
            vendor: facts.vendor.clone(),
            model: facts.model.clone(),
            os_version: facts.os_version.clone(),
            serial_number: facts.serial(),
            uptime: facts.uptime_text(),
            timestamp: timestamp.to_string(),
            connection_status: ConnectionStatus::Ok.to_string(),
            connection_driver: platform.to_string(),
        }
    }
}

/// Minute-resolution timestamp captured once per run
///
/// Every record written during a run carries the same stamp, which is
/// what correlates status rows and snapshots afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTimestamp(String);

impl RunTimestamp {
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        RunTimestamp(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
