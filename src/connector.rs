use crate::config::BackupConfig;
use crate::errors::{BackupError, ConnectError};
use crate::model::{DeviceFacts, Platform};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Everything a fetch returns for one device
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceFetch {
    #[serde(rename = "get_facts")]
    pub facts: DeviceFacts,
    pub config: RunningConfig,
}

/// Configuration part of a fetch payload
#[derive(Debug, Clone, Deserialize)]
pub struct RunningConfig {
    pub running: String,
}

/// Session opener for one device
///
/// Implementations retrieve identity facts and the running configuration
/// in a single call, folding every transport failure into `ConnectError`.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn fetch(&self, ip: IpAddr, platform: &Platform) -> Result<DeviceFetch, ConnectError>;

    /// Human-readable name for logs and diagnostics
    fn name(&self) -> &'static str;
}

/// Connector that delegates the device session to a configured command
///
/// The operator supplies a command template whose {ip}, {platform},
/// {username} and {password} placeholders are filled per device. The
/// command must print a NAPALM-shaped JSON document on stdout: the
/// `get_facts` getter result plus `config.running`. Spawn failures,
/// non-zero exits, timeouts and unparseable payloads are all
/// connection-class errors.
pub struct CommandConnector {
    argv: Vec<String>,
    username: String,
    password: String,
    timeout: Duration,
}

impl CommandConnector {
    pub fn new(
        template: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, BackupError> {
        let argv = shell_words::split(template)
            .map_err(|e| BackupError::Config(format!("fetch_command: {}", e)))?;
        if argv.is_empty() {
            return Err(BackupError::Config(
                "fetch_command is not set".to_string(),
            ));
        }
        Ok(Self {
            argv,
            username: username.to_string(),
            password: password.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &BackupConfig) -> Result<Self, BackupError> {
        Self::new(
            &config.fetch_command,
            &config.username,
            &config.password,
            Duration::from_secs(config.conn_timeout),
        )
    }

    /// Template tokens with the per-device placeholders filled in
    ///
    /// Substitution happens after shell splitting, so credential values
    /// containing spaces stay a single argument.
    fn render_argv(&self, ip: IpAddr, platform: &Platform) -> Vec<String> {
        let ip = ip.to_string();
        self.argv
            .iter()
            .map(|token| {
                token
                    .replace("{ip}", &ip)
                    .replace("{platform}", platform.as_str())
                    .replace("{username}", &self.username)
                    .replace("{password}", &self.password)
            })
            .collect()
    }
}

#[async_trait]
impl DeviceConnector for CommandConnector {
    fn name(&self) -> &'static str {
        "external fetch command"
    }

    async fn fetch(&self, ip: IpAddr, platform: &Platform) -> Result<DeviceFetch, ConnectError> {
        let argv = self.render_argv(ip, platform);

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A fetch that outlives the timeout is reaped, not orphaned
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ConnectError::Spawn(e.to_string())),
            Err(_) => return Err(ConnectError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(ConnectError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| ConnectError::Payload(e.to_string()))
    }
}
