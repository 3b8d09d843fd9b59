use crate::errors::BackupError;
use crate::model::{DeviceId, Platform, RunTimestamp};
use crate::snapshot::SnapshotDecision;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use std::time::Duration;

/// How one device's polling attempt ended
#[derive(Debug)]
pub enum DeviceOutcome {
    /// Workflow ran to completion with this snapshot decision
    Completed(SnapshotDecision),
    /// Workflow stopped early
    Failed(BackupError),
    /// Target address never parsed; nothing was attempted
    Skipped,
}

/// Per-device entry of the run report
#[derive(Debug)]
pub struct DeviceReport {
    pub address: String,
    pub device_id: Option<DeviceId>,
    pub hostname: Option<String>,
    pub platform: Platform,
    pub outcome: DeviceOutcome,
}

/// Everything one run produced
#[derive(Debug)]
pub struct RunReport {
    pub timestamp: RunTimestamp,
    pub entries: Vec<DeviceReport>,
    pub duration: Duration,
}

impl RunReport {
    /// Snapshots written this run, first-time and rewritten alike
    pub fn stored(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    DeviceOutcome::Completed(SnapshotDecision::FirstSnapshot)
                        | DeviceOutcome::Completed(SnapshotDecision::Rewritten)
                )
            })
            .count()
    }

    /// Devices whose candidate was withheld after a detected change
    pub fn withheld(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    DeviceOutcome::Completed(SnapshotDecision::ChangeDetected)
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DeviceOutcome::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, DeviceOutcome::Skipped))
            .count()
    }

    /// Display the per-device results table and summary statistics
    pub fn print_summary(&self) {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
            .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);

        table.set_header(vec![
            "Device",
            "IP",
            "Hostname",
            "Platform",
            "Status",
            "Snapshot",
        ]);

        for entry in &self.entries {
            let status = match &entry.outcome {
                DeviceOutcome::Completed(_) => "Ok".to_string(),
                DeviceOutcome::Failed(e) => e.to_string(),
                DeviceOutcome::Skipped => "skipped".to_string(),
            };

            let snapshot = match &entry.outcome {
                DeviceOutcome::Completed(SnapshotDecision::FirstSnapshot) => "stored (first)",
                DeviceOutcome::Completed(SnapshotDecision::Rewritten) => "stored (no change)",
                DeviceOutcome::Completed(SnapshotDecision::ChangeDetected) => "withheld (changed)",
                DeviceOutcome::Failed(_) | DeviceOutcome::Skipped => "—",
            };

            table.add_row(vec![
                Cell::new(entry.device_id.clone().unwrap_or_else(|| "—".to_string())),
                Cell::new(entry.address.clone()),
                Cell::new(entry.hostname.clone().unwrap_or_else(|| "—".to_string())),
                Cell::new(entry.platform.to_string()),
                Cell::new(status),
                Cell::new(snapshot),
            ]);
        }

        println!("{}", table);

        println!("\nBackup Run Summary:");
        println!("===================");
        println!("Run stamp: {}", self.timestamp);
        println!("Devices polled: {}", self.entries.len());
        println!("Snapshots stored: {}", self.stored());
        println!("Snapshots withheld on change: {}", self.withheld());
        println!("Failed: {}", self.failed());
        println!("Skipped (bad address): {}", self.skipped());
        println!(
            "Run completed in {:.2} seconds",
            self.duration.as_secs_f64()
        );
    }
}
