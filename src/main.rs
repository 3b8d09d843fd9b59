// ==========================================================
//  confkeep - change-aware device configuration backup
// ==========================================================

use comfy_table::{presets::UTF8_FULL, Table};
use confkeep::{load_config, run_backup, BackupError, CommandConnector, DeviceStore, FileStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), BackupError> {
    tracing_subscriber::fmt().init();

    let raw_args: Vec<String> = std::env::args().collect();
    let mut args = raw_args.iter().skip(1);

    let mut jobs = None;
    let mut list_devices = false;
    let mut positional = None;

    // Parse command line arguments
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--jobs" | "-j" => jobs = args.next().and_then(|s| s.parse().ok()),
            "--devices" => list_devices = true,
            "--help" | "-h" => {
                println!("Usage: confkeep [OPTIONS] [CONFIG_FILE]");
                println!("Options:");
                println!("  -j, --jobs <N>     set concurrent device limit (default: 16)");
                println!("  --devices          list the device inventory and exit");
                println!("  -h, --help         show this help message");
                return Ok(());
            }
            _ => positional = Some(arg.clone()),
        }
    }

    let mut config = load_config(positional.as_deref()).await?;
    if let Some(j) = jobs {
        config.max_concurrent_backups = std::cmp::max(j, 1);
    }

    let store = FileStore::open(&config.data_dir).await?;

    if list_devices {
        let targets = store.list_devices().await?;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(comfy_table::ContentArrangement::Dynamic);
        table.set_header(vec!["Device", "IP", "Platform"]);
        for target in targets {
            table.add_row(vec![target.id, target.address, target.platform.to_string()]);
        }
        println!("{}", table);
        return Ok(());
    }

    let connector = CommandConnector::from_config(&config)?;

    // Run the fleet backup and show what happened to each device
    let report = run_backup(Arc::new(connector), Arc::new(store), Arc::new(config)).await?;
    report.print_summary();
    Ok(())
}
