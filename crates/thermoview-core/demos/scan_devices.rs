//! Example: Scanning for thermal sensors
//!
//! Lists every peripheral advertising the sensor name.
//!
//! Run with: `cargo run --example scan_devices`

use thermoview_core::scan::{self, ScanOptions};
use thermoview_core::uuid::DEVICE_NAME;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Scanning for thermal sensors...");
    println!();

    let options = ScanOptions::default().duration_secs(10).device_name(DEVICE_NAME);
    let devices = scan::scan_with_options(options).await?;

    if devices.is_empty() {
        println!("No thermal sensors found.");
        println!();
        println!("Make sure:");
        println!("  - The sensor is powered on and advertising");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The sensor is within range");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    println!();
    for device in &devices {
        let rssi = device
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        println!("  {}", device.name.as_deref().unwrap_or("Unknown"));
        println!("    Identifier: {}", device.identifier);
        println!("    RSSI: {}", rssi);
        println!();
    }

    Ok(())
}
