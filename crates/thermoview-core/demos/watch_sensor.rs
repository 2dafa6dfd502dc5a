//! Example: Streaming sensor values
//!
//! Connects to the thermal sensor, prints ten grids with their average and
//! maximum, then disconnects.
//!
//! Run with: `cargo run --example watch_sensor`

use thermoview_core::{BleProvider, LinkConfig, LinkManager};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let link = LinkManager::new(BleProvider::default(), LinkConfig::default());
    link.try_connect().await?;

    let mut updates = link.watch();
    let mut last_grid = 0;
    let mut printed = 0;
    while printed < 10 && updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        if snapshot.grid_revision == last_grid {
            continue;
        }
        last_grid = snapshot.grid_revision;
        printed += 1;

        println!("{}", snapshot.grid);
        println!(
            "avg {:.2} °C  max {:.2} °C",
            snapshot.average, snapshot.maximum
        );
        println!();
    }

    link.disconnect().await?;
    Ok(())
}
