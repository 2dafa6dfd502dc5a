//! Bluetooth identifiers for the thermal sensor peripheral.
//!
//! The peripheral exposes one custom service with three notify
//! characteristics. All of them share the `f5e1xxxx-6b9b-11ee-b962-0242ac120002`
//! base.

use uuid::{Uuid, uuid};

/// Advertised local name of the peripheral.
pub const DEVICE_NAME: &str = "SL2MetaBLE_Test";

// --- Thermal Service ---

/// Custom thermal service UUID.
pub const THERMAL_SERVICE: Uuid = uuid!("f5e10000-6b9b-11ee-b962-0242ac120002");

// --- Thermal Characteristic UUIDs ---

/// Raw 8x8 temperature grid, comma-separated text.
pub const RAW_GRID: Uuid = uuid!("f5e10001-6b9b-11ee-b962-0242ac120002");

/// Average temperature, single text-encoded number.
pub const AVERAGE_TEMPERATURE: Uuid = uuid!("f5e10002-6b9b-11ee-b962-0242ac120002");

/// Maximum temperature, single text-encoded number.
pub const MAX_TEMPERATURE: Uuid = uuid!("f5e10003-6b9b-11ee-b962-0242ac120002");

/// The three characteristics in subscription order.
pub const DATA_CHARACTERISTICS: [Uuid; 3] = [RAW_GRID, AVERAGE_TEMPERATURE, MAX_TEMPERATURE];

/// Short human-readable name for one of the known characteristics.
pub fn characteristic_name(uuid: &Uuid) -> &'static str {
    match *uuid {
        RAW_GRID => "raw grid",
        AVERAGE_TEMPERATURE => "average temperature",
        MAX_TEMPERATURE => "max temperature",
        THERMAL_SERVICE => "thermal service",
        _ => "unknown",
    }
}
