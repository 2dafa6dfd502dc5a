//! Utility functions for thermoview-core.

use btleplug::platform::PeripheralId;

/// Address reported by CoreBluetooth, which never exposes the real MAC.
const UNRESOLVED_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_id_wrapper(&format!("{:?}", id))
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    choose_identifier(address, || format_peripheral_id(peripheral_id))
}

fn strip_id_wrapper(debug: &str) -> String {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

fn choose_identifier(address: &str, fallback: impl FnOnce() -> String) -> String {
    if address == UNRESOLVED_ADDRESS {
        fallback()
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_identifier_with_valid_address() {
        let id = choose_identifier("AA:BB:CC:DD:EE:FF", || "fallback".to_string());
        assert_eq!(id, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_choose_identifier_with_zero_address() {
        let id = choose_identifier(UNRESOLVED_ADDRESS, || "4E2F-UUID".to_string());
        assert_eq!(id, "4E2F-UUID");
    }

    #[test]
    fn test_strip_id_wrapper() {
        assert_eq!(strip_id_wrapper("PeripheralId(hci0/dev_AA)"), "hci0/dev_AA");
        assert_eq!(strip_id_wrapper("plain"), "plain");
    }
}
