//! Error types for thermoview-core.
//!
//! Every failure of the connect handshake surfaces as one of these variants.
//! [`crate::LinkManager::connect`] logs and swallows them; callers that need
//! the cause use [`crate::LinkManager::try_connect`] instead.
//!
//! | Error Type | Typical cause |
//! |------------|---------------|
//! | [`Error::DeviceNotFound`] | Peripheral not advertising, wrong name, no adapter |
//! | [`Error::ConnectionFailed`] | GATT connect rejected or timed out |
//! | [`Error::ServiceNotFound`] | Wrong firmware, service not exposed |
//! | [`Error::CharacteristicNotFound`] | Firmware missing one of the three data characteristics |
//! | [`Error::SubscriptionFailed`] | Notify could not be enabled |
//! | [`Error::Timeout`] | Discovery or notify setup exceeding its configured budget |

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the thermal peripheral.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Device not found during request or scan.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to the peripheral.
    #[error("Not connected to device")]
    NotConnected,

    /// Primary service missing from the connected peripheral.
    #[error("Service not found: {uuid} (device exposes {service_count} services)")]
    ServiceNotFound {
        /// The service UUID that was requested.
        uuid: String,
        /// Number of services the peripheral exposes.
        service_count: usize,
    },

    /// Required characteristic missing from the thermal service.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Enabling notifications on a characteristic failed.
    #[error("Subscription to {uuid} failed: {reason}")]
    SubscriptionFailed {
        /// The characteristic UUID.
        uuid: String,
        /// The reason for the failure.
        reason: String,
    },

    /// Connection failed with specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Connection attempt timed out.
    Timeout,
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "connection timed out"),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// Nothing matching the filter advertised before the scan ended.
    NotFound { identifier: String },
    /// Scan timed out before finding the device.
    ScanTimeout { duration: Duration },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::ScanTimeout { duration } => write!(f, "scan timed out after {:?}", duration),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a service not found error.
    pub fn service_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::ServiceNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a subscription failure.
    pub fn subscription_failed(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }
}

/// Result type alias using thermoview-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("SL2MetaBLE_Test");
        assert!(err.to_string().contains("SL2MetaBLE_Test"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("f5e10002", 3);
        assert!(err.to_string().contains("f5e10002"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::service_not_found("f5e10000", 2);
        assert!(err.to_string().contains("exposes 2 services"));

        let err = Error::timeout("connect to device", Duration::from_secs(10));
        assert!(err.to_string().contains("connect to device"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_subscription_failed_display() {
        let err = Error::subscription_failed("f5e10003", "notify not permitted");
        assert_eq!(
            err.to_string(),
            "Subscription to f5e10003 failed: notify not permitted"
        );
    }

    #[test]
    fn test_device_not_found_reasons() {
        let err = Error::DeviceNotFound(DeviceNotFoundReason::NoAdapter);
        assert!(err.to_string().contains("no Bluetooth adapter"));

        let err = Error::DeviceNotFound(DeviceNotFoundReason::ScanTimeout {
            duration: Duration::from_secs(30),
        });
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_connection_failure_reasons() {
        let err = Error::connection_failed(
            Some("AA:BB:CC:DD:EE:FF".into()),
            ConnectionFailureReason::Timeout,
        );
        assert_eq!(err.to_string(), "Connection failed: connection timed out");

        let reason = ConnectionFailureReason::BleError("GATT 0x85".into());
        assert_eq!(reason.to_string(), "BLE error: GATT 0x85");
    }
}
