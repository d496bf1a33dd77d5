//! Device identity registry
//!
//! Maps each device's self-reported address to a logical ID and keeps the
//! clock offset estimated when the device first registered.
//!
//! IDs are handed out densely in registration order starting at 0 and are
//! never reused. Registering an address that is already known returns the
//! existing ID and leaves the stored entry untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use super::clock;

/// Logical identity assigned by the coordinator
pub type DeviceId = u64;

// ============================================================================
// Device
// ============================================================================

/// A registered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Logical ID, equal to the registration order
    pub id: DeviceId,

    /// Address the device reported for itself (`host` or `host:port`)
    pub address: String,

    /// Estimated `coordinator - device` clock difference in milliseconds
    pub clock_offset_ms: i64,

    /// Free-form device descriptor sent at registration
    pub label: Option<String>,

    /// When the device first registered
    pub registered_at: DateTime<Utc>,
}

impl Device {
    /// Map a timestamp from this device's clock onto the coordinator clock
    pub fn to_coordinator_time(&self, device_ms: i64) -> i64 {
        clock::align(device_ms, self.clock_offset_ms)
    }
}

// ============================================================================
// Registration Request
// ============================================================================

/// Body of `POST /reg`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Device start time in milliseconds since the epoch
    #[serde(default)]
    pub clock: i64,

    /// Address the coordinator should use to reach the device
    pub ip: String,

    /// Device descriptor
    #[serde(default)]
    pub dev: String,
}

// ============================================================================
// Device Registry
// ============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    /// Devices indexed by ID
    devices: Vec<Device>,

    /// Address -> ID lookup
    by_address: HashMap<String, DeviceId>,
}

impl RegistryState {
    fn get(&self, id: DeviceId) -> Option<&Device> {
        usize::try_from(id).ok().and_then(|i| self.devices.get(i))
    }
}

/// Registry of all devices known to this coordinator
///
/// Registration holds the write lock across lookup and insert, so two
/// concurrent first-time registrations of one address cannot both claim
/// a fresh ID.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, returning its logical ID
    ///
    /// Addresses are compared verbatim; no whitespace or case folding.
    pub async fn register(
        &self,
        address: &str,
        device_clock_ms: i64,
        coordinator_now_ms: i64,
    ) -> Result<DeviceId, RegistryError> {
        self.register_labeled(address, None, device_clock_ms, coordinator_now_ms)
            .await
    }

    /// Register a device together with its descriptor
    ///
    /// The label is only stored on first registration.
    pub async fn register_labeled(
        &self,
        address: &str,
        label: Option<&str>,
        device_clock_ms: i64,
        coordinator_now_ms: i64,
    ) -> Result<DeviceId, RegistryError> {
        if address.is_empty() {
            return Err(RegistryError::InvalidAddress(address.to_string()));
        }

        let mut state = self.state.write().await;

        if let Some(&id) = state.by_address.get(address) {
            tracing::debug!(id, address, "Device already registered");
            return Ok(id);
        }

        let id = state.devices.len() as DeviceId;
        let device = Device {
            id,
            address: address.to_string(),
            clock_offset_ms: clock::estimate(device_clock_ms, coordinator_now_ms),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            registered_at: Utc::now(),
        };

        tracing::info!(
            id,
            address,
            clock_offset_ms = device.clock_offset_ms,
            "Registered new device"
        );

        state.by_address.insert(device.address.clone(), id);
        state.devices.push(device);

        Ok(id)
    }

    /// Register from a decoded `/reg` body
    pub async fn register_request(
        &self,
        request: &RegisterRequest,
        coordinator_now_ms: i64,
    ) -> Result<DeviceId, RegistryError> {
        self.register_labeled(
            &request.ip,
            Some(request.dev.as_str()),
            request.clock,
            coordinator_now_ms,
        )
        .await
    }

    /// Resolve an ID to the device's reachable address
    pub async fn resolve(&self, id: DeviceId) -> Result<String, RegistryError> {
        self.state
            .read()
            .await
            .get(id)
            .map(|d| d.address.clone())
            .ok_or(RegistryError::NotFound(id))
    }

    /// Stored clock offset for a device
    pub async fn clock_offset(&self, id: DeviceId) -> Result<i64, RegistryError> {
        self.state
            .read()
            .await
            .get(id)
            .map(|d| d.clock_offset_ms)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Convert a timestamp reported by `id` into coordinator time
    pub async fn to_coordinator_time(
        &self,
        id: DeviceId,
        device_ms: i64,
    ) -> Result<i64, RegistryError> {
        let offset = self.clock_offset(id).await?;
        Ok(clock::align(device_ms, offset))
    }

    /// Get a device by ID
    pub async fn device(&self, id: DeviceId) -> Option<Device> {
        self.state.read().await.get(id).cloned()
    }

    /// All devices, ordered by ID
    pub async fn devices(&self) -> Vec<Device> {
        self.state.read().await.devices.clone()
    }

    /// Number of registered devices
    pub async fn len(&self) -> usize {
        self.state.read().await.devices.len()
    }

    /// Whether no device has registered yet
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No device holds this ID
    #[error("Device not found: {0}")]
    NotFound(DeviceId),

    /// Registration carried an unusable address
    #[error("Invalid device address: '{0}'")]
    InvalidAddress(String),
}

// ============================================================================
// Tests
// ============================================================================
