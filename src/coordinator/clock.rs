//! Clock offset estimation
//!
//! A device reports the local time at which it started; the coordinator
//! notes when the registration arrived. The difference between the two is
//! kept as the device's clock offset and used to map device timestamps onto
//! the coordinator clock.
//!
//! This is a one-shot, single-sample estimate: no averaging, no retries and
//! no drift correction. Network latency between the device's report and the
//! coordinator's receipt is assumed negligible.

use serde::{Deserialize, Serialize};

/// Estimate the offset `coordinator - device` in milliseconds.
///
/// Saturates at the `i64` bounds instead of overflowing.
pub fn estimate(device_clock_ms: i64, coordinator_now_ms: i64) -> i64 {
    coordinator_now_ms.saturating_sub(device_clock_ms)
}

/// Map a device timestamp onto the coordinator clock using a stored offset.
pub fn align(device_ms: i64, offset_ms: i64) -> i64 {
    device_ms.saturating_add(offset_ms)
}

/// Current coordinator time in milliseconds since the Unix epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Input pair for a single offset estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSample {
    /// Start clock reported by the device
    pub device_clock_ms: i64,

    /// Arrival time observed by the coordinator
    pub coordinator_now_ms: i64,
}

impl RegistrationSample {
    /// Create a new sample
    pub fn new(device_clock_ms: i64, coordinator_now_ms: i64) -> Self {
        Self {
            device_clock_ms,
            coordinator_now_ms,
        }
    }

    /// Offset estimated from this sample
    pub fn offset(&self) -> i64 {
        estimate(self.device_clock_ms, self.coordinator_now_ms)
    }
}
