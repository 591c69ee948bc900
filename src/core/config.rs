//! # Supervisor runtime configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for [`TaskSupervisor`](crate::TaskSupervisor).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `min_repeat_interval = 0s` → clamped to 1ms (a timer period is never zero)

use std::time::Duration;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `destroy_ack_timeout`: how long teardown waits for the worker's `onDestroy` ack
/// - `bus_capacity`: diagnostics bus ring buffer size (min 1)
/// - `min_repeat_interval`: lower bound applied to `Repeat` intervals
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum wait for the `onDestroy` ack before the context is released anyway.
    ///
    /// Teardown never blocks on an unresponsive worker for longer than this.
    pub destroy_ack_timeout: Duration,

    /// Capacity of the diagnostics bus broadcast channel.
    ///
    /// Receivers lagging more than `bus_capacity` events observe `Lagged`.
    pub bus_capacity: usize,

    /// Shortest allowed repeat period.
    ///
    /// `Repeat` actions with a smaller `interval_ms` tick at this period instead.
    pub min_repeat_interval: Duration,
}

impl SupervisorConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the minimum repeat period clamped to at least 1ms.
    #[inline]
    pub fn min_repeat_interval_clamped(&self) -> Duration {
        self.min_repeat_interval.max(Duration::from_millis(1))
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `destroy_ack_timeout = 5s`
    /// - `bus_capacity = 1024`
    /// - `min_repeat_interval = 1ms`
    fn default() -> Self {
        Self {
            destroy_ack_timeout: Duration::from_secs(5),
            bus_capacity: 1024,
            min_repeat_interval: Duration::from_millis(1),
        }
    }
}
