//! Simulated drive bus
//!
//! Stands in for real PWM hardware: every write is logged through `tracing`
//! and the last value per channel is kept for the final summary.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use servo_motion::{DriveTransport, TransportError};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    last: Arc<Mutex<BTreeMap<usize, u32>>>,
    writes: Arc<Mutex<u64>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written to each channel
    pub fn last_values(&self) -> BTreeMap<usize, u32> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn write_count(&self) -> u64 {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DriveTransport for SimulatedBus {
    fn write_drive_value(&mut self, channel: usize, value: u32) -> Result<(), TransportError> {
        trace!(channel, value, "bus write");
        self.last
            .lock()
            .map_err(|e| TransportError::Bus(e.to_string()))?
            .insert(channel, value);
        *self
            .writes
            .lock()
            .map_err(|e| TransportError::Bus(e.to_string()))? += 1;
        Ok(())
    }
}
