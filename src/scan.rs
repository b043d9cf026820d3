//! Sliding window scan over a holding register address range.
//!
//! Windows of `window_size` registers are read every `step` registers. With a step smaller
//! than the window the same address is read several times, which makes registers that change
//! between reads (or devices that answer inconsistently) visible in the aggregated result.

use crate::error::{Error, Result};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of bytes per register.
pub const REGISTER_SIZE: usize = 2;

pub const DEFAULT_WINDOW_SIZE: u32 = 10;

/// Parameters of one scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    /// First address (inclusive).
    pub start: u32,
    /// Last address (exclusive).
    pub end: u32,
    pub window_size: u32,
    pub step: u32,
    /// Read the trailing window even if it is smaller than `window_size`.
    pub include_partial: bool,
}

impl ScanPlan {
    /// Plan with non-overlapping windows of the default size, partial windows included.
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            window_size: DEFAULT_WINDOW_SIZE,
            step: DEFAULT_WINDOW_SIZE,
            include_partial: true,
        }
    }

    pub fn window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    pub fn include_partial(mut self, include_partial: bool) -> Self {
        self.include_partial = include_partial;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window_size < 1 {
            return Err(Error::validation("scan window size must be at least 1"));
        }
        if self.step < 1 {
            return Err(Error::validation("scan step must be at least 1"));
        }
        Ok(())
    }

    /// The `(address, count)` pairs read by this plan, in read order.
    pub fn windows(&self) -> Result<Vec<(u32, u32)>> {
        self.validate()?;

        let mut windows = Vec::new();
        let mut i = self.start;
        while i < self.end {
            let w = std::cmp::min(self.window_size, self.end - i);
            if w == 0 {
                break;
            }
            // A skipped partial window does not end the loop, the next step is still checked.
            if self.include_partial || w == self.window_size {
                windows.push((i, w));
            }
            i = match i.checked_add(self.step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(windows)
    }
}

/// The raw bytes returned by one window read, two bytes per register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowResult {
    pub address: u32,
    pub bytes: Vec<u8>,
}

/// All readings of a single register address.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub address: u32,
    /// Readings in the order the windows were read.
    pub values: Vec<[u8; REGISTER_SIZE]>,
    /// Whether all readings agree. Always true for a single reading.
    pub identical: bool,
}

impl ScanResult {
    fn new(address: u32, values: Vec<[u8; REGISTER_SIZE]>) -> Self {
        let identical = values.iter().all(|v| *v == values[0]);
        Self {
            address,
            values,
            identical,
        }
    }

    /// Whether the address was read by more than one window.
    pub fn overlapped(&self) -> bool {
        self.values.len() > 1
    }
}

/// Run `plan`, reading each window with `read(address, count)`.
///
/// The first failing read aborts the scan and its error is returned; windows read before the
/// failure are dropped.
pub fn scan<F>(plan: &ScanPlan, mut read: F) -> Result<Vec<ScanResult>>
where
    F: FnMut(u32, u32) -> Result<Vec<u8>>,
{
    let windows = plan.windows()?;
    debug!(
        "Scanning [ {:#06X} ({}), {:#06X} ({}) ) in {} windows.",
        plan.start,
        plan.start,
        plan.end,
        plan.end,
        windows.len()
    );

    let mut results = Vec::with_capacity(windows.len());
    for (address, count) in windows {
        let bytes = read(address, count)?;
        trace!("Window {address} + {count} returned {} bytes.", bytes.len());
        results.push(WindowResult { address, bytes });
    }
    Ok(aggregate(&results))
}

/// Merge window readings into one [`ScanResult`] per address, ascending by address.
pub fn aggregate(windows: &[WindowResult]) -> Vec<ScanResult> {
    let mut map: BTreeMap<u32, Vec<[u8; REGISTER_SIZE]>> = BTreeMap::new();
    for window in windows {
        for (offset, chunk) in window.bytes.chunks_exact(REGISTER_SIZE).enumerate() {
            map.entry(window.address + offset as u32)
                .or_default()
                .push([chunk[0], chunk[1]]);
        }
    }
    map.into_iter()
        .map(|(address, values)| ScanResult::new(address, values))
        .collect()
}
