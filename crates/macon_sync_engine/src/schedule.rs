//! Sweep scheduling.

use std::time::Duration;

/// Decides when the next sweep starts, and whether there is one.
pub trait Ticker {
    /// Waits for the next sweep. Returns false to stop the loop.
    fn tick(&mut self) -> bool;
}

/// Sleeps a fixed interval between sweeps and never stops.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    interval: Duration,
}

impl IntervalTicker {
    /// Creates a ticker with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The interval between sweeps.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> bool {
        std::thread::sleep(self.interval);
        true
    }
}

/// Allows a fixed number of sweeps without waiting.
#[derive(Debug, Clone)]
pub struct CountdownTicker {
    remaining: u64,
}

impl CountdownTicker {
    /// Allows `sweeps` sweeps in total. A loop always runs at least one.
    pub fn new(sweeps: u64) -> Self {
        Self {
            remaining: sweeps.saturating_sub(1),
        }
    }
}

impl Ticker for CountdownTicker {
    fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
