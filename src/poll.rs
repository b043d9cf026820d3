//! Repeated execution of one operation at a fixed interval.

use crate::config::PollSettings;
use crate::output::Output;

use log::{debug, warn};
use std::io::{self, Write};
use std::thread::sleep;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    /// Number of iterations, `0` runs until the process is interrupted.
    pub count: u32,
    /// Target time between the start of two iterations.
    pub interval: Duration,
}

impl From<&PollSettings> for Poller {
    fn from(settings: &PollSettings) -> Self {
        Self::new(settings.count, settings.interval())
    }
}

impl Poller {
    pub fn new(count: u32, interval: Duration) -> Self {
        Self { count, interval }
    }

    fn has_next(&self, iteration: u32) -> bool {
        self.count == 0 || iteration < self.count
    }

    /// Run `op` once per iteration, tagging output with iterations `1..`.
    ///
    /// A failing iteration is reported on `output` and polling continues. Only a failure to write
    /// the output itself ends the loop. The iteration tag is cleared on return.
    pub fn run<O, E, F>(&self, output: &mut Output<O, E>, mut op: F) -> io::Result<()>
    where
        O: Write,
        E: Write,
        F: FnMut(&mut Output<O, E>) -> anyhow::Result<()>,
    {
        debug!("Polling {} times every {:?}.", self.count, self.interval);
        let res = self.iterate(output, &mut op);
        output.set_iteration(None);
        res
    }

    fn iterate<O, E, F>(&self, output: &mut Output<O, E>, op: &mut F) -> io::Result<()>
    where
        O: Write,
        E: Write,
        F: FnMut(&mut Output<O, E>) -> anyhow::Result<()>,
    {
        let mut iteration = 0u32;
        while self.has_next(iteration) {
            iteration = iteration.wrapping_add(1);
            output.set_iteration(Some(iteration));

            let start = Instant::now();
            if let Err(e) = op(output) {
                warn!("Iteration {iteration} failed: {e:#}");
                output.report(&e)?;
            }

            if self.has_next(iteration) {
                if let Some(remaining) = self.interval.checked_sub(start.elapsed()) {
                    sleep(remaining);
                }
            }
        }
        Ok(())
    }
}
