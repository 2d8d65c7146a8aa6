//! Soft real-time control loop.
//!
//! Owns the channel and the sampling task. Each cycle derives the joint
//! and button views from the shared state, publishes a full snapshot,
//! fetches the latest consumer feedback and runs the force policy. Timing
//! is soft: an overrun shortens or skips the sleep but never aborts a
//! cycle, and shutdown is cooperative at cycle boundaries.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use omni_common::config::BridgeConfig;
use omni_common::consts::DEVICE_SAMPLE_PERIOD_S;
use omni_common::regions::{JointState, ReadRegion};
use omni_shm::ShmChannel;

use crate::driver::{DeviceError, HapticDriver};
use crate::force::{command_force, ForceParams};
use crate::sampler::Sampler;
use crate::shutdown::ShutdownToken;
use crate::state::{new_shared_state, now_ms, update_buttons, SharedState};
use crate::velocity::VelocityFilter;

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
    ShuttingDown,
    Terminated,
}

/// Timing counters accumulated while running.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    /// Completed cycles.
    pub cycles: u64,
    /// Cycles whose work exceeded the configured period.
    pub overruns: u64,
    /// Longest observed cycle work time.
    pub worst: Duration,
}

impl CycleStats {
    fn record(&mut self, elapsed: Duration, period: Duration) {
        self.cycles += 1;
        if elapsed > period {
            self.overruns += 1;
        }
        if elapsed > self.worst {
            self.worst = elapsed;
        }
    }
}

/// The bridge control loop.
pub struct ControlLoop {
    config: BridgeConfig,
    state: SharedState,
    channel: ShmChannel,
    sampler: Sampler,
    params: ForceParams,
    shutdown: ShutdownToken,
    loop_state: LoopState,
    stats: CycleStats,
}

impl ControlLoop {
    /// Initialize the bridge: start the sampling task and open the channel.
    ///
    /// Device acquisition failure is fatal and nothing is started. Channel
    /// unavailability is not: the loop runs with a closed channel and its
    /// cycles degrade to no-ops until the process is restarted.
    pub fn new(
        config: BridgeConfig,
        driver: Box<dyn HapticDriver>,
        shutdown: ShutdownToken,
    ) -> Result<Self, DeviceError> {
        let state = new_shared_state();
        let filter = VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S)
            .map_err(|e| DeviceError::InitFailed(e.to_string()))?;
        let sampler = Sampler::spawn(driver, SharedState::clone(&state), filter)?;

        let mut channel = ShmChannel::new(config.key);
        if let Err(e) = channel.open() {
            warn!(key = config.key, error = %e, "channel unavailable, cycles will be no-ops");
        }

        Ok(Self {
            config,
            state,
            channel,
            sampler,
            params: ForceParams::default(),
            shutdown,
            loop_state: LoopState::Init,
            stats: CycleStats::default(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.loop_state
    }

    /// Timing counters so far.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Run until shutdown is requested.
    ///
    /// A mid-run sampler fault ends further device ticks but not the
    /// loop: the fault is logged once and the cycles keep publishing the
    /// last-known state until the shutdown token trips. Teardown always
    /// happens (sampler stopped, channel closed, state `Terminated`).
    pub fn run(&mut self) {
        let period = self.config.loop_period();
        info!(
            key = self.config.key,
            rate_hz = self.config.rate_hz,
            "control loop running"
        );
        self.loop_state = LoopState::Running;

        // The snapshot persists across cycles: the button event inside it
        // is only rewritten on a transition.
        let mut snapshot = ReadRegion::default();
        let mut fault_logged = false;
        let mut next = Instant::now() + period;

        while !self.shutdown.is_requested() {
            if self.sampler.has_faulted() && !fault_logged {
                error!("sampling task faulted, cycles continue on last-known state");
                fault_logged = true;
            }
            let started = Instant::now();

            if self.channel.is_open() {
                self.cycle(&mut snapshot);
            }

            self.stats.record(started.elapsed(), period);

            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
                next += period;
            } else {
                // Overrun: skip the sleep and rebase the deadline.
                next = now + period;
            }
        }

        self.loop_state = LoopState::ShuttingDown;
        info!(
            cycles = self.stats.cycles,
            overruns = self.stats.overruns,
            worst_us = self.stats.worst.as_micros() as u64,
            "control loop shutting down"
        );
        self.sampler.stop();
        self.channel.close();
        self.loop_state = LoopState::Terminated;
    }

    fn cycle(&mut self, snapshot: &mut ReadRegion) {
        let mut event = snapshot.button;
        let joint;
        {
            let mut st = self.state.lock();
            update_buttons(&mut st, &mut event);
            joint = JointState::from_thetas(now_ms(), &st.thetas);
            snapshot.omni = *st;
        }
        snapshot.joint = joint;
        snapshot.button = event;

        self.channel.publish(snapshot);
        let feedback = self.channel.fetch();

        let mut st = self.state.lock();
        command_force(&self.params, &mut st, &feedback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_record_overruns_and_worst() {
        let mut stats = CycleStats::default();
        let period = Duration::from_millis(1);
        stats.record(Duration::from_micros(200), period);
        stats.record(Duration::from_micros(1500), period);
        stats.record(Duration::from_micros(900), period);
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.overruns, 1);
        assert_eq!(stats.worst, Duration::from_micros(1500));
    }
}
