//! High-rate sampling task.
//!
//! Runs the driver at the fixed device rate on its own thread, feeding the
//! shared state and pushing the commanded force back to the device each
//! tick. With the `rt` feature the thread locks its memory and requests a
//! SCHED_FIFO priority above the control loop; without it the task paces
//! itself with plain sleeps, which is fine for simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use omni_common::consts::DEVICE_SAMPLE_PERIOD_S;

use crate::driver::{DeviceError, HapticDriver};
use crate::state::{ingest_sample, SharedState};
use crate::velocity::VelocityFilter;

#[cfg(feature = "rt")]
const SAMPLER_RT_PRIORITY: i32 = 80;

/// Handle to the running sampling task.
pub struct Sampler {
    stop: Arc<AtomicBool>,
    faulted: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Initialize the driver and start the sampling thread.
    ///
    /// Fails if device acquisition or calibration fails; in that case no
    /// thread is started.
    pub fn spawn(
        mut driver: Box<dyn HapticDriver>,
        state: SharedState,
        filter: VelocityFilter,
    ) -> Result<Self, DeviceError> {
        driver.init()?;
        info!("device initialized, starting sampling task");

        let stop = Arc::new(AtomicBool::new(false));
        let faulted = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            let faulted = Arc::clone(&faulted);
            std::thread::Builder::new()
                .name("omni-sampler".into())
                .spawn(move || run(driver.as_mut(), &state, &filter, &stop, &faulted))
                .map_err(|e| DeviceError::SchedulerFault(e.to_string()))?
        };

        Ok(Self {
            stop,
            faulted,
            handle: Some(handle),
        })
    }

    /// Whether the sampling task died on a fatal driver error.
    pub fn has_faulted(&self) -> bool {
        self.faulted.load(Ordering::SeqCst)
    }

    /// Stop the task and wait for it to finish. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("sampling task panicked");
                self.faulted.store(true, Ordering::SeqCst);
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    driver: &mut dyn HapticDriver,
    state: &SharedState,
    filter: &VelocityFilter,
    stop: &AtomicBool,
    faulted: &AtomicBool,
) {
    #[cfg(feature = "rt")]
    setup_rt();

    let period = Duration::from_secs_f64(DEVICE_SAMPLE_PERIOD_S);
    let mut next = Instant::now() + period;

    while !stop.load(Ordering::SeqCst) {
        match driver.sample() {
            Ok(sample) => {
                let force = {
                    let mut st = state.lock();
                    ingest_sample(&mut st, filter, &sample);
                    st.force
                };
                if let Err(e) = driver.apply_force(force) {
                    if e.is_fatal() {
                        error!(error = %e, "force sink failed, stopping sampling");
                        faulted.store(true, Ordering::SeqCst);
                        break;
                    }
                    warn!(error = %e, "force write failed");
                }
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "device fault, stopping sampling");
                faulted.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => warn!(error = %e, "sample dropped"),
        }

        // Absolute pacing; a late tick shortens the sleep instead of
        // shifting all later deadlines.
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        }
        next += period;
    }

    driver.shutdown();
    info!("sampling task stopped");
}

/// Lock memory and raise this thread to a SCHED_FIFO priority.
#[cfg(feature = "rt")]
fn setup_rt() {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    if let Err(e) = mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        warn!(error = %e, "mlockall failed, running without locked memory");
    }

    let param = libc::sched_param {
        sched_priority: SAMPLER_RT_PRIORITY,
    };
    // SAFETY: plain libc call with a valid param struct for this thread.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc != 0 {
        warn!(rc, "SCHED_FIFO unavailable, sampling at normal priority");
    }
}
