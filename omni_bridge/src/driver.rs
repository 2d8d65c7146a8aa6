//! Raw-sample source abstraction.
//!
//! The device SDK is treated as an opaque source of raw kinematic samples
//! and a sink for commanded forces. [`SimDriver`] stands in for real
//! hardware: it synthesizes smooth motion at the device rate, which is
//! enough to exercise the full bridge path end to end.

use thiserror::Error;

use omni_common::consts::DEVICE_SAMPLE_PERIOD_S;
use omni_common::regions::ShmVector3d;

/// Driver-level failures.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device acquisition or calibration failed; the bridge cannot start.
    #[error("device initialization failed: {0}")]
    InitFailed(String),
    /// The sampling scheduler faulted; sampling cannot continue.
    #[error("device scheduler fault: {0}")]
    SchedulerFault(String),
    /// A single sample or force write failed; the next cycle may succeed.
    #[error("transient device error: {0}")]
    Transient(String),
}

impl DeviceError {
    /// Fatal errors stop the sampling task; transient ones are logged and
    /// retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InitFailed(_) | Self::SchedulerFault(_))
    }
}

/// One raw kinematic sample from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    /// Stylus position [mm].
    pub position: ShmVector3d,
    /// Gimbal angles [rad].
    pub rot: ShmVector3d,
    /// Base joint angles [rad].
    pub joints: ShmVector3d,
    /// 4x4 end-effector transform.
    pub transform: [f64; 16],
    /// Button states (grey, white).
    pub buttons: [i32; 2],
}

/// A raw-sample source plus force sink.
///
/// `init` is called once before the sampling task starts; `sample` and
/// `apply_force` run on the sampling task at the device rate; `shutdown`
/// is called once when sampling stops.
pub trait HapticDriver: Send {
    fn init(&mut self) -> Result<(), DeviceError>;
    fn sample(&mut self) -> Result<RawSample, DeviceError>;
    fn apply_force(&mut self, force: ShmVector3d) -> Result<(), DeviceError>;
    fn shutdown(&mut self);
}

/// Software stand-in for the hardware: moves the stylus at a constant
/// velocity and reports fixed button states.
#[derive(Debug, Clone)]
pub struct SimDriver {
    /// Simulated stylus velocity [mm/s].
    pub velocity: ShmVector3d,
    /// Button states to report.
    pub buttons: [i32; 2],
    /// Fault with a scheduler error after this many samples, if set.
    pub fail_after: Option<u64>,
    ticks: u64,
    position: ShmVector3d,
    last_force: ShmVector3d,
}

impl SimDriver {
    pub fn new(velocity: ShmVector3d) -> Self {
        Self {
            velocity,
            buttons: [0, 0],
            fail_after: None,
            ticks: 0,
            position: ShmVector3d::default(),
            last_force: ShmVector3d::default(),
        }
    }

    /// Last force handed to the sink.
    pub fn last_force(&self) -> ShmVector3d {
        self.last_force
    }

    /// Number of samples produced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new(ShmVector3d::default())
    }
}

impl HapticDriver for SimDriver {
    fn init(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn sample(&mut self) -> Result<RawSample, DeviceError> {
        if let Some(limit) = self.fail_after {
            if self.ticks >= limit {
                return Err(DeviceError::SchedulerFault("simulated fault".into()));
            }
        }
        self.ticks += 1;
        self.position = self.position + self.velocity * DEVICE_SAMPLE_PERIOD_S;

        let mut transform = [0.0; 16];
        // Identity rotation with the position in the last column.
        transform[0] = 1.0;
        transform[5] = 1.0;
        transform[10] = 1.0;
        transform[12] = self.position.x;
        transform[13] = self.position.y;
        transform[14] = self.position.z;
        transform[15] = 1.0;

        Ok(RawSample {
            position: self.position,
            rot: ShmVector3d::default(),
            joints: ShmVector3d::default(),
            transform,
            buttons: self.buttons,
        })
    }

    fn apply_force(&mut self, force: ShmVector3d) -> Result<(), DeviceError> {
        self.last_force = force;
        Ok(())
    }

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(DeviceError::InitFailed("x".into()).is_fatal());
        assert!(DeviceError::SchedulerFault("x".into()).is_fatal());
        assert!(!DeviceError::Transient("x".into()).is_fatal());
    }

    #[test]
    fn sim_driver_integrates_position() {
        let mut driver = SimDriver::new(ShmVector3d::from_array([1000.0, 0.0, 0.0]));
        driver.init().unwrap();
        for _ in 0..10 {
            driver.sample().unwrap();
        }
        let s = driver.sample().unwrap();
        // 11 ms at 1000 mm/s.
        assert!((s.position.x - 11.0).abs() < 1e-9);
        assert_eq!(s.transform[12], s.position.x);
        assert_eq!(driver.ticks(), 11);
    }

    #[test]
    fn sim_driver_faults_after_limit() {
        let mut driver = SimDriver::default();
        driver.fail_after = Some(2);
        assert!(driver.sample().is_ok());
        assert!(driver.sample().is_ok());
        let err = driver.sample().unwrap_err();
        assert!(err.is_fatal());
    }
}
