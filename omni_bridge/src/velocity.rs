//! Velocity estimation from raw position samples.
//!
//! A second-order backward difference gives a raw velocity estimate, which
//! then runs through a fixed 3rd-order Butterworth low-pass (roughly 20 Hz
//! cutoff at the 1 kHz device rate). The difference and filter histories
//! live in the wire-level state struct so consumers can see them.

use thiserror::Error;

use omni_common::consts::DEVICE_SAMPLE_PERIOD_S;
use omni_common::regions::{OmniState, ShmVector3d};

// butter(3, 20/500) numerator/denominator, full precision. The published
// data sheet rounds these to 4-5 digits, but the rounded set has a DC gain
// of 0.976 and would bias steady-state velocity by 2.4%.
const A0: f64 = 2.196_062_112_253_817e-4;
const A1: f64 = 6.588_186_336_761_449e-4;
const B0: f64 = -2.748_835_809_214_676;
const B1: f64 = 2.528_231_219_142_559;
const B2: f64 = -0.777_638_560_238_080;

/// Errors constructing a [`VelocityFilter`].
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    /// The filter coefficients are fixed for the 1 kHz device rate; any
    /// other sample period silently invalidates them, so it is rejected.
    #[error("unsupported sample period {0} s: filter constants assume {DEVICE_SAMPLE_PERIOD_S} s")]
    UnsupportedSamplePeriod(f64),
}

/// Fixed-coefficient velocity filter for one device sample period.
#[derive(Debug, Clone, Copy)]
pub struct VelocityFilter {
    period: f64,
}

impl VelocityFilter {
    /// Build a filter for the given sample period. Only the 1 kHz device
    /// period the constants were derived for is accepted.
    pub fn for_period(period_s: f64) -> Result<Self, FilterError> {
        if (period_s - DEVICE_SAMPLE_PERIOD_S).abs() > 1e-6 {
            return Err(FilterError::UnsupportedSamplePeriod(period_s));
        }
        Ok(Self { period: period_s })
    }

    /// Ingest one position sample: update `position`, `velocity` and all
    /// history slots in `state`. Always produces a value; the zeroed
    /// histories at startup yield a bounded transient over the first few
    /// samples.
    pub fn update(&self, state: &mut OmniState, position: ShmVector3d) {
        // Second-order backward difference over the last three samples.
        // The 2x factor folds the difference stencil's half-step into the
        // divisor.
        let raw = (position * 3.0 - state.pos_hist1 * 4.0 + state.pos_hist2) * (1.0 / (2.0 * self.period));

        let filtered = (raw + state.inp_vel3) * A0
            + (state.inp_vel1 + state.inp_vel2) * A1
            - (state.out_vel1 * B0 + state.out_vel2 * B1 + state.out_vel3 * B2);

        state.pos_hist2 = state.pos_hist1;
        state.pos_hist1 = position;
        state.position = position;

        state.inp_vel3 = state.inp_vel2;
        state.inp_vel2 = state.inp_vel1;
        state.inp_vel1 = raw;

        state.out_vel3 = state.out_vel2;
        state.out_vel2 = state.out_vel1;
        state.out_vel1 = filtered;

        state.velocity = filtered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_linear_motion(cycles: usize, speed: f64) -> OmniState {
        let filter = VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S).unwrap();
        let mut state = OmniState::default();
        for n in 0..cycles {
            let t = n as f64 * DEVICE_SAMPLE_PERIOD_S;
            let p = ShmVector3d::from_array([speed * t, 0.0, -speed * t]);
            filter.update(&mut state, p);
        }
        state
    }

    #[test]
    fn rejects_foreign_sample_periods() {
        assert!(VelocityFilter::for_period(0.002).is_err());
        assert!(VelocityFilter::for_period(0.0).is_err());
        assert!(VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S).is_ok());
    }

    #[test]
    fn stationary_input_gives_zero_velocity() {
        let filter = VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S).unwrap();
        let mut state = OmniState::default();
        let p = ShmVector3d::default();
        for _ in 0..200 {
            filter.update(&mut state, p);
        }
        assert_eq!(state.velocity, ShmVector3d::default());
    }

    #[test]
    fn converges_on_constant_velocity() {
        // Constant 100 mm/s motion; after the startup transient dies out
        // the filtered velocity must settle within 1% of the true speed.
        let state = run_linear_motion(150, 100.0);
        assert!((state.velocity.x - 100.0).abs() < 1.0, "vx = {}", state.velocity.x);
        assert!(state.velocity.y.abs() < 1e-9);
        assert!((state.velocity.z + 100.0).abs() < 1.0, "vz = {}", state.velocity.z);
    }

    #[test]
    fn startup_transient_is_reproducible() {
        // Zeroed histories define the startup behavior exactly, so two
        // identical runs must agree bit for bit.
        let a = run_linear_motion(10, 50.0);
        let b = run_linear_motion(10, 50.0);
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.out_vel3, b.out_vel3);
    }

    #[test]
    fn histories_shift_by_one_slot() {
        let filter = VelocityFilter::for_period(DEVICE_SAMPLE_PERIOD_S).unwrap();
        let mut state = OmniState::default();
        let p1 = ShmVector3d::from_array([1.0, 0.0, 0.0]);
        let p2 = ShmVector3d::from_array([2.0, 0.0, 0.0]);

        filter.update(&mut state, p1);
        let first_raw = state.inp_vel1;
        let first_out = state.out_vel1;

        filter.update(&mut state, p2);
        assert_eq!(state.pos_hist1, p2);
        assert_eq!(state.pos_hist2, p1);
        assert_eq!(state.inp_vel2, first_raw);
        assert_eq!(state.out_vel2, first_out);
    }
}
