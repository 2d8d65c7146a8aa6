//! Force safety policy.
//!
//! Turns consumer feedback into the commanded force written back to the
//! device: viscous damping against the measured velocity, plus a position
//! lock spring that fully overrides the consumer force while engaged.

use omni_common::regions::{OmniFeedback, OmniState, ShmVector3d};

/// Gains of the force safety policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceParams {
    /// Viscous damping against measured velocity [N·s/mm].
    pub damping: f64,
    /// Spring stiffness pulling toward the lock anchor [N/mm].
    pub lock_stiffness: f64,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            damping: 0.001,
            lock_stiffness: 0.04,
        }
    }
}

/// Apply one cycle of the force policy to `state` given fresh `feedback`.
///
/// The lock anchor is refreshed from the feedback position every cycle
/// regardless of lock state, so re-engaging the lock always uses the
/// freshest anchor. While locked the consumer force is ignored entirely.
pub fn command_force(params: &ForceParams, state: &mut OmniState, feedback: &OmniFeedback) {
    state.lock_pos = feedback.position;

    let damping = state.velocity * params.damping;
    state.force = if state.lock != 0 {
        (state.lock_pos - state.position) * params.lock_stiffness - damping
    } else {
        feedback.force - damping
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3(x: f64, y: f64, z: f64) -> ShmVector3d {
        ShmVector3d { x, y, z }
    }

    #[test]
    fn unlocked_passes_feedback_minus_damping() {
        let params = ForceParams::default();
        let mut state = OmniState::default();
        state.velocity = vec3(100.0, 0.0, -100.0);
        let feedback = OmniFeedback {
            force: vec3(1.0, 2.0, 3.0),
            position: vec3(5.0, 6.0, 7.0),
        };

        command_force(&params, &mut state, &feedback);

        assert!((state.force.x - (1.0 - 0.1)).abs() < 1e-12);
        assert!((state.force.y - 2.0).abs() < 1e-12);
        assert!((state.force.z - (3.0 + 0.1)).abs() < 1e-12);
        assert_eq!(state.lock_pos, feedback.position);
    }

    #[test]
    fn locked_overrides_feedback_with_spring() {
        let params = ForceParams::default();
        let mut state = OmniState::default();
        state.lock = 1;
        state.position = vec3(10.0, 0.0, 0.0);
        state.velocity = vec3(0.0, 50.0, 0.0);
        let feedback = OmniFeedback {
            force: vec3(99.0, 99.0, 99.0), // must be ignored while locked
            position: vec3(0.0, 0.0, 0.0),
        };

        command_force(&params, &mut state, &feedback);

        assert!((state.force.x - 0.04 * (0.0 - 10.0)).abs() < 1e-12);
        assert!((state.force.y - (-0.001 * 50.0)).abs() < 1e-12);
        assert!(state.force.z.abs() < 1e-12);
    }

    #[test]
    fn anchor_refreshes_every_cycle_even_unlocked() {
        let params = ForceParams::default();
        let mut state = OmniState::default();
        state.lock_pos = vec3(1.0, 1.0, 1.0);
        let feedback = OmniFeedback {
            force: ShmVector3d::default(),
            position: vec3(4.0, 5.0, 6.0),
        };

        command_force(&params, &mut state, &feedback);
        assert_eq!(state.lock_pos, vec3(4.0, 5.0, 6.0));
    }

    #[test]
    fn finite_inputs_yield_finite_force() {
        let params = ForceParams::default();
        let mut state = OmniState::default();
        state.velocity = vec3(1e9, -1e9, 1e9);
        state.position = vec3(-1e9, 1e9, -1e9);
        state.lock = 1;
        let feedback = OmniFeedback {
            force: vec3(1e9, 1e9, 1e9),
            position: vec3(1e9, -1e9, 1e9),
        };

        command_force(&params, &mut state, &feedback);
        for c in state.force.to_array() {
            assert!(c.is_finite());
        }
    }
}
