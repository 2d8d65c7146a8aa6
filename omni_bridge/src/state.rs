//! Live device state shared between the sampler task and the control loop.
//!
//! The sampler owns the driver-facing fields (position, velocity histories,
//! joints, buttons, transform); the control loop owns the commanded force,
//! button edge bookkeeping and the lock flag. Both sides take the mutex
//! only long enough to copy in or out, so neither can stall the other for
//! more than a few field copies.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use omni_common::regions::{ButtonEvent, OmniState};

use crate::driver::RawSample;
use crate::velocity::VelocityFilter;

/// Handle to the live device state.
pub type SharedState = Arc<Mutex<OmniState>>;

/// Allocate a zeroed shared state.
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(OmniState::default()))
}

/// Milliseconds since the Unix epoch; clamps to zero if the clock is
/// somehow before the epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Ingest one raw device sample (sampler side): run the velocity filter
/// and copy the driver-owned fields into `state`.
pub fn ingest_sample(state: &mut OmniState, filter: &VelocityFilter, sample: &RawSample) {
    filter.update(state, sample.position);

    state.rot = sample.rot;
    state.joints = sample.joints;
    state.transform = sample.transform;
    state.buttons = sample.buttons;

    // Mapped joint array; slot 0 is a placeholder kept for layout parity
    // with the consumer-side bindings.
    state.thetas = [
        0.0,
        sample.joints.x as f32,
        sample.joints.y as f32,
        (sample.joints.z - sample.joints.y) as f32,
        sample.rot.x as f32,
        sample.rot.y as f32,
        sample.rot.z as f32,
    ];
}

/// Process button transitions (loop side). On a transition the event is
/// rewritten and a simultaneous both-pressed edge toggles the lock flag
/// exactly once; a sustained press does not re-toggle.
pub fn update_buttons(state: &mut OmniState, event: &mut ButtonEvent) {
    if state.buttons == state.buttons_prev {
        return;
    }
    if state.buttons[0] == 1 && state.buttons[1] == 1 {
        state.lock ^= 1;
    }
    event.grey_button = state.buttons[0];
    event.white_button = state.buttons[1];
    state.buttons_prev = state.buttons;
}
