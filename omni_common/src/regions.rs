//! Byte-exact wire layout of the shared segment.
//!
//! The segment is a single fixed-size block: a [`WriteRegion`] (written by
//! the external consumer) followed immediately by a [`ReadRegion`] (written
//! by the bridge). All structs are `#[repr(C)]` with explicit padding and
//! fixed-size fields only (no `String`, no `Vec`), so the same byte layout
//! is reproducible from ctypes or C on the consumer side.
//!
//! ```text
//! offset 0                        WriteRegion   (48 B)
//! offset READ_REGION_OFFSET       ReadRegion   (576 B)
//!                                 total        (624 B)
//! ```

use core::f64::consts::PI;
use static_assertions::const_assert_eq;

/// A 3-component `f64` vector as stored on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct ShmVector3d {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

const_assert_eq!(core::mem::size_of::<ShmVector3d>(), 24);

impl ShmVector3d {
    /// Build from a `[x, y, z]` array.
    #[inline]
    pub const fn from_array(v: [f64; 3]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }

    /// Return the components as a `[x, y, z]` array.
    #[inline]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl core::ops::Add for ShmVector3d {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl core::ops::Sub for ShmVector3d {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl core::ops::Mul<f64> for ShmVector3d {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

/// Full kinematic/force state of the device as published every cycle.
///
/// The three `inp_vel*`/`out_vel*` triples and the two `pos_hist*` slots
/// are the velocity filter's ring buffers; they ship on the wire so a
/// consumer can reconstruct the filter state if it wants to. `lock` is a
/// single byte (0 = free, 1 = position lock engaged).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct OmniState {
    /// Stylus position [mm].
    pub position: ShmVector3d,
    /// Filtered velocity [mm/s] (derived, see the velocity estimator).
    pub velocity: ShmVector3d,
    /// Raw velocity estimate history, newest first.
    pub inp_vel1: ShmVector3d,
    /// Raw velocity estimate, one cycle older.
    pub inp_vel2: ShmVector3d,
    /// Raw velocity estimate, two cycles older.
    pub inp_vel3: ShmVector3d,
    /// Filtered velocity history, newest first.
    pub out_vel1: ShmVector3d,
    /// Filtered velocity, one cycle older.
    pub out_vel2: ShmVector3d,
    /// Filtered velocity, two cycles older.
    pub out_vel3: ShmVector3d,
    /// Position one sample ago.
    pub pos_hist1: ShmVector3d,
    /// Position two samples ago.
    pub pos_hist2: ShmVector3d,
    /// Gimbal/rotation angles [rad].
    pub rot: ShmVector3d,
    /// Raw joint angles [rad].
    pub joints: ShmVector3d,
    /// Commanded force [N] (loop-owned field).
    pub force: ShmVector3d,
    /// Mapped joint angles: `[0, j0, j1, j2-j1, r0, r1, r2]`.
    pub thetas: [f32; 7],
    /// Current button states (grey, white).
    pub buttons: [i32; 2],
    /// Button states from the previous transition check.
    pub buttons_prev: [i32; 2],
    /// Position-lock flag (0 = free, 1 = locked).
    pub lock: u8,
    /// Explicit padding to realign the following f64 fields.
    pub _pad: [u8; 3],
    /// Lock anchor position [mm], refreshed from feedback every cycle.
    pub lock_pos: ShmVector3d,
    /// 4x4 end-effector transform, row order as delivered by the device.
    pub transform: [f64; 16],
}

const_assert_eq!(core::mem::size_of::<OmniState>(), 512);

/// Remapped 6-joint view of the device, recomputed every loop cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct JointState {
    /// Timestamp [ms since the Unix epoch].
    pub stamp: u64,
    /// Waist angle [rad].
    pub waist: f64,
    /// Shoulder angle [rad].
    pub shoulder: f64,
    /// Elbow angle [rad].
    pub elbow: f64,
    /// First wrist angle [rad].
    pub wrist1: f64,
    /// Second wrist angle [rad].
    pub wrist2: f64,
    /// Third wrist angle [rad].
    pub wrist3: f64,
}

const_assert_eq!(core::mem::size_of::<JointState>(), 56);

impl JointState {
    /// Derive the 6-joint view from the mapped `thetas` array.
    ///
    /// Fixed sign/offset remapping; `thetas[0]` is a placeholder and is
    /// not used.
    pub fn from_thetas(stamp_ms: u64, thetas: &[f32; 7]) -> Self {
        Self {
            stamp: stamp_ms,
            waist: -f64::from(thetas[1]),
            shoulder: f64::from(thetas[2]),
            elbow: f64::from(thetas[3]),
            wrist1: -f64::from(thetas[4]) + PI,
            wrist2: -f64::from(thetas[5]) - 3.0 * PI / 4.0,
            wrist3: -f64::from(thetas[6]) - PI,
        }
    }
}

/// Edge-triggered button snapshot; rewritten only on a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct ButtonEvent {
    /// Grey (front) button state.
    pub grey_button: i32,
    /// White (rear) button state.
    pub white_button: i32,
}

const_assert_eq!(core::mem::size_of::<ButtonEvent>(), 8);

/// Feedback supplied by the external consumer: desired force plus the
/// anchor position used when the position lock engages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct OmniFeedback {
    /// Requested feedback force [N].
    pub force: ShmVector3d,
    /// Anchor position for the lock spring [mm].
    pub position: ShmVector3d,
}

const_assert_eq!(core::mem::size_of::<OmniFeedback>(), 48);

/// Region written by the external consumer, read by the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct WriteRegion {
    /// Feedback force and lock anchor.
    pub feedback: OmniFeedback,
}

const_assert_eq!(core::mem::size_of::<WriteRegion>(), 48);

/// Region written by the bridge, read by the external consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct ReadRegion {
    /// Full device state snapshot.
    pub omni: OmniState,
    /// Remapped joint view.
    pub joint: JointState,
    /// Last button transition.
    pub button: ButtonEvent,
}

const_assert_eq!(core::mem::size_of::<ReadRegion>(), 576);

/// Byte offset of the [`ReadRegion`] inside the segment.
pub const READ_REGION_OFFSET: usize = core::mem::size_of::<WriteRegion>();

/// Total segment size: one [`WriteRegion`] followed by one [`ReadRegion`].
pub const SEGMENT_SIZE: usize =
    core::mem::size_of::<WriteRegion>() + core::mem::size_of::<ReadRegion>();

const_assert_eq!(SEGMENT_SIZE, 624);

// Large wire structs get Default via mem::zeroed(). Safe: every field is a
// numeric primitive or a fixed-size array thereof, and zero is valid for
// all of them. Zero is also the defined pre-first-write segment content.
macro_rules! impl_default_zeroed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Default for $ty {
                fn default() -> Self {
                    // SAFETY: all fields are plain numerics; all-zeros is valid.
                    unsafe { core::mem::zeroed() }
                }
            }
        )*
    };
}

impl_default_zeroed!(OmniState, ReadRegion, WriteRegion);

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn wire_struct_sizes() {
        assert_eq!(size_of::<ShmVector3d>(), 24);
        assert_eq!(size_of::<OmniState>(), 512);
        assert_eq!(size_of::<JointState>(), 56);
        assert_eq!(size_of::<ButtonEvent>(), 8);
        assert_eq!(size_of::<OmniFeedback>(), 48);
        assert_eq!(size_of::<WriteRegion>(), 48);
        assert_eq!(size_of::<ReadRegion>(), 576);
        assert_eq!(SEGMENT_SIZE, 624);
        assert_eq!(READ_REGION_OFFSET, 48);
    }

    #[test]
    fn omni_state_field_offsets() {
        // The consumer-side ctypes mirror relies on these exact offsets.
        assert_eq!(offset_of!(OmniState, position), 0);
        assert_eq!(offset_of!(OmniState, velocity), 24);
        assert_eq!(offset_of!(OmniState, force), 288);
        assert_eq!(offset_of!(OmniState, thetas), 312);
        assert_eq!(offset_of!(OmniState, buttons), 340);
        assert_eq!(offset_of!(OmniState, buttons_prev), 348);
        assert_eq!(offset_of!(OmniState, lock), 356);
        assert_eq!(offset_of!(OmniState, lock_pos), 360);
        assert_eq!(offset_of!(OmniState, transform), 384);
    }

    #[test]
    fn read_region_field_offsets() {
        assert_eq!(offset_of!(ReadRegion, omni), 0);
        assert_eq!(offset_of!(ReadRegion, joint), 512);
        assert_eq!(offset_of!(ReadRegion, button), 568);
    }

    #[test]
    fn defaults_are_zeroed() {
        let omni = OmniState::default();
        assert_eq!(omni.position, ShmVector3d::default());
        assert_eq!(omni.lock, 0);
        assert_eq!(omni.thetas, [0.0f32; 7]);
        assert_eq!(omni.transform, [0.0f64; 16]);

        let w = WriteRegion::default();
        assert_eq!(w.feedback.force.to_array(), [0.0; 3]);
    }

    #[test]
    fn joint_state_remap() {
        let thetas: [f32; 7] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let js = JointState::from_thetas(1234, &thetas);
        assert_eq!(js.stamp, 1234);
        assert!((js.waist - (-0.1)).abs() < 1e-6);
        assert!((js.shoulder - 0.2).abs() < 1e-6);
        assert!((js.elbow - 0.3).abs() < 1e-6);
        assert!((js.wrist1 - (-0.4 + PI)).abs() < 1e-6);
        assert!((js.wrist2 - (-0.5 - 3.0 * PI / 4.0)).abs() < 1e-6);
        assert!((js.wrist3 - (-0.6 - PI)).abs() < 1e-6);
    }

    #[test]
    fn vector_array_roundtrip() {
        let v = ShmVector3d::from_array([1.0, -2.5, 3.25]);
        assert_eq!(v.to_array(), [1.0, -2.5, 3.25]);
    }
}
