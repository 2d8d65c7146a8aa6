//! Workspace-wide constants.

/// Default System V IPC key identifying the bridge segment.
///
/// Deployments running several devices override this per process via
/// `--key` or the TOML config.
pub const DEFAULT_SHM_KEY: i32 = 777;

/// Default control loop frequency [Hz].
pub const DEFAULT_RATE_HZ: f64 = 1000.0;

/// Fixed period of the raw-sample task [s] (1 kHz device scheduler).
pub const DEVICE_SAMPLE_PERIOD_S: f64 = 0.001;

/// Upper bound accepted for the configurable loop rate [Hz].
pub const MAX_RATE_HZ: f64 = 10_000.0;
