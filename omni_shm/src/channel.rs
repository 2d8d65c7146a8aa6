//! System V shared-memory channel.
//!
//! A [`ShmChannel`] wraps one `shmget`/`shmat` mapping of the fixed 624-byte
//! segment. The first process to open a key creates and zero-fills the
//! segment and becomes its owner; later opens attach to the existing one.
//! Only the owner removes the segment on close.
//!
//! Reads and writes are raw bulk copies with no locking across processes.
//! Producer and consumer write disjoint regions, so a torn read can only
//! mix two adjacent cycles of the same writer, which the protocol
//! tolerates.

use std::ptr;

use nix::errno::Errno;
use tracing::{debug, warn};

use omni_common::regions::{OmniFeedback, ReadRegion, WriteRegion, READ_REGION_OFFSET, SEGMENT_SIZE};

use crate::discovery;
use crate::error::{ShmError, ShmResult};

/// One attachment to the shared segment for a given key.
pub struct ShmChannel {
    key: i32,
    shmid: i32,
    addr: *mut u8,
    creator: bool,
}

// The raw pointer is an owned process-wide mapping, not a shared Rust
// object; moving the channel to another thread is fine.
unsafe impl Send for ShmChannel {}

impl ShmChannel {
    /// Create a channel handle for `key` without touching the segment yet.
    pub fn new(key: i32) -> Self {
        Self {
            key,
            shmid: -1,
            addr: ptr::null_mut(),
            creator: false,
        }
    }

    /// Attach to the segment for this key, creating it if it does not
    /// exist. Idempotent: opening an already open channel is a no-op.
    pub fn open(&mut self) -> ShmResult<()> {
        if self.is_open() {
            return Ok(());
        }

        // Try to attach to an existing segment first.
        let shmid = unsafe { libc::shmget(self.key, SEGMENT_SIZE, 0o666) };
        let (shmid, created) = if shmid >= 0 {
            (shmid, false)
        } else {
            let shmid = unsafe {
                libc::shmget(
                    self.key,
                    SEGMENT_SIZE,
                    libc::IPC_CREAT | libc::IPC_EXCL | 0o666,
                )
            };
            if shmid < 0 {
                return Err(ShmError::Unavailable {
                    key: self.key,
                    errno: Errno::last_raw(),
                });
            }
            (shmid, true)
        };

        self.attach_id(shmid, created)?;

        if created {
            // Fresh segment: defined initial content is all zeros.
            unsafe { ptr::write_bytes(self.addr, 0, SEGMENT_SIZE) };
            if let Err(e) = discovery::write_segment_info(self.key, SEGMENT_SIZE) {
                warn!(key = self.key, error = %e, "failed to write segment metadata");
            }
            debug!(key = self.key, shmid, "created shared segment");
        } else {
            debug!(key = self.key, shmid, "attached to existing shared segment");
        }
        Ok(())
    }

    /// Attach to an existing segment only; never creates one.
    pub fn attach(&mut self) -> ShmResult<()> {
        if self.is_open() {
            return Ok(());
        }
        let shmid = unsafe { libc::shmget(self.key, SEGMENT_SIZE, 0o666) };
        if shmid < 0 {
            return Err(ShmError::NotFound { key: self.key });
        }
        self.attach_id(shmid, false)?;
        debug!(key = self.key, shmid, "attached to shared segment");
        Ok(())
    }

    fn attach_id(&mut self, shmid: i32, created: bool) -> ShmResult<()> {
        let addr = unsafe { libc::shmat(shmid, ptr::null(), 0) };
        if addr as isize == -1 {
            let errno = Errno::last_raw();
            if created {
                // Nothing can use a segment we failed to map; drop it.
                unsafe { libc::shmctl(shmid, libc::IPC_RMID, ptr::null_mut()) };
            }
            return Err(ShmError::AttachFailed {
                key: self.key,
                errno,
            });
        }
        self.shmid = shmid;
        self.addr = addr.cast();
        self.creator = created;
        Ok(())
    }

    /// Whether the segment is currently mapped.
    pub fn is_open(&self) -> bool {
        !self.addr.is_null()
    }

    /// Whether this channel created the segment and owns its removal.
    pub fn is_creator(&self) -> bool {
        self.creator
    }

    /// The key this channel addresses.
    pub fn key(&self) -> i32 {
        self.key
    }

    /// Publish a full [`ReadRegion`] snapshot (bridge side).
    ///
    /// No-op when the channel is closed.
    pub fn publish(&mut self, region: &ReadRegion) {
        if !self.is_open() {
            return;
        }
        unsafe {
            let dst = self.addr.add(READ_REGION_OFFSET).cast::<ReadRegion>();
            ptr::write_volatile(dst, *region);
        }
    }

    /// Fetch the consumer feedback from the write region (bridge side).
    ///
    /// Returns zeroed feedback when the channel is closed.
    pub fn fetch(&self) -> OmniFeedback {
        if !self.is_open() {
            return OmniFeedback::default();
        }
        unsafe {
            let src = self.addr.cast::<WriteRegion>();
            ptr::read_volatile(src).feedback
        }
    }

    /// Read the current [`ReadRegion`] snapshot (consumer side).
    ///
    /// Returns a zeroed region when the channel is closed.
    pub fn snapshot(&self) -> ReadRegion {
        if !self.is_open() {
            return ReadRegion::default();
        }
        unsafe {
            let src = self.addr.add(READ_REGION_OFFSET).cast::<ReadRegion>();
            ptr::read_volatile(src)
        }
    }

    /// Write consumer feedback into the write region (consumer side).
    ///
    /// No-op when the channel is closed.
    pub fn push_feedback(&mut self, feedback: &OmniFeedback) {
        if !self.is_open() {
            return;
        }
        unsafe {
            let dst = self.addr.cast::<WriteRegion>();
            ptr::write_volatile(
                dst,
                WriteRegion {
                    feedback: *feedback,
                },
            );
        }
    }

    /// Detach from the segment; the owner also removes it and its
    /// metadata file. Idempotent.
    pub fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        let rc = unsafe { libc::shmdt(self.addr.cast()) };
        if rc != 0 {
            warn!(
                key = self.key,
                errno = Errno::last_raw(),
                "shmdt failed on close"
            );
        }
        if self.creator {
            let rc = unsafe { libc::shmctl(self.shmid, libc::IPC_RMID, ptr::null_mut()) };
            if rc != 0 {
                warn!(
                    key = self.key,
                    errno = Errno::last_raw(),
                    "failed to remove shared segment"
                );
            }
            if let Err(e) = discovery::remove_segment_info(self.key) {
                warn!(key = self.key, error = %e, "failed to remove segment metadata");
            }
            debug!(key = self.key, "destroyed shared segment");
        } else {
            debug!(key = self.key, "detached from shared segment");
        }
        self.addr = ptr::null_mut();
        self.shmid = -1;
        self.creator = false;
    }
}

impl Drop for ShmChannel {
    fn drop(&mut self) {
        self.close();
    }
}
