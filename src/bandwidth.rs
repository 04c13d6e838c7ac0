//! High speed bandwidth workaround
//!
//! At high speed, the controller frames isochronous data using only the
//! endpoint's MULT setting. When a commit is shorter or longer than what
//! MULT implies, the host sees corrupt microframes. The controller here
//! keeps MULT in step with the data that's queued in endpoint memory.
//!
//! Two values are tracked:
//!
//! - the *raw* multiplier, `KiB queued + 1`, or zero when the endpoint
//!   memory isn't ready. It's unbounded, and it's what commits compare
//!   against.
//! - the *programmed* multiplier, the raw value clamped to 1 through 3.
//!   This is what's written to the hardware.
//!
//! Every transport completion runs the read path: a completion context
//! that can touch the endpoint registers calls [`complete()`], so MULT
//! follows the endpoint memory as it drains. A context that can't posts
//! its sample into a single slot mailbox instead, and the streaming engine
//! drains the mailbox before it decides how to commit the next buffer. A
//! newer sample replaces an older one.
//!
//! [`complete()`]: BandwidthController::complete

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::config::StreamConfig;
use crate::transport::{Occupancy, Speed, Transport, TransportError};

/// Mailbox holds a sample.
const POSTED: u32 = 1 << 31;
/// The posted sample is ready.
const READY: u32 = 1 << 30;
const BYTES_MASK: u32 = READY - 1;

const MIN_MULT: u8 = 1;
const MAX_MULT: u8 = 3;

fn encode(occupancy: Occupancy) -> u32 {
    let ready = if occupancy.ready { READY } else { 0 };
    POSTED | ready | (occupancy.bytes & BYTES_MASK)
}

fn decode(slot: u32) -> Option<Occupancy> {
    if slot & POSTED == 0 {
        return None;
    }
    Some(Occupancy {
        ready: slot & READY != 0,
        bytes: slot & BYTES_MASK,
    })
}

/// Tracks the isochronous multiplier at high speed
pub struct BandwidthController {
    enabled: AtomicBool,
    raw: AtomicU8,
    programmed: AtomicU8,
    mailbox: AtomicU32,
}

impl BandwidthController {
    pub(crate) const fn new() -> Self {
        BandwidthController {
            enabled: AtomicBool::new(false),
            raw: AtomicU8::new(MIN_MULT),
            programmed: AtomicU8::new(MIN_MULT),
            mailbox: AtomicU32::new(0),
        }
    }

    /// Prepare for a new session at `speed`
    ///
    /// The controller only runs at high speed. Both multipliers start
    /// at 1, matching the endpoint configuration.
    pub(crate) fn reset(&self, speed: Speed) {
        self.raw.store(MIN_MULT, Ordering::Release);
        self.programmed.store(MIN_MULT, Ordering::Release);
        self.mailbox.store(0, Ordering::Release);
        self.enabled.store(speed == Speed::High, Ordering::Release);
    }

    /// Stop accepting samples
    pub(crate) fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.mailbox.store(0, Ordering::Release);
    }

    /// Returns `true` if commits go through the controller
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Post an occupancy sample from the DMA completion context
    ///
    /// Replaces any sample that the engine hasn't drained yet. Samples
    /// are ignored while the controller is disabled.
    pub fn post(&self, occupancy: Occupancy) {
        if self.is_enabled() {
            self.mailbox.store(encode(occupancy), Ordering::Release);
        }
    }

    /// Apply a completion's occupancy sample right away
    ///
    /// Reprograms MULT through `transport`, and drops any posted sample
    /// since this one is newer. Ignored while the controller is disabled.
    pub fn complete<T: Transport>(&self, transport: &T, occupancy: Occupancy) {
        if self.is_enabled() {
            self.mailbox.store(0, Ordering::Release);
            self.apply(transport, occupancy);
        }
    }

    /// Returns the last raw multiplier
    pub fn raw_multiplier(&self) -> u8 {
        self.raw.load(Ordering::Acquire)
    }

    /// Returns the last multiplier written to hardware
    pub fn programmed_multiplier(&self) -> u8 {
        self.programmed.load(Ordering::Acquire)
    }

    /// Apply the posted sample, if there is one
    ///
    /// Returns `true` if a sample was applied.
    pub(crate) fn drain<T: Transport>(&self, transport: &T) -> bool {
        match decode(self.mailbox.swap(0, Ordering::Acquire)) {
            Some(occupancy) => {
                self.apply(transport, occupancy);
                true
            }
            None => false,
        }
    }

    /// Read the occupancy straight from the transport, and apply it
    pub(crate) fn resample<T: Transport>(&self, transport: &T) {
        self.apply(transport, transport.occupancy());
    }

    fn apply<T: Transport>(&self, transport: &T, occupancy: Occupancy) {
        let raw = if occupancy.ready {
            u8::try_from(occupancy.kib() + 1).unwrap_or(u8::MAX)
        } else {
            0
        };
        let programmed = raw.clamp(MIN_MULT, MAX_MULT);
        self.raw.store(raw, Ordering::Release);
        self.programmed.store(programmed, Ordering::Release);
        transport.set_multiplier(programmed);
        trace!("MULT raw {} programmed {}", raw, programmed);
    }

    /// Commit `len` bytes of `buffer`, resizing the endpoint if needed
    ///
    /// Drains the mailbox, then compares the raw multiplier with the one
    /// that `len` implies. On a match, the buffer is committed as-is.
    /// Otherwise, the commit happens with the endpoint NAKing, and MULT
    /// is reprogrammed from a fresh occupancy sample before the NAK is
    /// released. The NAK is always released, even if the commit fails.
    pub(crate) fn commit<T: Transport>(
        &self,
        transport: &T,
        buffer: T::Buffer,
        len: usize,
        config: &StreamConfig,
    ) -> Result<(), TransportError> {
        self.drain(transport);
        let implied = config.implied_multiplier(len);
        let raw = self.raw_multiplier();
        if raw == implied {
            return transport.commit(buffer, len);
        }

        debug!("Resizing commit of {} bytes, MULT {} -> {}", len, raw, implied);
        transport.set_nak(true);
        transport.delay_us(config.settle_before_commit_us);
        let result = transport.commit(buffer, len);
        transport.delay_us(config.settle_after_commit_us);
        self.resample(transport);
        transport.set_nak(false);
        result
    }
}
