//! State shared between the USB callbacks and the streaming engine
//!
//! The control plane runs in the USB event context, and the streaming
//! engine runs in its own thread or task. Neither holds a lock on the
//! other, so everything they share lives in a [`Session`] built from
//! atomics. Writers publish with `Release`, readers observe with `Acquire`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::bandwidth::BandwidthController;

/// Whether the stream is running
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SessionState {
    Inactive,
    Active,
}

/// Value of `active` when there's no session
const INACTIVE: u32 = 0;

/// Shared streaming state
///
/// Allocate a `static` session, and hand it to both the control plane
/// and the streaming engine.
///
/// ```
/// use uvc_inmem::{Session, SessionState};
///
/// static SESSION: Session = Session::new();
/// assert_eq!(SESSION.state(), SessionState::Inactive);
/// ```
pub struct Session {
    /// Zero when inactive. Otherwise, the epoch of the running session.
    active: AtomicU32,
    /// Source of session epochs. Only the control plane writes it.
    epochs: AtomicU32,
    configured: AtomicBool,
    bandwidth: BandwidthController,
}

impl Session {
    pub const fn new() -> Self {
        Session {
            active: AtomicU32::new(INACTIVE),
            epochs: AtomicU32::new(INACTIVE),
            configured: AtomicBool::new(false),
            bandwidth: BandwidthController::new(),
        }
    }

    /// Returns the session state
    pub fn state(&self) -> SessionState {
        match self.epoch() {
            Some(_) => SessionState::Active,
            None => SessionState::Inactive,
        }
    }

    /// Returns `true` if a session is running
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Returns the epoch of the running session, or `None` if there's no session
    ///
    /// Every start produces a new epoch, so a stop immediately followed
    /// by a start is still observable.
    pub fn epoch(&self) -> Option<u32> {
        match self.active.load(Ordering::Acquire) {
            INACTIVE => None,
            epoch => Some(epoch),
        }
    }

    /// Returns `true` if `epoch` is still the running session
    pub fn is_current(&self, epoch: u32) -> bool {
        self.active.load(Ordering::Acquire) == epoch
    }

    /// Start a new session, returning its epoch
    pub(crate) fn activate(&self) -> u32 {
        let mut epoch = self.epochs.load(Ordering::Relaxed).wrapping_add(1);
        if epoch == INACTIVE {
            epoch = 1;
        }
        self.epochs.store(epoch, Ordering::Relaxed);
        self.active.store(epoch, Ordering::Release);
        epoch
    }

    /// End the running session
    ///
    /// Returns `true` if there was a session to end.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(INACTIVE, Ordering::AcqRel) != INACTIVE
    }

    /// Returns `true` if the host selected a non-zero configuration
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    pub(crate) fn set_configured(&self, configured: bool) {
        self.configured.store(configured, Ordering::Release);
    }

    /// Access the bandwidth controller
    pub fn bandwidth(&self) -> &BandwidthController {
        &self.bandwidth
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
