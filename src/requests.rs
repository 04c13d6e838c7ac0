//! Class-specific and interface feature requests
//!
//! [`ClassRequests`] decides what to do with a control request that's
//! addressed to one of the video interfaces. It doesn't talk to the USB
//! stack; it returns an [`Outcome`] that the caller turns into a data
//! stage, a status stage, or a stall.

use usb_device::control::{Recipient, Request, RequestType};
use usb_device::UsbDirection;

use crate::config::StreamConfig;
use crate::probe::{ProbeControl, PROBE_LEN, PROBE_LEN_ALIGNED};

/// Video class request codes
pub mod codes {
    pub const SET_CUR: u8 = 0x01;
    pub const GET_CUR: u8 = 0x81;
    pub const GET_MIN: u8 = 0x82;
    pub const GET_MAX: u8 = 0x83;
    pub const GET_RES: u8 = 0x84;
    pub const GET_LEN: u8 = 0x85;
    pub const GET_INFO: u8 = 0x86;
    pub const GET_DEF: u8 = 0x87;
}

/// Control selectors, as they appear in `wValue`
const PROBE_CONTROL: u16 = 0x0100;
const COMMIT_CONTROL: u16 = 0x0200;
const REQUEST_ERROR_CODE_CONTROL: u16 = 0x0200;

/// Reported through the request error code control
const INVALID_CONTROL: u8 = 0x06;

/// The only interface feature
const FUNCTION_SUSPEND: u16 = 0x00;

/// A `SET_CUR` data stage that wasn't the size of the probe control
///
/// The request is still acknowledged.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ProtocolAnomaly {
    pub expected: usize,
    pub received: usize,
}

/// What to do with a request
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome<'a> {
    /// Not a request for this class. Let the USB stack decide.
    Unhandled,
    /// Complete the status stage.
    Accepted,
    /// Complete the status stage, but the data was unexpected.
    Anomaly(ProtocolAnomaly),
    /// Stall the control endpoint.
    Stalled,
    /// Respond with this data stage.
    Data(&'a [u8]),
}

impl Outcome<'_> {
    /// Returns `true` if the request was for this class
    pub fn is_handled(&self) -> bool {
        !matches!(self, Outcome::Unhandled)
    }
}

/// Handles requests for the video control and video streaming interfaces
pub struct ClassRequests {
    control_interface: u8,
    streaming_interface: u8,
    probe: [u8; PROBE_LEN],
    commit: [u8; PROBE_LEN_ALIGNED],
    error_code: [u8; 1],
}

impl ClassRequests {
    /// Answer probe reads with the default operating point
    pub fn new(config: &StreamConfig) -> Self {
        Self::with_probe(config, ProbeControl::new(config.buffer_size as u32))
    }

    /// Answer probe reads with `probe`
    pub fn with_probe(config: &StreamConfig, probe: ProbeControl) -> Self {
        ClassRequests {
            control_interface: config.control_interface,
            streaming_interface: config.streaming_interface,
            probe: probe.to_bytes(),
            commit: [0; PROBE_LEN_ALIGNED],
            error_code: [INVALID_CONTROL],
        }
    }

    /// Returns the data received by the last `SET_CUR`
    pub fn last_set(&self) -> &[u8; PROBE_LEN_ALIGNED] {
        &self.commit
    }

    /// Handle a control request
    ///
    /// `data` is the OUT data stage, if any. `configured` is `true` when
    /// the host has selected a non-zero configuration.
    pub fn handle(&mut self, req: &Request, data: &[u8], configured: bool) -> Outcome<'_> {
        if req.recipient != Recipient::Interface {
            return Outcome::Unhandled;
        }
        match req.request_type {
            RequestType::Standard => Self::interface_feature(req, configured),
            RequestType::Class => self.class(req, data),
            _ => Outcome::Unhandled,
        }
    }

    fn interface_feature(req: &Request, configured: bool) -> Outcome<'static> {
        let feature = req.request == Request::SET_FEATURE || req.request == Request::CLEAR_FEATURE;
        if !feature || req.value != FUNCTION_SUSPEND {
            return Outcome::Unhandled;
        }
        if configured {
            Outcome::Accepted
        } else {
            Outcome::Stalled
        }
    }

    fn class(&mut self, req: &Request, data: &[u8]) -> Outcome<'_> {
        let interface = (req.index & 0xFF) as u8;
        let entity = (req.index >> 8) as u8;

        if interface == self.control_interface {
            // The request error code control is the only control on the interface.
            if entity == 0
                && req.value == REQUEST_ERROR_CODE_CONTROL
                && req.direction == UsbDirection::In
            {
                Outcome::Data(&self.error_code)
            } else {
                Outcome::Unhandled
            }
        } else if interface == self.streaming_interface {
            if req.value != PROBE_CONTROL && req.value != COMMIT_CONTROL {
                return Outcome::Stalled;
            }
            match (req.direction, req.request) {
                (
                    UsbDirection::In,
                    codes::GET_CUR | codes::GET_DEF | codes::GET_MIN | codes::GET_MAX,
                ) => Outcome::Data(&self.probe),
                (UsbDirection::Out, codes::SET_CUR) => self.set_cur(data),
                _ => Outcome::Stalled,
            }
        } else {
            Outcome::Unhandled
        }
    }

    fn set_cur(&mut self, data: &[u8]) -> Outcome<'_> {
        let received = data.len();
        let len = received.min(PROBE_LEN_ALIGNED);
        self.commit[..len].copy_from_slice(&data[..len]);
        if received == PROBE_LEN {
            Outcome::Accepted
        } else {
            warn!(
                "SET_CUR carried {} bytes, expected {}",
                received, PROBE_LEN
            );
            Outcome::Anomaly(ProtocolAnomaly {
                expected: PROBE_LEN,
                received,
            })
        }
    }
}
