//! `usb-device` integration
//!
//! [`UvcClass`] plugs the control plane and the class request handler
//! into any [`UsbBus`]. The class only handles requests; descriptors are
//! supplied by the firmware.
//!
//! ```no_run
//! # fn example<B: usb_device::bus::UsbBus, T: uvc_inmem::Transport>(
//! #     usb: &mut usb_device::device::UsbDevice<'_, B>,
//! #     transport: &T,
//! # ) {
//! use uvc_inmem::{Session, StreamConfig, UvcClass};
//!
//! static SESSION: Session = Session::new();
//! let mut uvc = UvcClass::new(transport, &SESSION, StreamConfig::new());
//! loop {
//!     usb.poll(&mut [&mut uvc]);
//!     if let Some(error) = uvc.fatal() {
//!         uvc_inmem::halt(transport, &error);
//!     }
//! }
//! # }
//! ```

use usb_device::bus::{InterfaceNumber, UsbBus};
use usb_device::class::{ControlIn, ControlOut, UsbClass};
use usb_device::control::{Recipient, Request, RequestType};

use crate::config::StreamConfig;
use crate::control::{ControlPlane, DeviceState, Event};
use crate::error::Error;
use crate::requests::{ClassRequests, Outcome};
use crate::session::Session;
use crate::transport::{Occupancy, Transport};

/// A USB video class function
pub struct UvcClass<'a, T> {
    transport: &'a T,
    control: ControlPlane<'a, T>,
    requests: ClassRequests,
    session: &'a Session,
    alt_setting: u8,
    fatal: Option<Error>,
}

impl<'a, T: Transport> UvcClass<'a, T> {
    pub fn new(transport: &'a T, session: &'a Session, config: StreamConfig) -> Self {
        UvcClass {
            transport,
            control: ControlPlane::new(transport, session, config),
            requests: ClassRequests::new(&config),
            session,
            alt_setting: 0,
            fatal: None,
        }
    }

    /// Returns the device state
    pub fn state(&self) -> DeviceState {
        self.control.state()
    }

    /// Returns the first error that stopped a stream from starting
    ///
    /// Once set, the firmware should [`halt`](crate::halt).
    pub fn fatal(&self) -> Option<Error> {
        self.fatal
    }

    /// Signal that the device lost its connection to the host
    pub fn disconnect(&mut self) {
        self.alt_setting = 0;
        self.dispatch(Event::Disconnect);
    }

    /// Forward a DMA completion's occupancy sample
    ///
    /// Completion handlers that can't reach the class can post straight
    /// to [`Session::bandwidth`].
    pub fn transfer_complete(&mut self, occupancy: Occupancy) {
        self.dispatch(Event::TransportCompletion(occupancy));
    }

    fn dispatch(&mut self, event: Event) {
        if let Err(err) = self.control.handle(event) {
            if self.fatal.is_none() {
                self.fatal = Some(err);
            }
        }
    }

    fn handle_out(&mut self, req: &Request, data: &[u8]) -> Outcome<'_> {
        let configured = self.session.is_configured();
        let outcome = self.requests.handle(req, data, configured);
        if req.request_type == RequestType::Class
            && matches!(outcome, Outcome::Accepted | Outcome::Anomaly(_))
        {
            // Streaming parameters written, whatever their length.
            self.transport.disable_low_power();
        }
        outcome
    }

    fn set_configuration(&mut self, value: u8) {
        self.alt_setting = 0;
        self.dispatch(Event::SetConfiguration(value));
    }

    fn set_interface(&mut self, interface: u8, alt_setting: u8) -> bool {
        if interface != self.control.config().streaming_interface {
            return false;
        }
        self.alt_setting = alt_setting;
        self.dispatch(Event::SetInterface {
            interface,
            alt_setting,
        });
        true
    }
}

fn is_set_configuration(req: &Request) -> bool {
    req.request_type == RequestType::Standard
        && req.recipient == Recipient::Device
        && req.request == Request::SET_CONFIGURATION
}

impl<B: UsbBus, T: Transport> UsbClass<B> for UvcClass<'_, T> {
    fn reset(&mut self) {
        self.alt_setting = 0;
        self.dispatch(Event::Reset);
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        if is_set_configuration(&req) {
            // Observed only. The device completes the request.
            self.set_configuration(req.value as u8);
            return;
        }

        match self.handle_out(&req, xfer.data()) {
            Outcome::Accepted | Outcome::Anomaly(_) => xfer.accept().ok(),
            Outcome::Stalled => xfer.reject().ok(),
            Outcome::Data(_) | Outcome::Unhandled => None,
        };
    }

    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        let configured = self.session.is_configured();
        match self.requests.handle(&req, &[], configured) {
            Outcome::Data(data) => xfer.accept_with(data).ok(),
            Outcome::Accepted | Outcome::Anomaly(_) => xfer.accept_with(&[]).ok(),
            Outcome::Stalled => xfer.reject().ok(),
            Outcome::Unhandled => None,
        };
    }

    fn get_alt_setting(&mut self, interface: InterfaceNumber) -> Option<u8> {
        (u8::from(interface) == self.control.config().streaming_interface)
            .then_some(self.alt_setting)
    }

    fn set_alt_setting(&mut self, interface: InterfaceNumber, alternative: u8) -> bool {
        self.set_interface(u8::from(interface), alternative)
    }
}
