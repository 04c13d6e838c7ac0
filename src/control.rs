//! Device state and stream start / stop
//!
//! The control plane reacts to USB events. Selecting a non-zero alternate
//! setting on the streaming interface starts a stream; selecting zero, a
//! bus reset, a disconnect, or a new configuration stops it. Starting
//! always stops first, so repeated selections are harmless.

use crate::config::StreamConfig;
use crate::error::{Error, Operation};
use crate::session::Session;
use crate::transport::{Occupancy, Transport, TransportError};

/// Device state, as seen by the video function
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DeviceState {
    /// No configuration selected.
    Unconfigured,
    /// Configured, but the streaming interface is in its zero-bandwidth setting.
    ConfiguredIdle,
    /// Configured and streaming.
    ConfiguredStreaming,
}

/// Events delivered by the USB stack and the transport
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Event {
    /// The host selected configuration `value`. Zero deconfigures the device.
    SetConfiguration(u8),
    /// The host selected an alternate setting.
    SetInterface { interface: u8, alt_setting: u8 },
    /// USB bus reset.
    Reset,
    /// The device was disconnected from the host.
    Disconnect,
    /// A DMA transfer completed. Carries the endpoint occupancy at that time.
    ///
    /// At high speed, MULT is reprogrammed before the event returns.
    TransportCompletion(Occupancy),
}

/// Drives the device state machine
pub struct ControlPlane<'a, T> {
    transport: &'a T,
    session: &'a Session,
    config: StreamConfig,
    state: DeviceState,
}

impl<'a, T: Transport> ControlPlane<'a, T> {
    pub fn new(transport: &'a T, session: &'a Session, config: StreamConfig) -> Self {
        ControlPlane {
            transport,
            session,
            config,
            state: DeviceState::Unconfigured,
        }
    }

    /// Returns the device state
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Returns the streaming configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Handle an event
    ///
    /// Only starting a stream can fail. On failure, everything that was
    /// set up is torn down, and the device stays in
    /// [`ConfiguredIdle`](DeviceState::ConfiguredIdle).
    pub fn handle(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::SetConfiguration(0) | Event::Reset | Event::Disconnect => {
                debug!("{:?}", event);
                self.stop();
                self.session.set_configured(false);
                self.state = DeviceState::Unconfigured;
            }
            Event::SetConfiguration(_) => {
                debug!("{:?}", event);
                self.stop();
                self.session.set_configured(true);
                self.state = DeviceState::ConfiguredIdle;
            }
            Event::SetInterface {
                interface,
                alt_setting,
            } if interface == self.config.streaming_interface => {
                debug!("SetInterface {} alt {}", interface, alt_setting);
                self.stop();
                self.state = DeviceState::ConfiguredIdle;
                if alt_setting != 0 {
                    self.start()?;
                    self.state = DeviceState::ConfiguredStreaming;
                }
            }
            Event::SetInterface { .. } => {}
            Event::TransportCompletion(occupancy) => {
                self.session.bandwidth().complete(self.transport, occupancy)
            }
        }
        Ok(())
    }

    /// Start a session
    ///
    /// The endpoint is configured before the buffer pool exists, and the
    /// session becomes visible to the engine last.
    #[cfg_attr(
        not(any(feature = "defmt-03", feature = "__log")),
        allow(unused_variables)
    )]
    fn start(&mut self) -> Result<(), Error> {
        let speed = self.transport.speed();
        let endpoint = self.config.endpoint(speed);
        self.transport
            .configure_endpoint(&endpoint)
            .map_err(|cause| self.abort(Operation::ConfigureEndpoint, cause))?;
        self.transport
            .create_pool(&self.config.pool())
            .map_err(|cause| self.abort(Operation::CreatePool, cause))?;
        self.transport.flush_endpoint();
        self.transport
            .start_transfer()
            .map_err(|cause| self.abort(Operation::StartTransfer, cause))?;

        self.session.bandwidth().reset(speed);
        let epoch = self.session.activate();
        info!("Stream started at {:?} speed, session {}", speed, epoch);
        Ok(())
    }

    /// Undo a partial start
    fn abort(&self, op: Operation, cause: TransportError) -> Error {
        let error = Error::Configuration { op, cause };
        error!("{}", error);
        if op != Operation::ConfigureEndpoint {
            self.transport.destroy_pool();
        }
        self.disable_endpoint();
        error
    }

    /// Stop the session, if there is one
    fn stop(&mut self) {
        if !self.session.deactivate() {
            return;
        }
        self.session.bandwidth().disable();
        self.transport.destroy_pool();
        self.transport.flush_endpoint();
        self.disable_endpoint();
        info!("Stream stopped");
    }

    fn disable_endpoint(&self) {
        let mut endpoint = self.config.endpoint(self.transport.speed());
        endpoint.enable = false;
        // The endpoint is being torn down. There's nothing to recover.
        let _ = self.transport.configure_endpoint(&endpoint);
    }
}
