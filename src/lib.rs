//! A USB video class streaming core
//!
//! `uvc-inmem` turns a USB device into a camera that plays a fixed set of
//! frames out of memory, forever. It handles the video class control
//! requests, starts and stops the stream as the host selects alternate
//! settings, and splits each frame into payload-headed transfer buffers.
//! On USB 2 high speed links, it also keeps the isochronous multiplier in
//! step with the queued data; see [`bandwidth`] for details.
//!
//! The core doesn't drive hardware directly. Firmware supplies a
//! [`Transport`] for its DMA engine and endpoint, then
//!
//! - plugs a [`UvcClass`] into its [`usb-device`] stack, and
//! - runs a [`Streamer`] in its own thread or task.
//!
//! Both share a `static` [`Session`].
//!
//! Enable the `defmt-03` feature to log with `defmt`, and to derive
//! `defmt::Format` on public types.
//!
//! [`usb-device`]: https://crates.io/crates/usb-device

#![no_std]

#[cfg(test)]
extern crate std;

#[cfg(feature = "defmt-03")]
extern crate defmt_03 as defmt;

#[macro_use]
mod log;

pub mod bandwidth;
mod class;
mod config;
mod control;
mod engine;
pub mod epm;
mod error;
mod frames;
pub mod header;
pub mod probe;
pub mod requests;
mod session;
mod transport;

#[cfg(test)]
mod testing;

pub use class::UvcClass;
pub use config::StreamConfig;
pub use control::{ControlPlane, DeviceState, Event};
pub use engine::{Cursor, Streamer};
pub use error::{halt, Error, Operation};
pub use frames::{FrameStore, FrameTable, FrameTableError};
pub use session::{Session, SessionState};
pub use transport::{
    EndpointConfig, Occupancy, PoolConfig, Speed, Transport, TransportError,
};
