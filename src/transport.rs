//! The transport abstraction
//!
//! The streaming core never touches the DMA engine or the USB endpoint
//! directly. Instead, it drives a [`Transport`]: a bounded pool of
//! transfer buffers feeding one isochronous IN endpoint, plus the few
//! endpoint controls that the bandwidth workaround needs.
//!
//! Like [`usb_device::bus::UsbBus`], all methods take `&self`. The
//! streaming engine and the USB callbacks call into the same transport
//! from different execution contexts, so implementations are expected
//! to provide their own interrupt-safe interior mutability.

use core::ops::DerefMut;

/// USB bus speed, as negotiated with the host
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Speed {
    /// USB 2 high speed.
    ///
    /// This is the degraded tier. The controller decides the isochronous
    /// framing from the MULT setting alone, so the bandwidth controller
    /// keeps MULT in sync with the queued data.
    High,
    /// USB 3 super speed.
    ///
    /// Uses the static multiplier and burst length from the
    /// [`StreamConfig`](crate::StreamConfig).
    Super,
}

/// Streaming endpoint configuration
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct EndpointConfig {
    /// Endpoint address, including the direction bit.
    pub address: u8,
    /// `false` disables the endpoint.
    pub enable: bool,
    /// Isochronous transactions per (micro)frame.
    pub mult: u8,
    /// Packets per burst.
    pub burst: u8,
    /// Maximum packet size.
    pub packet_size: u16,
}

/// Transfer buffer pool parameters
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PoolConfig {
    /// Bytes per buffer, including the payload header.
    pub size: usize,
    /// Number of buffers in the pool.
    pub count: usize,
}

/// Endpoint memory occupancy, sampled from hardware
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Occupancy {
    /// The endpoint memory is ready, and `bytes` is meaningful.
    pub ready: bool,
    /// Number of bytes queued in the endpoint memory.
    pub bytes: u32,
}

impl Occupancy {
    /// An occupancy sample that's ready, with `bytes` queued
    pub const fn ready(bytes: u32) -> Self {
        Occupancy { ready: true, bytes }
    }

    /// An occupancy sample that isn't ready
    pub const fn not_ready() -> Self {
        Occupancy {
            ready: false,
            bytes: 0,
        }
    }

    /// Returns the number of whole KiB queued
    pub const fn kib(&self) -> u32 {
        self.bytes / 1024
    }
}

/// Errors reported by a transport
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum TransportError {
    /// The buffer pool was destroyed while waiting, or before the call.
    Cancelled,
    /// Any other platform failure, with the platform's status code.
    Platform(u32),
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Cancelled => f.write_str("transfer channel torn down"),
            TransportError::Platform(code) => write!(f, "platform status {:#x}", code),
        }
    }
}

/// A streaming transport
///
/// Buffers move through the pool by value. `acquire()` hands out a free
/// buffer; `commit()` and `discard()` take it back. A buffer is never
/// owned by two parties at once.
pub trait Transport {
    /// A transfer buffer, as large as [`PoolConfig::size`].
    type Buffer: DerefMut<Target = [u8]>;

    /// Returns the speed negotiated with the host
    fn speed(&self) -> Speed;

    /// Configure, enable or disable the streaming endpoint
    fn configure_endpoint(&self, config: &EndpointConfig) -> Result<(), TransportError>;

    /// Discard any data held in the streaming endpoint memory
    fn flush_endpoint(&self);

    /// Allocate the transfer buffer pool
    fn create_pool(&self, pool: &PoolConfig) -> Result<(), TransportError>;

    /// Abort all transfers, and release the buffer pool
    ///
    /// Must wake any caller blocked in [`acquire()`](Transport::acquire), which
    /// then observes [`TransportError::Cancelled`]. Calls to `acquire()` after
    /// this call returns `Cancelled` until the next `create_pool()`.
    fn destroy_pool(&self);

    /// Arm the pool for an unbounded sequence of transfers
    fn start_transfer(&self) -> Result<(), TransportError>;

    /// Wait for a free buffer
    ///
    /// Blocks without timeout.
    fn acquire(&self) -> Result<Self::Buffer, TransportError>;

    /// Hand the first `len` bytes of `buffer` to the endpoint
    fn commit(&self, buffer: Self::Buffer, len: usize) -> Result<(), TransportError>;

    /// Return an unused buffer to the pool
    fn discard(&self, buffer: Self::Buffer);

    /// Set (`true`) or clear (`false`) NAK on the streaming endpoint
    fn set_nak(&self, nak: bool);

    /// Sample the streaming endpoint's memory occupancy
    fn occupancy(&self) -> Occupancy;

    /// Program the isochronous transactions-per-microframe value
    fn set_multiplier(&self, mult: u8);

    /// Busy wait for `us` microseconds
    fn delay_us(&self, us: u32);

    /// Sleep for `ms` milliseconds, yielding the CPU if possible
    fn delay_ms(&self, ms: u32);

    /// Keep the link out of low power states
    ///
    /// Called when the host writes streaming parameters, before the
    /// stream starts. The default does nothing, for controllers without
    /// link power management.
    fn disable_low_power(&self) {}
}
