//! Isochronous IN endpoint registers
//!
//! The module implements a RAL-compatible interface for the two
//! per-endpoint registers that the bandwidth workaround touches:
//!
//! - `DEV_EPI_CS`, the USB 2 IN endpoint configuration. Its MULT field
//!   holds the number of isochronous transactions per microframe.
//! - `EEPM_ENDPOINT`, the endpoint memory status. It reports whether the
//!   endpoint memory is ready, and how many bytes are queued.
//!
//! Transports that run on the reference controller can build an
//! [`EndpointRegisters`] with [`fx3()`], then implement
//! [`Transport::occupancy`](crate::Transport::occupancy) and
//! [`Transport::set_multiplier`](crate::Transport::set_multiplier)
//! with [`occupancy()`](EndpointRegisters::occupancy) and
//! [`set_multiplier()`](EndpointRegisters::set_multiplier).

#![allow(non_snake_case, non_upper_case_globals)]

use core::cell::UnsafeCell;

use crate::transport::Occupancy;
use ral_registers::{modify_reg, read_reg};

/// Address of `DEV_EPI_CS` for endpoint 0
const DEV_EPI_CS_BASE: usize = 0xE003_1418;
/// Address of `EEPM_ENDPOINT` for endpoint 0
const EEPM_ENDPOINT_BASE: usize = 0xE003_1C40;

/// A 32-bit register word
#[repr(transparent)]
pub struct Reg(UnsafeCell<u32>);

// Safety: all access is volatile, and single word.
unsafe impl Sync for Reg {}

impl Reg {
    pub const fn new(val: u32) -> Self {
        Reg(UnsafeCell::new(val))
    }
    pub fn read(&self) -> u32 {
        unsafe { self.0.get().read_volatile() }
    }
    pub fn write(&self, val: u32) {
        unsafe { self.0.get().write_volatile(val) }
    }
}

/// The endpoint registers for a single isochronous IN endpoint
pub struct EndpointRegisters<'a> {
    pub DEV_EPI_CS: &'a Reg,
    pub EEPM_ENDPOINT: &'a Reg,
}

/// Acquire the registers for the IN endpoint `ep`
///
/// `ep` is the endpoint number, without the direction bit.
///
/// # Safety
///
/// The registers are memory mapped. Caller must be running on the
/// reference controller, and must make sure that nothing else is
/// modifying the endpoint configuration while these registers are
/// in use.
pub unsafe fn fx3(ep: u8) -> EndpointRegisters<'static> {
    let ep = (ep & 0x0F) as usize;
    EndpointRegisters {
        DEV_EPI_CS: &*((DEV_EPI_CS_BASE + 4 * ep) as *const Reg),
        EEPM_ENDPOINT: &*((EEPM_ENDPOINT_BASE + 4 * ep) as *const Reg),
    }
}

impl EndpointRegisters<'_> {
    /// Sample the endpoint memory occupancy
    pub fn occupancy(&self) -> Occupancy {
        decode(read_reg!(crate::epm, self, EEPM_ENDPOINT))
    }

    /// Program the transactions-per-microframe value
    ///
    /// Clamps `mult` to the range the hardware supports, 1 through 3.
    pub fn set_multiplier(&self, mult: u8) {
        let mult = mult.clamp(1, 3) as u32;
        modify_reg!(crate::epm, self, DEV_EPI_CS, MULT: mult);
    }

    /// Returns the programmed transactions-per-microframe value
    pub fn multiplier(&self) -> u8 {
        read_reg!(crate::epm, self, DEV_EPI_CS, MULT) as u8
    }
}

/// Decode a raw `EEPM_ENDPOINT` value
pub fn decode(eepm: u32) -> Occupancy {
    use EEPM_ENDPOINT::{DSIZE, READY};
    Occupancy {
        ready: eepm & READY::mask != 0,
        bytes: (eepm & DSIZE::mask) >> DSIZE::offset,
    }
}

pub mod DEV_EPI_CS {
    pub mod MULT {
        pub const offset: u32 = 12;
        pub const mask: u32 = 0b11 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}

pub mod EEPM_ENDPOINT {
    pub mod READY {
        pub const offset: u32 = 30;
        pub const mask: u32 = 1 << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
    pub mod DSIZE {
        pub const offset: u32 = 11;
        pub const mask: u32 = 0xFFFF << offset;
        pub mod RW {}
        pub mod R {}
        pub mod W {}
    }
}
