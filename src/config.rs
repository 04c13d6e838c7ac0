//! Streaming constants
//!
//! There's one streaming profile, so everything here is fixed when the
//! firmware is built. Tests and boards that need other values start from
//! [`StreamConfig::new()`] and adjust with the `with_*` methods.
//!
//! ```
//! use uvc_inmem::StreamConfig;
//!
//! const CONFIG: StreamConfig = StreamConfig::new()
//!     .with_buffer_size(1024 + 12)
//!     .with_buffer_count(4);
//!
//! assert_eq!(CONFIG.payload_capacity(), 1024);
//! ```

use crate::header::HEADER_LEN;
use crate::transport::{EndpointConfig, PoolConfig, Speed};

/// Streaming parameters
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct StreamConfig {
    /// Video control interface number.
    pub control_interface: u8,
    /// Video streaming interface number.
    pub streaming_interface: u8,
    /// Isochronous IN endpoint address.
    pub endpoint: u8,
    /// Maximum isochronous packet size.
    pub packet_size: u16,
    /// Transactions per microframe that a full buffer needs at high speed.
    pub packets_per_microframe: u8,
    /// Super speed transactions per service interval.
    pub super_speed_mult: u8,
    /// Super speed burst length.
    pub super_speed_burst: u8,
    /// Bytes per transfer buffer, header included.
    pub buffer_size: usize,
    /// Number of transfer buffers.
    pub buffer_count: usize,
    /// Wait before each commit, in milliseconds.
    pub buffer_pacing_ms: u32,
    /// NAK settling time before a resized commit, in microseconds.
    pub settle_before_commit_us: u32,
    /// Settling time after a resized commit, before reprogramming MULT.
    pub settle_after_commit_us: u32,
    /// Idle poll interval, and the wait before restarting a failed stream.
    pub restart_delay_ms: u32,
}

impl StreamConfig {
    /// The default streaming profile
    pub const fn new() -> Self {
        StreamConfig {
            control_interface: 0,
            streaming_interface: 1,
            endpoint: 0x83,
            packet_size: 1024,
            packets_per_microframe: 3,
            super_speed_mult: 1,
            super_speed_burst: 3,
            buffer_size: 3 * 1024,
            buffer_count: 8,
            buffer_pacing_ms: 3,
            settle_before_commit_us: 10,
            settle_after_commit_us: 20,
            restart_delay_ms: 100,
        }
    }

    /// Use `buffer_size` bytes per transfer buffer
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` can't hold the payload header, and at least one byte.
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > HEADER_LEN, "Buffer can't hold a payload");
        self.buffer_size = buffer_size;
        self
    }

    /// Use `packet_size` byte isochronous packets
    ///
    /// # Panics
    ///
    /// Panics if `packet_size` is zero.
    pub const fn with_packet_size(mut self, packet_size: u16) -> Self {
        assert!(packet_size > 0, "Packet size can't be zero");
        self.packet_size = packet_size;
        self
    }

    /// Use `buffer_count` transfer buffers
    pub const fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    /// Wait `ms` milliseconds before each commit
    pub const fn with_buffer_pacing(mut self, ms: u32) -> Self {
        self.buffer_pacing_ms = ms;
        self
    }

    /// Wait `ms` milliseconds before restarting a stream
    pub const fn with_restart_delay(mut self, ms: u32) -> Self {
        self.restart_delay_ms = ms;
        self
    }

    /// Use interface numbers `control` and `streaming`
    pub const fn with_interfaces(mut self, control: u8, streaming: u8) -> Self {
        self.control_interface = control;
        self.streaming_interface = streaming;
        self
    }

    /// Returns the number of frame bytes that fit in one buffer
    pub const fn payload_capacity(&self) -> usize {
        self.buffer_size - HEADER_LEN
    }

    /// Returns the buffer pool parameters
    pub const fn pool(&self) -> PoolConfig {
        PoolConfig {
            size: self.buffer_size,
            count: self.buffer_count,
        }
    }

    /// Returns the enabled endpoint configuration for `speed`
    ///
    /// At high speed, MULT starts at 1. The bandwidth controller
    /// updates it once data is flowing.
    pub const fn endpoint(&self, speed: Speed) -> EndpointConfig {
        let (mult, burst) = match speed {
            Speed::Super => (self.super_speed_mult, self.super_speed_burst),
            Speed::High => (1, 1),
        };
        EndpointConfig {
            address: self.endpoint,
            enable: true,
            mult,
            burst,
            packet_size: self.packet_size,
        }
    }

    /// Returns the transactions per microframe that a `len`-byte commit needs
    ///
    /// A full buffer takes [`packets_per_microframe`](StreamConfig::packets_per_microframe).
    /// Anything shorter takes one transaction per started packet, plus one.
    /// With a zero `packet_size`, a short commit takes one transaction.
    pub const fn implied_multiplier(&self, len: usize) -> u8 {
        if len >= self.buffer_size {
            return self.packets_per_microframe;
        }
        match len.checked_div(self.packet_size as usize) {
            Some(packets) => (packets + 1) as u8,
            None => 1,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::StreamConfig;
    use crate::transport::Speed;

    #[test]
    fn endpoint_per_speed() {
        let config = StreamConfig::new();
        let high = config.endpoint(Speed::High);
        assert_eq!((high.mult, high.burst), (1, 1));
        assert!(high.enable);

        let sup = config.endpoint(Speed::Super);
        assert_eq!(
            (sup.mult, sup.burst),
            (config.super_speed_mult, config.super_speed_burst)
        );
        assert_eq!(sup.packet_size, 1024);
        assert_eq!(sup.address, 0x83);
    }

    #[test]
    fn implied_multiplier() {
        let config = StreamConfig::new();
        assert_eq!(config.implied_multiplier(config.buffer_size), 3);
        assert_eq!(config.implied_multiplier(12), 1);
        assert_eq!(config.implied_multiplier(1023), 1);
        assert_eq!(config.implied_multiplier(1024), 2);
        assert_eq!(config.implied_multiplier(2100), 3);

        let config = StreamConfig {
            packet_size: 0,
            ..StreamConfig::new()
        };
        assert_eq!(config.implied_multiplier(0), 1);
        assert_eq!(config.implied_multiplier(2100), 1);
        assert_eq!(config.implied_multiplier(config.buffer_size), 3);

        let config = StreamConfig::new().with_packet_size(512);
        assert_eq!(config.implied_multiplier(1023), 2);
        assert_eq!(config.endpoint(Speed::High).packet_size, 512);
    }

    #[test]
    #[should_panic]
    fn zero_packet_size() {
        let _ = StreamConfig::new().with_packet_size(0);
    }

    #[test]
    #[should_panic]
    fn buffer_too_small() {
        let _ = StreamConfig::new().with_buffer_size(12);
    }
}
