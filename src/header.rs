//! Payload headers
//!
//! Every transfer buffer starts with a 12-byte video payload header.
//! Only the bit-field byte changes; the timestamp and clock reference
//! fields are always zero.

use bitflags::bitflags;

/// Header length, in bytes
pub const HEADER_LEN: usize = 12;

bitflags! {
    /// The header's bit-field byte
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct HeaderFlags : u8 {
        /// Frame identifier. Toggles at each frame boundary.
        const FID = 1 << 0;
        /// End of frame.
        const EOF = 1 << 1;
        /// Presentation time stamp field present.
        const PTS = 1 << 2;
        /// Source clock reference field present.
        const SCR = 1 << 3;
        /// Still image.
        const STI = 1 << 5;
        /// Payload error.
        const ERR = 1 << 6;
        /// End of header.
        const EOH = 1 << 7;
    }
}

impl HeaderFlags {
    /// The bit-field at the start of a stream
    pub const DEFAULT: Self = HeaderFlags::EOH.union(HeaderFlags::SCR).union(HeaderFlags::PTS);
}

/// Write a header into the start of `buffer`
///
/// `fid` selects the frame identifier; `eof` marks the last buffer of a frame.
///
/// # Panics
///
/// Panics if `buffer` is shorter than [`HEADER_LEN`].
pub fn write(buffer: &mut [u8], fid: bool, eof: bool) {
    let mut flags = HeaderFlags::DEFAULT;
    flags.set(HeaderFlags::FID, fid);
    flags.set(HeaderFlags::EOF, eof);

    let header = &mut buffer[..HEADER_LEN];
    header.fill(0);
    header[0] = HEADER_LEN as u8;
    header[1] = flags.bits();
}

/// Parse the bit-field from a buffer written by [`write`]
///
/// Returns `None` if the buffer is too short, or if the length
/// field doesn't describe a 12-byte header.
pub fn flags(buffer: &[u8]) -> Option<HeaderFlags> {
    match buffer {
        [len, bits, ..] if buffer.len() >= HEADER_LEN && *len as usize == HEADER_LEN => {
            Some(HeaderFlags::from_bits_retain(*bits))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{flags, write, HeaderFlags, HEADER_LEN};

    #[test]
    fn default_bit_field() {
        assert_eq!(HeaderFlags::DEFAULT.bits(), 0x8C);
    }

    #[test]
    fn mid_frame() {
        let mut buffer = [0xFF; 16];
        write(&mut buffer, false, false);
        assert_eq!(&buffer[..HEADER_LEN], &[12, 0x8C, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        // Payload untouched
        assert_eq!(&buffer[HEADER_LEN..], &[0xFF; 4]);
    }

    #[test]
    fn end_of_frame() {
        let mut buffer = [0; HEADER_LEN];
        write(&mut buffer, true, true);
        assert_eq!(buffer[1], 0x8F);
        let flags = flags(&buffer).unwrap();
        assert!(flags.contains(HeaderFlags::FID | HeaderFlags::EOF));
    }

    #[test]
    fn short_buffer() {
        assert!(flags(&[12, 0x8C]).is_none());
        assert!(flags(&[0; HEADER_LEN]).is_none());
    }
}
