//! Video probe and commit controls
//!
//! The host negotiates streaming parameters by reading and writing the
//! probe and commit controls. There's only one operating point, so the
//! device answers every read with the same [`ProbeControl`].

/// Size of the probe / commit control, in bytes
pub const PROBE_LEN: usize = 26;

/// Size of the buffer that receives `SET_CUR` data
///
/// Rounded up so that a host sending a longer control doesn't overrun
/// the receive buffer.
pub const PROBE_LEN_ALIGNED: usize = 32;

/// Video probe and commit control fields
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ProbeControl {
    pub hint: u16,
    pub format_index: u8,
    pub frame_index: u8,
    /// Frame interval, in 100ns units.
    pub frame_interval: u32,
    pub key_frame_rate: u16,
    pub p_frame_rate: u16,
    pub comp_quality: u16,
    pub comp_window_size: u16,
    /// Internal streaming latency, in milliseconds.
    pub delay: u16,
    pub max_video_frame_size: u32,
    pub max_payload_transfer_size: u32,
}

impl ProbeControl {
    /// First format, first frame, 60 fps, 1080p 16 bits per pixel
    ///
    /// `max_payload` is the largest buffer the device commits in one go.
    pub const fn new(max_payload: u32) -> Self {
        ProbeControl {
            hint: 0,
            format_index: 1,
            frame_index: 1,
            frame_interval: 166_666,
            key_frame_rate: 0,
            p_frame_rate: 0,
            comp_quality: 0,
            comp_window_size: 0,
            delay: 0,
            max_video_frame_size: 1920 * 1080 * 2,
            max_payload_transfer_size: max_payload,
        }
    }

    /// Returns the wire representation
    pub fn to_bytes(&self) -> [u8; PROBE_LEN] {
        let mut out = [0; PROBE_LEN];
        out[0..2].copy_from_slice(&self.hint.to_le_bytes());
        out[2] = self.format_index;
        out[3] = self.frame_index;
        out[4..8].copy_from_slice(&self.frame_interval.to_le_bytes());
        out[8..10].copy_from_slice(&self.key_frame_rate.to_le_bytes());
        out[10..12].copy_from_slice(&self.p_frame_rate.to_le_bytes());
        out[12..14].copy_from_slice(&self.comp_quality.to_le_bytes());
        out[14..16].copy_from_slice(&self.comp_window_size.to_le_bytes());
        out[16..18].copy_from_slice(&self.delay.to_le_bytes());
        out[18..22].copy_from_slice(&self.max_video_frame_size.to_le_bytes());
        out[22..26].copy_from_slice(&self.max_payload_transfer_size.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{ProbeControl, PROBE_LEN};

    #[test]
    fn layout() {
        let bytes = ProbeControl::new(3 * 1024).to_bytes();
        assert_eq!(bytes.len(), PROBE_LEN);
        #[rustfmt::skip]
        let expected: [u8; PROBE_LEN] = [
            0x00, 0x00,             // hint
            0x01,                   // format index
            0x01,                   // frame index
            0x0A, 0x8B, 0x02, 0x00, // frame interval
            0x00, 0x00,             // key frame rate
            0x00, 0x00,             // P frame rate
            0x00, 0x00,             // compression quality
            0x00, 0x00,             // compression window
            0x00, 0x00,             // delay
            0x00, 0x48, 0x3F, 0x00, // max video frame size
            0x00, 0x0C, 0x00, 0x00, // max payload size
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn fields_are_little_endian() {
        let mut probe = ProbeControl::new(0x1122_3344);
        probe.hint = 0x0102;
        probe.delay = 0xBEEF;
        let bytes = probe.to_bytes();
        assert_eq!(&bytes[..2], &[0x02, 0x01]);
        assert_eq!(&bytes[16..18], &[0xEF, 0xBE]);
        assert_eq!(&bytes[22..], &[0x44, 0x33, 0x22, 0x11]);
    }
}
