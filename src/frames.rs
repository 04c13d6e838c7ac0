//! Frame storage
//!
//! The streaming engine plays frames out of a [`FrameStore`]. Firmware
//! normally builds a [`FrameTable`] over a `static` byte array of
//! concatenated frames, plus a table of frame lengths:
//!
//! ```
//! use uvc_inmem::{FrameStore, FrameTable};
//!
//! static FRAMES: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];
//! static LENGTHS: [u32; 2] = [3, 4];
//!
//! let table = FrameTable::new(&FRAMES, &LENGTHS).unwrap();
//! assert_eq!(table.frame_count(), 2);
//! assert_eq!(table.frame_len(1), 4);
//! assert_eq!(table.bytes(3, 2), &[4, 5]);
//! ```

/// A read-only sequence of frames
///
/// Frames are addressed by byte offset within the store, so a store
/// with `N` frames holds `sum(frame_len(0..N))` bytes.
pub trait FrameStore {
    /// Returns the number of frames. Never zero.
    fn frame_count(&self) -> usize;

    /// Returns the length of frame `index`, in bytes
    fn frame_len(&self, index: usize) -> usize;

    /// Returns `len` bytes starting at `offset`
    fn bytes(&self, offset: usize, len: usize) -> &[u8];
}

/// Describes why a frame table is unusable
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FrameTableError {
    /// There are no frames.
    Empty,
    /// The frame lengths don't add up to the size of the frame data.
    SizeMismatch {
        /// Sum of the declared frame lengths.
        declared: usize,
        /// Size of the frame data.
        actual: usize,
    },
}

impl core::fmt::Display for FrameTableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameTableError::Empty => f.write_str("frame table is empty"),
            FrameTableError::SizeMismatch { declared, actual } => write!(
                f,
                "frame lengths sum to {} bytes, but frame data holds {} bytes",
                declared, actual
            ),
        }
    }
}

/// Concatenated frames, and their lengths
#[derive(Clone, Copy, Debug)]
pub struct FrameTable<'a> {
    data: &'a [u8],
    lengths: &'a [u32],
}

impl<'a> FrameTable<'a> {
    /// Build a frame table
    ///
    /// Fails if `lengths` is empty, or if `lengths` don't sum to the size of `data`.
    pub const fn new(data: &'a [u8], lengths: &'a [u32]) -> Result<Self, FrameTableError> {
        if lengths.is_empty() {
            return Err(FrameTableError::Empty);
        }
        let mut declared = 0usize;
        let mut idx = 0;
        while idx < lengths.len() {
            declared += lengths[idx] as usize;
            idx += 1;
        }
        if declared != data.len() {
            return Err(FrameTableError::SizeMismatch {
                declared,
                actual: data.len(),
            });
        }
        Ok(FrameTable { data, lengths })
    }
}

impl FrameStore for FrameTable<'_> {
    fn frame_count(&self) -> usize {
        self.lengths.len()
    }

    fn frame_len(&self, index: usize) -> usize {
        self.lengths[index] as usize
    }

    fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }
}
