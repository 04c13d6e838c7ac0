//! The streaming engine
//!
//! Plays the frame store out through the transport, one buffer at a time,
//! for as long as a session is active. Each buffer carries a payload
//! header and up to [`payload_capacity()`](crate::StreamConfig::payload_capacity)
//! frame bytes. A frame that doesn't fit in one buffer spans several; only
//! the last buffer of a frame has EOF set. The frame identifier toggles
//! after every frame, and playback wraps to the first frame after the last.
//!
//! Run the engine in its own thread or task with [`Streamer::run()`]:
//!
//! ```no_run
//! # fn example<T: uvc_inmem::Transport>(transport: &T, frames: uvc_inmem::FrameTable<'_>) -> ! {
//! use uvc_inmem::{Session, StreamConfig, Streamer};
//!
//! static SESSION: Session = Session::new();
//! let mut streamer = Streamer::new(transport, &SESSION, frames, StreamConfig::new());
//! streamer.run()
//! # }
//! ```

use crate::config::StreamConfig;
use crate::error::Error;
use crate::frames::FrameStore;
use crate::header::{self, HEADER_LEN};
use crate::session::Session;
use crate::transport::{Transport, TransportError};

/// Playback position in the frame store
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Cursor {
    /// The frame being sent.
    pub frame_index: usize,
    /// Bytes of the current frame already sent.
    pub frame_offset: usize,
    /// Offset of the current frame in the store.
    pub frame_base: usize,
}

impl Cursor {
    fn next_frame<F: FrameStore>(&mut self, frames: &F) {
        self.frame_base += frames.frame_len(self.frame_index);
        self.frame_index += 1;
        self.frame_offset = 0;
        if self.frame_index >= frames.frame_count() {
            *self = Cursor::default();
        }
    }
}

/// Streams frames through a transport
pub struct Streamer<'a, T, F> {
    transport: &'a T,
    session: &'a Session,
    frames: F,
    config: StreamConfig,
    cursor: Cursor,
    fid: bool,
}

impl<'a, T: Transport, F: FrameStore> Streamer<'a, T, F> {
    pub fn new(transport: &'a T, session: &'a Session, frames: F, config: StreamConfig) -> Self {
        Streamer {
            transport,
            session,
            frames,
            config,
            cursor: Cursor::default(),
            fid: false,
        }
    }

    /// Returns the playback position
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Stream forever
    ///
    /// Waits while there's no session. When a session ends, or a commit
    /// fails, the engine waits `restart_delay_ms` before checking again.
    #[cfg_attr(
        not(any(feature = "defmt-03", feature = "__log")),
        allow(unused_variables)
    )]
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(err) = self.stream() {
                warn!("Restarting stream: {}", err);
            }
            self.transport.delay_ms(self.config.restart_delay_ms);
        }
    }

    /// Stream until the active session ends
    ///
    /// Returns immediately if there's no session. Every session starts
    /// at the first frame, with the frame identifier cleared.
    ///
    /// Returns an error if a commit fails while the session is still
    /// active. Failures caused by the session ending aren't errors.
    pub fn stream(&mut self) -> Result<(), Error> {
        let Some(epoch) = self.session.epoch() else {
            return Ok(());
        };
        self.cursor = Cursor::default();
        self.fid = false;
        info!("Streaming session {}", epoch);

        while self.session.is_current(epoch) {
            let buffer = match self.transport.acquire() {
                Ok(buffer) => buffer,
                Err(cause) => return self.interrupted(epoch, cause),
            };
            if !self.session.is_current(epoch) {
                self.transport.discard(buffer);
                break;
            }
            if let Err(cause) = self.send(epoch, buffer) {
                return self.interrupted(epoch, cause);
            }
        }

        debug!("Session {} ended", epoch);
        Ok(())
    }

    /// Classify a transport failure during session `epoch`
    fn interrupted(&self, epoch: u32, cause: TransportError) -> Result<(), Error> {
        if self.session.is_current(epoch) {
            Err(Error::Transfer { cause })
        } else {
            debug!("Session {} torn down: {}", epoch, cause);
            Ok(())
        }
    }

    /// Fill `buffer` with the next piece of the current frame, and commit it
    ///
    /// If session `epoch` ends during the pacing wait, the buffer is
    /// discarded and the cursor doesn't move.
    fn send(&mut self, epoch: u32, mut buffer: T::Buffer) -> Result<(), TransportError> {
        let frame_len = self.frames.frame_len(self.cursor.frame_index);
        let remaining = frame_len - self.cursor.frame_offset;
        let capacity = self.config.payload_capacity();
        let (len, eof) = if remaining > capacity {
            (capacity, false)
        } else {
            (remaining, true)
        };

        let start = self.cursor.frame_base + self.cursor.frame_offset;
        buffer[HEADER_LEN..HEADER_LEN + len].copy_from_slice(self.frames.bytes(start, len));
        header::write(&mut buffer, self.fid, eof);

        self.transport.delay_ms(self.config.buffer_pacing_ms);
        if !self.session.is_current(epoch) {
            self.transport.discard(buffer);
            return Err(TransportError::Cancelled);
        }

        let commit_len = HEADER_LEN + len;
        let bandwidth = self.session.bandwidth();
        if bandwidth.is_enabled() {
            bandwidth.commit(self.transport, buffer, commit_len, &self.config)?;
        } else {
            self.transport.commit(buffer, commit_len)?;
        }
        trace!(
            "Frame {} offset {} committed {} bytes",
            self.cursor.frame_index,
            self.cursor.frame_offset,
            commit_len
        );

        if eof {
            self.fid = !self.fid;
            self.cursor.next_frame(&self.frames);
        } else {
            self.cursor.frame_offset += len;
        }
        Ok(())
    }
}
