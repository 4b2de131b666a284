use crate::core::frame_queue::{FrameConsumer, Pop};
use crate::domain::model::{PcmFrame, FRAME_BYTES};
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;
use symphonia::core::io::MediaSource;

/// Byte stream of little-endian `f32` stereo PCM read from the frame queue.
///
/// The voice mixer pulls at its own 20 ms pace. If capture has not produced a
/// frame in time, a frame of silence is returned instead of stalling the
/// mixer. Once the queue is closed and drained the stream ends.
pub struct LiveFrameSource {
    consumer: FrameConsumer,
    underrun_wait: Duration,
    buffer: Vec<u8>,
    cursor: usize,
    finished: bool,
}

impl LiveFrameSource {
    pub fn new(consumer: FrameConsumer, underrun_wait: Duration) -> Self {
        Self {
            consumer,
            underrun_wait,
            buffer: Vec::with_capacity(FRAME_BYTES),
            cursor: 0,
            finished: false,
        }
    }

    fn refill(&mut self) -> bool {
        if self.finished {
            return false;
        }

        self.buffer.clear();
        self.cursor = 0;

        match self.consumer.pop_timeout(self.underrun_wait) {
            Pop::Frame(frame) => {
                self.consumer.stats().record_sent();
                frame.write_le_bytes(&mut self.buffer);
            }
            Pop::Empty => {
                self.consumer.stats().record_underrun();
                PcmFrame::silence().write_le_bytes(&mut self.buffer);
            }
            Pop::Closed => {
                tracing::debug!("Frame queue closed, ending live source");
                self.finished = true;
                return false;
            }
        }
        true
    }
}

impl Read for LiveFrameSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.cursor >= self.buffer.len() && !self.refill() {
            return Ok(0);
        }

        let available = &self.buffer[self.cursor..];
        let len = available.len().min(buf.len());
        buf[..len].copy_from_slice(&available[..len]);
        self.cursor += len;
        Ok(len)
    }
}

impl Seek for LiveFrameSource {
    fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "live capture stream is not seekable",
        ))
    }
}

impl MediaSource for LiveFrameSource {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}
