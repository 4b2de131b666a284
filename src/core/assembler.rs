use crate::core::frame_queue::{FrameProducer, PushOutcome};
use crate::core::resampler::LinearResampler;
use crate::domain::model::{PcmFrame, CHANNELS, FRAME_SAMPLES, SAMPLE_RATE};
use crate::utils::error::{MelodiqaError, Result};

/// Turns device callbacks into 20 ms stereo frames.
///
/// Runs inside the audio host callback: after the first few callbacks the
/// scratch buffers stop growing and nothing else allocates except the frame
/// itself.
pub struct FrameAssembler {
    device_channels: usize,
    resampler: LinearResampler,
    stereo: Vec<f32>,
    pending: Vec<f32>,
    producer: FrameProducer,
}

impl FrameAssembler {
    pub fn new(device_rate: u32, device_channels: usize, producer: FrameProducer) -> Result<Self> {
        if device_channels == 0 {
            return Err(MelodiqaError::CaptureError {
                message: "device reports zero input channels".to_string(),
            });
        }
        if device_rate == 0 {
            return Err(MelodiqaError::CaptureError {
                message: "device reports a sample rate of 0 Hz".to_string(),
            });
        }

        Ok(Self {
            device_channels,
            resampler: LinearResampler::new(device_rate, SAMPLE_RATE),
            stereo: Vec::new(),
            pending: Vec::with_capacity(FRAME_SAMPLES * 2),
            producer,
        })
    }

    /// Feeds one callback worth of interleaved device samples. Returns the
    /// number of frames pushed to the queue.
    pub fn push_with<T: Copy>(&mut self, input: &[T], convert: impl Fn(T) -> f32) -> usize {
        if self.producer.is_closed() {
            self.pending.clear();
            return 0;
        }

        self.stereo.clear();
        for device_frame in input.chunks_exact(self.device_channels) {
            let left = convert(device_frame[0]);
            // mono 複製到左右聲道，多聲道只取前兩個
            let right = device_frame.get(1).map(|s| convert(*s)).unwrap_or(left);
            self.stereo.push(left);
            self.stereo.push(right);
        }

        self.resampler.process(&self.stereo, &mut self.pending);

        let mut emitted = 0;
        let mut consumed = 0;
        while self.pending.len() - consumed >= FRAME_SAMPLES {
            let chunk = &self.pending[consumed..consumed + FRAME_SAMPLES];
            consumed += FRAME_SAMPLES;
            if let Some(frame) = PcmFrame::from_slice(chunk) {
                match self.producer.push(frame) {
                    PushOutcome::Queued => {}
                    PushOutcome::Evicted => {
                        tracing::trace!("Frame queue full, dropped oldest frame");
                    }
                    PushOutcome::Closed => {
                        tracing::debug!("Frame queue closed, discarding captured audio");
                        self.pending.clear();
                        return emitted;
                    }
                }
                emitted += 1;
            }
        }
        self.pending.drain(..consumed);
        emitted
    }

    pub fn push(&mut self, input: &[f32]) -> usize {
        self.push_with(input, |s| s)
    }

    /// Samples waiting for a full frame.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    pub fn device_rate(&self) -> u32 {
        self.resampler.input_rate()
    }

    pub fn device_channels(&self) -> usize {
        self.device_channels
    }
}

impl std::fmt::Debug for FrameAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAssembler")
            .field("device_rate", &self.device_rate())
            .field("device_channels", &self.device_channels)
            .field("pending", &self.pending.len())
            .finish()
    }
}

// CHANNELS 固定為 2，左右聲道的寫法依賴這點
const _: () = assert!(CHANNELS == 2);
