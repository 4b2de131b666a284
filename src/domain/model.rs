use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Discord voice runs at 48 kHz stereo.
pub const SAMPLE_RATE: u32 = 48_000;
pub const CHANNELS: usize = 2;
pub const FRAME_DURATION: Duration = Duration::from_millis(20);
/// Samples per channel in one 20 ms frame.
pub const SAMPLES_PER_CHANNEL: usize = 960;
/// Interleaved samples in one frame.
pub const FRAME_SAMPLES: usize = SAMPLES_PER_CHANNEL * CHANNELS;
/// Encoded size of one frame as little-endian f32.
pub const FRAME_BYTES: usize = FRAME_SAMPLES * std::mem::size_of::<f32>();

/// One 20 ms frame of interleaved stereo audio.
#[derive(Clone, PartialEq)]
pub struct PcmFrame {
    samples: Box<[f32]>,
}

impl PcmFrame {
    pub fn silence() -> Self {
        Self {
            samples: vec![0.0; FRAME_SAMPLES].into_boxed_slice(),
        }
    }

    /// Returns `None` unless `samples` holds exactly one frame.
    pub fn from_slice(samples: &[f32]) -> Option<Self> {
        (samples.len() == FRAME_SAMPLES).then(|| Self {
            samples: samples.into(),
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }

    /// 7 680 bytes of little-endian `f32`.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_BYTES);
        self.write_le_bytes(&mut out);
        out
    }

    /// Appends the frame to `out` without allocating a new buffer.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(FRAME_BYTES);
        for sample in self.samples.iter() {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
}

impl fmt::Debug for PcmFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmFrame")
            .field("samples", &self.samples.len())
            .field("silent", &self.is_silent())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceSelector {
    Name(String),
    Index(usize),
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{}'", name),
            Self::Index(index) => write!(f, "index {}", index),
        }
    }
}

/// An input device as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Unique within one listing, see `core::devices::catalog`.
    pub name: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub sample_format: Option<String>,
}

impl DeviceInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample_rate: None,
            channels: None,
            sample_format: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceTarget {
    pub guild_id: u64,
    pub channel_id: u64,
}

/// Counters shared between the capture thread and the voice mixer.
#[derive(Debug, Default)]
pub struct StreamStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    sent: AtomicU64,
    underruns: AtomicU64,
}

impl StreamStats {
    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub captured: u64,
    pub dropped: u64,
    pub sent: u64,
    pub underruns: u64,
}

impl StatsSnapshot {
    pub fn streamed(&self) -> Duration {
        FRAME_DURATION * u32::try_from(self.sent).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured={} sent={} dropped={} underruns={} streamed={:?}",
            self.captured,
            self.sent,
            self.dropped,
            self.underruns,
            self.streamed()
        )
    }
}
