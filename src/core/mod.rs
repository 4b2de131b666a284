pub mod assembler;
pub mod devices;
pub mod engine;
pub mod frame_queue;
pub mod resampler;

pub use crate::domain::model::{DeviceInfo, DeviceSelector, PcmFrame, StreamStats, VoiceTarget};
pub use crate::domain::ports::{
    CaptureBackend, CaptureSession, EventSender, StreamEvent, VoiceTransport,
};
pub use crate::utils::error::Result;
