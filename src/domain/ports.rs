use crate::core::frame_queue::{FrameConsumer, FrameProducer};
use crate::domain::model::{DeviceInfo, VoiceTarget};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Things the adapters report to the engine while streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The capture stream reported an error and stopped delivering audio.
    CaptureFailed(String),
    /// The voice connection dropped and the driver gave up reconnecting.
    VoiceDisconnected(String),
    VoiceReconnected,
    /// The live track finished: the frame queue closed and drained.
    PlaybackEnded,
    PlaybackFailed(String),
}

pub type EventSender = UnboundedSender<StreamEvent>;

pub trait CaptureBackend: Send + Sync {
    /// Input devices, sorted and with unique names.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Opens `device_name` and starts pushing frames into `producer`.
    /// Returns once the device is open or failed to open.
    fn start(
        &self,
        device_name: &str,
        producer: FrameProducer,
        events: EventSender,
    ) -> Result<Box<dyn CaptureSession>>;
}

pub trait CaptureSession: Send {
    /// Stops capturing and waits for the capture thread. Dropping the session
    /// closes the frame queue.
    fn stop(self: Box<Self>);
}

#[async_trait]
pub trait VoiceTransport: Send {
    /// Logs in, waits for the session to be ready, checks the target and
    /// joins the voice channel.
    async fn connect(&mut self, target: VoiceTarget, events: EventSender) -> Result<()>;

    /// Starts sending the frames from `consumer` to the joined channel.
    async fn play(&mut self, consumer: FrameConsumer) -> Result<()>;

    /// Leaves the channel and closes the gateway. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<()>;
}
