use crate::config::settings::StreamSettings;
use crate::core::devices;
use crate::core::frame_queue::frame_queue;
use crate::domain::model::{StatsSnapshot, StreamStats};
use crate::domain::ports::{CaptureBackend, CaptureSession, StreamEvent, VoiceTransport};
use crate::utils::error::{MelodiqaError, Result};
use crate::utils::monitor::SystemMonitor;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;

const MIN_STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Runs blocking device work without stalling the other tasks of a
/// multi-thread runtime. `block_in_place` is not available on the
/// current-thread runtime, where the call simply runs inline.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

/// Wires a capture backend to a voice transport and keeps the stream running
/// until shutdown is requested or one side fails.
pub struct StreamEngine<C: CaptureBackend, V: VoiceTransport> {
    capture: C,
    transport: V,
    monitor: SystemMonitor,
}

impl<C: CaptureBackend, V: VoiceTransport> StreamEngine<C, V> {
    pub fn new(capture: C, transport: V) -> Self {
        Self::new_with_monitoring(capture, transport, false)
    }

    pub fn new_with_monitoring(capture: C, transport: V, monitor_enabled: bool) -> Self {
        Self {
            capture,
            transport,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Streams until `shutdown` resolves. Returns the final counters.
    pub async fn run<F>(&mut self, settings: &StreamSettings, shutdown: F) -> Result<StatsSnapshot>
    where
        F: Future<Output = ()>,
    {
        let devices = run_blocking(|| devices::list(&self.capture))?;
        let device = devices::select(&devices, &settings.device)?;
        tracing::info!("🎙️ Using audio device: {}", devices::describe(device));

        let stats = Arc::new(StreamStats::default());
        let (producer, consumer) = frame_queue(settings.queue_frames, Arc::clone(&stats));
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        tracing::info!(
            "🔌 Connecting to Discord (guild {}, channel {})",
            settings.target.guild_id,
            settings.target.channel_id
        );
        if let Err(e) = self.transport.connect(settings.target, events_tx.clone()).await {
            self.disconnect_quietly().await;
            return Err(e);
        }

        tracing::info!("Starting audio capture");
        let capture = &self.capture;
        let session = match run_blocking(|| capture.start(&device.name, producer, events_tx)) {
            Ok(session) => session,
            Err(e) => {
                self.disconnect_quietly().await;
                return Err(e);
            }
        };

        tracing::info!("🎵 Streaming to voice channel");
        let outcome = match self.transport.play(consumer).await {
            Ok(()) => self.wait(settings, shutdown, &mut events_rx, &stats).await,
            Err(e) => Err(e),
        };

        self.shutdown(session).await;

        let snapshot = stats.snapshot();
        self.monitor.log_final_stats(&snapshot);
        outcome.map(|()| snapshot)
    }

    async fn wait<F>(
        &self,
        settings: &StreamSettings,
        shutdown: F,
        events: &mut mpsc::UnboundedReceiver<StreamEvent>,
        stats: &StreamStats,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(settings.stats_interval.max(MIN_STATS_INTERVAL));
        // 第一個 tick 立即觸發，略過
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Shutdown requested");
                    return Ok(());
                }
                Some(event) = events.recv() => match event {
                    StreamEvent::CaptureFailed(message) => {
                        tracing::error!("❌ Audio capture failed: {}", message);
                        return Err(MelodiqaError::CaptureError { message });
                    }
                    StreamEvent::VoiceDisconnected(reason) => {
                        tracing::error!("❌ Voice connection lost: {}", reason);
                        return Err(MelodiqaError::VoiceJoinError { message: reason });
                    }
                    StreamEvent::VoiceReconnected => {
                        tracing::warn!("Voice connection re-established");
                    }
                    StreamEvent::PlaybackEnded => {
                        tracing::info!("Audio stream ended");
                        return Ok(());
                    }
                    StreamEvent::PlaybackFailed(message) => {
                        tracing::error!("❌ Playback failed: {}", message);
                        return Err(MelodiqaError::internal(format!("playback failed: {}", message)));
                    }
                },
                _ = ticker.tick() => {
                    self.monitor.log_stats("Streaming", &stats.snapshot());
                }
            }
        }
    }

    async fn shutdown(&mut self, session: Box<dyn CaptureSession>) {
        tracing::info!("Stopping audio capture");
        // 停止 capture 會 join 音訊執行緒
        if let Err(e) = tokio::task::spawn_blocking(move || session.stop()).await {
            tracing::warn!("Capture stop task failed: {}", e);
        }
        tracing::info!("Leaving voice channel");
        self.disconnect_quietly().await;
    }

    async fn disconnect_quietly(&mut self) {
        if let Err(e) = self.transport.disconnect().await {
            tracing::warn!("Failed to disconnect cleanly: {}", e);
        }
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn transport(&self) -> &V {
        &self.transport
    }
}
