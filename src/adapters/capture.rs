use crate::core::assembler::FrameAssembler;
use crate::core::devices;
use crate::core::frame_queue::FrameProducer;
use crate::domain::model::DeviceInfo;
use crate::domain::ports::{CaptureBackend, CaptureSession, EventSender, StreamEvent};
use crate::utils::error::{MelodiqaError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const BUILD_STREAM_TIMEOUT: Duration = Duration::from_millis(200);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captures from an input device through cpal.
#[derive(Debug, Clone, Default)]
pub struct CpalCapture {
    host_name: Option<String>,
}

impl CpalCapture {
    pub fn new(host_name: Option<String>) -> Self {
        Self { host_name }
    }

    pub fn available_hosts() -> Vec<&'static str> {
        cpal::available_hosts()
            .into_iter()
            .map(|id| id.name())
            .collect()
    }
}

fn resolve_host(host_name: Option<&str>) -> Result<cpal::Host> {
    let Some(name) = host_name else {
        return Ok(cpal::default_host());
    };

    let id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| MelodiqaError::AudioHostError {
            message: format!(
                "unknown audio host '{}', available: {}",
                name,
                CpalCapture::available_hosts().join(", ")
            ),
        })?;

    cpal::host_from_id(id).map_err(|e| MelodiqaError::AudioHostError {
        message: e.to_string(),
    })
}

fn device_label(device: &cpal::Device) -> String {
    match device.description() {
        // WASAPI 的 name() 常是 "Microphone" 這種通用名稱，extended() 才帶裝置型號
        Ok(desc) => desc
            .extended()
            .first()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| desc.name().trim())
            .to_string(),
        Err(_) => "Unknown Input Device".to_string(),
    }
}

fn input_catalog(host: &cpal::Host) -> Result<Vec<(DeviceInfo, cpal::Device)>> {
    let inputs = host
        .input_devices()
        .map_err(|e| MelodiqaError::AudioHostError {
            message: format!("failed to enumerate input devices: {}", e),
        })?;

    let entries = inputs
        .map(|device| {
            let config = device.default_input_config().ok();
            let info = DeviceInfo {
                name: device_label(&device),
                sample_rate: config.as_ref().map(|c| c.sample_rate()),
                channels: config.as_ref().map(|c| c.channels()),
                sample_format: config.as_ref().map(|c| c.sample_format().to_string()),
            };
            (info, device)
        })
        .collect();

    Ok(devices::catalog(entries))
}

impl CaptureBackend for CpalCapture {
    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let host = resolve_host(self.host_name.as_deref())?;
        tracing::debug!("Enumerating input devices on host {}", host.id().name());
        Ok(input_catalog(&host)?
            .into_iter()
            .map(|(info, _)| info)
            .collect())
    }

    fn start(
        &self,
        device_name: &str,
        producer: FrameProducer,
        events: EventSender,
    ) -> Result<Box<dyn CaptureSession>> {
        let host_name = self.host_name.clone();
        let device_name = device_name.to_string();
        let shutdown = Arc::new(AtomicBool::new(false));
        let (opened_tx, opened_rx) = crossbeam_channel::bounded::<Result<String>>(1);

        // cpal::Stream 不是 Send，整個生命週期都留在這條 thread 上
        let thread_shutdown = Arc::clone(&shutdown);
        let thread = std::thread::Builder::new()
            .name("melodiqa-capture".to_string())
            .spawn(move || {
                let stream =
                    match open_stream(host_name.as_deref(), &device_name, producer, events) {
                        Ok((stream, description)) => {
                            let _ = opened_tx.send(Ok(description));
                            stream
                        }
                        Err(e) => {
                            let _ = opened_tx.send(Err(e));
                            return;
                        }
                    };

                while !thread_shutdown.load(Ordering::Acquire) {
                    std::thread::park_timeout(STOP_POLL_INTERVAL);
                }

                if let Err(e) = stream.pause() {
                    tracing::debug!("Failed to pause capture stream: {}", e);
                }
                drop(stream);
                tracing::debug!("Capture thread finished");
            })?;

        match opened_rx.recv() {
            Ok(Ok(description)) => {
                tracing::info!("🎚️ Capturing {}", description);
                Ok(Box::new(CpalCaptureSession {
                    shutdown,
                    thread: Some(thread),
                }))
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(MelodiqaError::internal(
                    "capture thread exited before opening the device",
                ))
            }
        }
    }
}

fn open_stream(
    host_name: Option<&str>,
    device_name: &str,
    producer: FrameProducer,
    events: EventSender,
) -> Result<(cpal::Stream, String)> {
    let host = resolve_host(host_name)?;
    let (_, device) = input_catalog(&host)?
        .into_iter()
        .find(|(info, _)| info.name == device_name)
        .ok_or_else(|| MelodiqaError::DeviceNotFound {
            name: device_name.to_string(),
        })?;

    let config = device
        .default_input_config()
        .map_err(|e| MelodiqaError::CaptureError {
            message: e.to_string(),
        })?;
    let sample_format = config.sample_format();
    let stream_config: cpal::StreamConfig = config.into();

    let assembler = FrameAssembler::new(
        stream_config.sample_rate,
        usize::from(stream_config.channels),
        producer,
    )?;
    let description = format!(
        "{} at {} Hz, {} ch, {}",
        device_name, stream_config.sample_rate, stream_config.channels, sample_format
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, assembler, events),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, assembler, events),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, assembler, events),
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, assembler, events),
        cpal::SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, assembler, events),
        cpal::SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, assembler, events),
        other => Err(MelodiqaError::CaptureError {
            message: format!("unsupported input sample format: {}", other),
        }),
    }?;

    stream.play().map_err(|e| MelodiqaError::CaptureError {
        message: e.to_string(),
    })?;

    Ok((stream, description))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut assembler: FrameAssembler,
    events: EventSender,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let on_error = move |err: cpal::StreamError| {
        tracing::error!("Capture stream error: {}", err);
        let _ = events.send(StreamEvent::CaptureFailed(err.to_string()));
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                assembler.push_with(data, |s| cpal::Sample::to_sample::<f32>(s));
            },
            on_error,
            Some(BUILD_STREAM_TIMEOUT),
        )
        .map_err(|e| MelodiqaError::CaptureError {
            message: e.to_string(),
        })
}

pub struct CpalCaptureSession {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureSession for CpalCaptureSession {
    fn stop(mut self: Box<Self>) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                tracing::warn!("Capture thread panicked");
            }
        }
    }
}

impl Drop for CpalCaptureSession {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
