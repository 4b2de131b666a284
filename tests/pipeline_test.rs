use melodiqa::adapters::LiveFrameSource;
use melodiqa::core::assembler::FrameAssembler;
use melodiqa::core::frame_queue::frame_queue;
use melodiqa::domain::model::{StreamStats, FRAME_BYTES, SAMPLES_PER_CHANNEL};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Mono 44.1 kHz i16 capture through to the bytes handed to the voice mixer.
#[test]
fn test_mono_44100_capture_reaches_voice_source() {
    let stats = Arc::new(StreamStats::default());
    let (producer, consumer) = frame_queue(100, Arc::clone(&stats));
    let mut assembler = FrameAssembler::new(44_100, 1, producer).unwrap();

    // 200 ms of a constant signal, delivered in 10 ms callbacks
    let callback = vec![16_384i16; 441];
    for _ in 0..20 {
        assembler.push_with(&callback, |s| f32::from(s) / 32_768.0);
    }
    drop(assembler);

    let mut source = LiveFrameSource::new(consumer, Duration::ZERO);
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes).unwrap();

    assert_eq!(bytes.len() % FRAME_BYTES, 0);
    let frames = bytes.len() / FRAME_BYTES;
    assert!((9..=10).contains(&frames), "got {} frames", frames);

    for sample in bytes.chunks_exact(4) {
        let value = f32::from_le_bytes(sample.try_into().unwrap());
        assert!((value - 0.5).abs() < 1e-6, "sample {}", value);
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.captured, frames as u64);
    assert_eq!(snapshot.sent, frames as u64);
    assert_eq!(snapshot.dropped, 0);
    assert_eq!(snapshot.underruns, 0);
}

#[test]
fn test_slow_consumer_keeps_latest_audio() {
    let stats = Arc::new(StreamStats::default());
    let (producer, consumer) = frame_queue(2, Arc::clone(&stats));
    let mut assembler = FrameAssembler::new(48_000, 2, producer).unwrap();

    for i in 0..5 {
        let level = i as f32 / 10.0;
        assembler.push(&vec![level; SAMPLES_PER_CHANNEL * 2]);
    }
    drop(assembler);

    let mut source = LiveFrameSource::new(consumer, Duration::ZERO);
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes).unwrap();

    assert_eq!(bytes.len(), 2 * FRAME_BYTES);
    let first = f32::from_le_bytes(bytes[..4].try_into().unwrap());
    let second = f32::from_le_bytes(bytes[FRAME_BYTES..FRAME_BYTES + 4].try_into().unwrap());
    assert_eq!(first, 0.3);
    assert_eq!(second, 0.4);
    assert_eq!(stats.snapshot().dropped, 3);
}
