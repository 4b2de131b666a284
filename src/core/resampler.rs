use crate::domain::model::CHANNELS;

/// Linear-interpolation resampler for interleaved stereo.
///
/// Capture devices commonly run at 44.1 kHz; the voice driver only takes
/// 48 kHz. Linear interpolation is good enough for voice and keeps the audio
/// callback allocation free once the output buffer has grown.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    input_rate: u32,
    output_rate: u32,
    step: f64,
    /// Position of the next output frame, in input frames, relative to `prev`.
    pos: f64,
    prev: [f32; CHANNELS],
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            input_rate,
            output_rate,
            step: f64::from(input_rate) / f64::from(output_rate),
            pos: 1.0,
            prev: [0.0; CHANNELS],
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.input_rate == self.output_rate
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Appends the resampled form of `input` to `out`.
    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if self.is_passthrough() {
            out.extend_from_slice(input);
            return;
        }

        let frames = input.len() / CHANNELS;
        if frames == 0 {
            return;
        }

        // frame 0 is the last frame of the previous call, frame k is input[k - 1]
        let frame_at = |index: usize, channel: usize| -> f32 {
            if index == 0 {
                self.prev[channel]
            } else {
                input[(index - 1) * CHANNELS + channel]
            }
        };

        let mut pos = self.pos;
        while pos < frames as f64 {
            let index = pos.floor() as usize;
            let frac = (pos - index as f64) as f32;
            for channel in 0..CHANNELS {
                let a = frame_at(index, channel);
                let b = frame_at(index + 1, channel);
                out.push(a + (b - a) * frac);
            }
            pos += self.step;
        }

        self.pos = pos - frames as f64;
        let last = (frames - 1) * CHANNELS;
        self.prev.copy_from_slice(&input[last..last + CHANNELS]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_copies_input() {
        let mut resampler = LinearResampler::new(48_000, 48_000);
        let input = [0.1, -0.1, 0.2, -0.2];
        let mut out = Vec::new();
        resampler.process(&input, &mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn test_upsample_length_ratio() {
        let mut resampler = LinearResampler::new(44_100, 48_000);
        let input = vec![0.0f32; 4_410 * CHANNELS];
        let mut out = Vec::new();
        resampler.process(&input, &mut out);

        let produced = out.len() / CHANNELS;
        assert!((4_799..=4_801).contains(&produced), "produced {}", produced);
    }

    #[test]
    fn test_downsample_length_ratio() {
        let mut resampler = LinearResampler::new(96_000, 48_000);
        let input = vec![0.0f32; 960 * CHANNELS];
        let mut out = Vec::new();
        resampler.process(&input, &mut out);
        assert_eq!(out.len() / CHANNELS, 480);
    }

    #[test]
    fn test_chunking_does_not_change_output() {
        // 單調遞增的 ramp，切塊與否結果應一致
        let input: Vec<f32> = (0..2_000)
            .flat_map(|i| {
                let v = i as f32 / 2_000.0;
                [v, -v]
            })
            .collect();

        let mut whole = Vec::new();
        LinearResampler::new(44_100, 48_000).process(&input, &mut whole);

        let mut chunked = Vec::new();
        let mut resampler = LinearResampler::new(44_100, 48_000);
        for chunk in input.chunks(441 * CHANNELS) {
            resampler.process(chunk, &mut chunked);
        }

        assert_eq!(whole.len(), chunked.len());
        for (a, b) in whole.iter().zip(chunked.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_interpolates_between_frames() {
        let mut resampler = LinearResampler::new(24_000, 48_000);
        let mut out = Vec::new();
        resampler.process(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0], &mut out);
        // outputs at positions 1.0, 1.5, 2.0, 2.5
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
    }
}
