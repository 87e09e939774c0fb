//! PCM buffers and capture chunks

/// Sample rate and channel layout of interleaved PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Interleaved samples covering `millis` milliseconds
    pub fn samples_for_millis(&self, millis: u64) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * millis / 1000) as usize
    }
}

/// One time slice of captured audio, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub sequence: u64,
    pub samples: Vec<i16>,
}

/// Interleaved 16-bit PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    samples: Vec<i16>,
    format: PcmFormat,
}

impl PcmBuffer {
    pub fn new(samples: Vec<i16>, format: PcmFormat) -> Self {
        Self { samples, format }
    }

    /// Join chunks in sequence order
    pub fn from_chunks(mut chunks: Vec<AudioChunk>, format: PcmFormat) -> Self {
        chunks.sort_by_key(|c| c.sequence);
        let total = chunks.iter().map(|c| c.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in chunks {
            samples.extend_from_slice(&chunk.samples);
        }
        Self { samples, format }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        match self.format.channels {
            0 => 0,
            ch => self.samples.len() / ch as usize,
        }
    }

    /// Length in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.format.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .unwrap_or(0)
    }

    /// Re-map to `channels` by averaging down or duplicating up
    pub fn mix_to_channels(&self, channels: u16) -> Self {
        let from = self.format.channels;
        if from == channels || from == 0 || channels == 0 {
            return self.clone();
        }

        let samples = if channels == 1 {
            self.samples
                .chunks(from as usize)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / frame.len() as i32) as i16
                })
                .collect()
        } else {
            let mono = self.mix_to_channels(1);
            mono.samples
                .iter()
                .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
                .collect()
        };

        Self {
            samples,
            format: PcmFormat::new(self.format.sample_rate, channels),
        }
    }

    /// Scale so the peak reaches `target_peak` (0.0-1.0 of full scale),
    /// limited to `max_gain`. Silence is returned unchanged.
    pub fn normalize_peak(&self, target_peak: f32, max_gain: f32) -> Self {
        let peak = self.peak();
        if peak == 0 {
            return self.clone();
        }
        let gain = (target_peak * i16::MAX as f32 / peak as f32).min(max_gain);
        let samples = self
            .samples
            .iter()
            .map(|&s| (s as f32 * gain).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect();
        Self {
            samples,
            format: self.format,
        }
    }
}
