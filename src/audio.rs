//! Audio output: devices, waveforms and the playback seam
//!
//! The OS audio stack is reached through [`AudioOutput`]; [`output::CpalOutput`]
//! is the real implementation and tests substitute their own.

use crate::error::{TalkError, TalkResult};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub mod output;
pub mod router;

pub use output::CpalOutput;
pub use router::{AudioRouter, MonitorPlayback};

/// Peak amplitude synthesized audio is limited to before playback
pub const PEAK_LIMIT: f32 = 0.99;

/// An audio output endpoint as reported by the OS
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    /// Position in the OS enumeration at the time of listing
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

impl Device {
    pub fn new(index: usize, name: impl Into<String>, is_default: bool) -> Self {
        Self {
            index,
            name: name.into(),
            is_default,
        }
    }

    /// Whether both values refer to the same physical endpoint
    pub fn same_endpoint(&self, other: &Device) -> bool {
        self.index == other.index && self.name == other.name
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} · {}", self.index, self.name)
    }
}

/// Interleaved PCM audio, samples in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Zero-length mono waveform
    pub fn silent(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate, 1)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
    }

    /// Scale down so the absolute peak does not exceed `limit`
    pub fn normalize_peak(&mut self, limit: f32) {
        let peak = self.peak();
        if peak > limit {
            let gain = limit / peak;
            for s in &mut self.samples {
                *s *= gain;
            }
        }
    }

    /// Samples as signed 16-bit PCM
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
            .collect()
    }

    /// Persist as a 16-bit PCM WAV file
    pub fn write_wav(&self, path: &Path) -> TalkResult<()> {
        if self.is_empty() {
            return Err(TalkError::Export(
                "No audio was generated for the provided text".into(),
            ));
        }

        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in self.to_i16() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}

/// The OS audio output service
pub trait AudioOutput: Send + Sync + fmt::Debug {
    /// Enumerate output-capable devices in OS order
    fn output_devices(&self) -> TalkResult<Vec<Device>>;

    /// Play `waveform` on `device`, blocking until playback finishes
    ///
    /// Fails with [`TalkError::DeviceUnavailable`] when the device is gone.
    fn play(&self, waveform: &Waveform, device: &Device) -> TalkResult<()>;

    /// Get the backend name
    fn name(&self) -> &str;
}
