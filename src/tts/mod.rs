//! TTS (Text-to-Speech) Module
//!
//! [`SpeechEngine`] validates parameters and resolves voices, then hands the
//! actual rendering to a [`VoiceBackend`] wrapping the OS voice engine.

use crate::audio::{Waveform, PEAK_LIMIT};
use crate::error::{TalkError, TalkResult};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub mod espeak;

pub use espeak::EspeakBackend;

/// Accepted speaking rate, 0 is the engine default
pub const RATE_RANGE: RangeInclusive<i32> = -10..=10;

/// Accepted volume in percent
pub const VOLUME_RANGE: RangeInclusive<i32> = 0..=100;

/// Sample rate reported for empty utterances
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// An installed synthesis voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub index: usize,
    /// Identifier passed back to the engine when selecting this voice
    pub id: String,
    pub name: String,
    pub language: String,
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let language = if self.language.is_empty() {
            "default"
        } else {
            &self.language
        };
        write!(f, "{} · {}", self.name, language)
    }
}

/// The OS voice-synthesis service
pub trait VoiceBackend: Send + Sync + fmt::Debug {
    /// Enumerate installed voices
    fn voices(&self) -> TalkResult<Vec<Voice>>;

    /// Render non-empty text to PCM, blocking until the engine is done
    ///
    /// `rate` and `volume` are already within [`RATE_RANGE`] and [`VOLUME_RANGE`].
    fn render(&self, text: &str, voice: Option<&Voice>, rate: i32, volume: i32)
        -> TalkResult<Waveform>;

    /// Get the engine name
    fn name(&self) -> &str;
}

fn check_range(name: &'static str, value: i32, range: &RangeInclusive<i32>) -> TalkResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(TalkError::InvalidParameter {
            name,
            value: value as i64,
            min: *range.start() as i64,
            max: *range.end() as i64,
        })
    }
}

/// Validate rate and volume against the accepted ranges
pub fn validate_params(rate: i32, volume: i32) -> TalkResult<()> {
    check_range("rate", rate, &RATE_RANGE)?;
    check_range("volume", volume, &VOLUME_RANGE)
}

#[derive(Debug, Clone)]
pub struct SpeechEngine {
    backend: Arc<dyn VoiceBackend>,
}

impl SpeechEngine {
    pub fn new(backend: Arc<dyn VoiceBackend>) -> Self {
        info!("🛠️ Speech engine using '{}'", backend.name());
        Self { backend }
    }

    /// Synthesize `text` to a waveform
    ///
    /// Parameters are checked before the engine is touched. Empty or
    /// whitespace-only text yields an empty waveform. An unknown `voice_id`
    /// fails with [`TalkError::VoiceUnavailable`]; no other voice is
    /// substituted.
    pub fn synthesize(
        &self,
        text: &str,
        voice_id: Option<&str>,
        rate: i32,
        volume: i32,
    ) -> TalkResult<Waveform> {
        validate_params(rate, volume)?;

        let text = text.trim();
        if text.is_empty() {
            debug!("Empty utterance, nothing to synthesize");
            return Ok(Waveform::silent(DEFAULT_SAMPLE_RATE));
        }

        let voice = voice_id.map(|id| self.resolve_voice(id)).transpose()?;

        debug!(
            "Synthesizing {} chars (voice: {:?}, rate: {}, volume: {})",
            text.chars().count(),
            voice.as_ref().map(|v| v.id.as_str()),
            rate,
            volume
        );
        let mut waveform = self.backend.render(text, voice.as_ref(), rate, volume)?;
        waveform.normalize_peak(PEAK_LIMIT);
        Ok(waveform)
    }

    /// Synthesize `text` and write it to a WAV file
    pub fn export(
        &self,
        text: &str,
        voice_id: Option<&str>,
        rate: i32,
        volume: i32,
        path: &Path,
    ) -> TalkResult<()> {
        let waveform = self.synthesize(text, voice_id, rate, volume)?;
        waveform.write_wav(path)?;
        info!("💾 Exported {:?} of speech to {}", waveform.duration(), path.display());
        Ok(())
    }

    fn resolve_voice(&self, id: &str) -> TalkResult<Voice> {
        self.backend
            .voices()?
            .into_iter()
            .find(|v| v.id == id)
            .ok_or_else(|| TalkError::VoiceUnavailable(id.to_string()))
    }
}
