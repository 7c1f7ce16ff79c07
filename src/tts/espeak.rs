//! espeak-ng backend calling the system binary
//!
//! Speech is rendered into a temporary WAV file (`-w`) and read back, so the
//! audio never touches the default output device.

use super::{Voice, VoiceBackend};
use crate::audio::Waveform;
use crate::error::{TalkError, TalkResult};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// espeak-ng's default speed in words per minute
const DEFAULT_WPM: i32 = 175;
const MIN_WPM: i32 = 80;
const MAX_WPM: i32 = 450;

#[derive(Debug, Clone)]
pub struct EspeakBackend {
    binary: String,
}

impl EspeakBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// Map a rate in `-10..=10` onto espeak's words-per-minute scale
///
/// 0 stays at the engine default; each side is stretched linearly to the
/// engine's limits.
pub fn words_per_minute(rate: i32) -> i32 {
    if rate >= 0 {
        DEFAULT_WPM + rate * (MAX_WPM - DEFAULT_WPM) / 10
    } else {
        DEFAULT_WPM + rate * (DEFAULT_WPM - MIN_WPM) / 10
    }
}

/// Map a volume in `0..=100` onto espeak's amplitude (100 is its default)
pub fn amplitude(volume: i32) -> i32 {
    volume
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
pub fn parse_voices(listing: &str) -> Vec<Voice> {
    let mut voices: Vec<Voice> = Vec::new();

    for line in listing.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[0] == "Pty" {
            continue;
        }

        let id = fields[1];
        if voices.iter().any(|v| v.id == id) {
            continue;
        }

        voices.push(Voice {
            index: voices.len(),
            id: id.to_string(),
            name: fields[3].replace('_', " "),
            language: id.to_string(),
        });
    }

    voices
}

fn read_wav(path: &Path) -> TalkResult<Waveform> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| TalkError::Synthesis(format!("Unreadable engine output: {}", e)))?;
    let spec = reader.spec();

    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
    };
    let samples =
        samples.map_err(|e| TalkError::Synthesis(format!("Corrupt engine output: {}", e)))?;

    Ok(Waveform::new(samples, spec.sample_rate, spec.channels))
}

impl VoiceBackend for EspeakBackend {
    fn voices(&self) -> TalkResult<Vec<Voice>> {
        let output = Command::new(&self.binary)
            .arg("--voices")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TalkError::DeviceQuery(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(TalkError::DeviceQuery(format!(
                "{} --voices exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let voices = parse_voices(&String::from_utf8_lossy(&output.stdout));
        debug!("{} reports {} voices", self.binary, voices.len());
        Ok(voices)
    }

    fn render(
        &self,
        text: &str,
        voice: Option<&Voice>,
        rate: i32,
        volume: i32,
    ) -> TalkResult<Waveform> {
        let wav = tempfile::Builder::new()
            .prefix("talkasmic_")
            .suffix(".wav")
            .tempfile()?;

        let mut command = Command::new(&self.binary);
        command
            .arg("-w")
            .arg(wav.path())
            .arg("-s")
            .arg(words_per_minute(rate).to_string())
            .arg("-a")
            .arg(amplitude(volume).to_string());
        if let Some(voice) = voice {
            command.arg("-v").arg(&voice.id);
        }
        command
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            error!("❌ Failed to spawn {}: {}", self.binary, e);
            TalkError::Synthesis(format!("Failed to spawn {}: {}", self.binary, e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let fed = stdin.write_all(text.as_bytes()).and_then(|_| stdin.flush());
            drop(stdin);
            if let Err(e) = fed {
                // The engine quit before reading its input; reap it before bailing
                let status = child.wait()?;
                return Err(TalkError::Synthesis(format!(
                    "{} stopped reading input ({}): {}",
                    self.binary, status, e
                )));
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(TalkError::Synthesis(format!(
                "{} failed with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        read_wav(wav.path())
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en            (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  en-us           --/F      English_(America)_f mb/mb-us1
";

    #[test]
    fn test_parse_voices() {
        let voices = parse_voices(LISTING);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0].id, "af");
        assert_eq!(voices[0].name, "Afrikaans");
        assert_eq!(voices[1].name, "English (Great Britain)");
        assert_eq!(voices[2].id, "en-us");
        assert_eq!(voices[2].index, 2);
    }

    #[test]
    fn test_parse_voices_ignores_garbage() {
        assert!(parse_voices("").is_empty());
        assert!(parse_voices("espeak-ng: not found\n").is_empty());
    }

    #[test]
    fn test_words_per_minute() {
        assert_eq!(words_per_minute(0), DEFAULT_WPM);
        assert_eq!(words_per_minute(10), MAX_WPM);
        assert_eq!(words_per_minute(-10), MIN_WPM);
        assert!(words_per_minute(5) > DEFAULT_WPM);
        assert!(words_per_minute(-5) < DEFAULT_WPM);
    }

    #[test]
    fn test_read_wav_int16() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("in.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).expect("create");
        for s in [0i16, 16384, -32768] {
            writer.write_sample(s).expect("write");
        }
        writer.finalize().expect("finalize");

        let wave = read_wav(&path).expect("read");
        assert_eq!(wave.sample_rate(), 22050);
        assert_eq!(wave.samples(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_missing_binary() {
        let backend = EspeakBackend::new("definitely-not-espeak-binary");
        assert!(matches!(backend.voices(), Err(TalkError::DeviceQuery(_))));
        assert!(matches!(
            backend.render("hi", None, 0, 100),
            Err(TalkError::Synthesis(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_that_ignores_input() {
        // `true` exits without reading stdin or writing the WAV
        let backend = EspeakBackend::new("true");
        let long_text = "word ".repeat(100_000);
        for text in ["hi", long_text.as_str()] {
            assert!(matches!(
                backend.render(text, None, 0, 100),
                Err(TalkError::Synthesis(_))
            ));
        }
    }

    #[test]
    fn test_render_with_system_espeak() {
        // Only meaningful where espeak-ng is installed
        let backend = EspeakBackend::new("espeak-ng");
        match backend.render("test", None, 0, 100) {
            Ok(wave) => assert!(!wave.is_empty()),
            Err(e) => println!("⚠ espeak-ng unavailable (may be expected in CI): {}", e),
        }
    }
}
