//! Mock voice engine for testing
//!
//! Records every rendered utterance and how many renders overlapped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use talkasmic::audio::Waveform;
use talkasmic::tts::{Voice, VoiceBackend};
use talkasmic::{TalkError, TalkResult};

/// Text starting with this takes noticeably longer to render
pub const SLOW: &str = "slow";
/// Text containing this makes the engine fail
pub const EXPLODE: &str = "explode";

#[derive(Debug)]
pub struct MockVoices {
    pub voices: Mutex<Vec<Voice>>,
    /// All text that was rendered, in order
    pub rendered: Mutex<Vec<String>>,
    /// Simulate a missing engine on the next listing
    pub fail_listing: AtomicBool,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockVoices {
    pub fn new() -> Self {
        Self {
            voices: Mutex::new(vec![voice(0, "en-us", "English"), voice(1, "de", "German")]),
            rendered: Mutex::new(Vec::new()),
            fail_listing: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    pub fn render_count(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }

    /// Highest number of renders ever running at once
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn remove_voice(&self, id: &str) {
        self.voices.lock().unwrap().retain(|v| v.id != id);
    }
}

impl Default for MockVoices {
    fn default() -> Self {
        Self::new()
    }
}

pub fn voice(index: usize, id: &str, name: &str) -> Voice {
    Voice {
        index,
        id: id.to_string(),
        name: name.to_string(),
        language: id.to_string(),
    }
}

impl VoiceBackend for MockVoices {
    fn voices(&self) -> TalkResult<Vec<Voice>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(TalkError::DeviceQuery("mock voice engine missing".into()));
        }
        Ok(self.voices.lock().unwrap().clone())
    }

    fn render(
        &self,
        text: &str,
        _voice: Option<&Voice>,
        _rate: i32,
        _volume: i32,
    ) -> TalkResult<Waveform> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let delay = if text.starts_with(SLOW) { 300 } else { 10 };
        std::thread::sleep(Duration::from_millis(delay));

        self.rendered.lock().unwrap().push(text.to_string());
        self.active.fetch_sub(1, Ordering::SeqCst);

        if text.contains(EXPLODE) {
            return Err(TalkError::Synthesis("mock engine exploded".into()));
        }
        Ok(Waveform::new(vec![0.5; 160], 16000, 1))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
