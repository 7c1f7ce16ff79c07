//! talkasmic Library
//!
//! Speak typed text into a virtual microphone: synthesize with the OS voice
//! engine, play the result on a virtual cable output and optionally mirror it
//! to a local monitor device.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod queue;
pub mod session;
pub mod shell;
pub mod tts;

pub use error::{TalkError, TalkResult};
