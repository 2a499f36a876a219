//! Platform speech engines
//!
//! An engine only knows how to start and cancel native work. Bookkeeping
//! about which session is current lives in the bridge, so engines report
//! completion through the handle they were given and never call user code.

use crate::speech::bridge::{RecognitionHandle, UtteranceHandle};
use crate::{Result, SahayakError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Speaking rate, in words per minute, that corresponds to a rate of 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// How often a playback thread checks whether its child has exited
const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Fixed voice parameters applied to every utterance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speaking rate (1.0 = normal, slightly slower by default)
    pub rate: f32,

    /// Voice pitch (1.0 = normal)
    pub pitch: f32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,

    /// BCP 47 language tag for recognition and synthesis
    pub language: String,

    /// External synthesizer command; platform default when unset
    pub synthesizer: Option<String>,

    /// Whether responses are spoken at all
    pub enabled: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
            synthesizer: None,
            enabled: true,
        }
    }
}

impl SpeechConfig {
    /// Set the speaking rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the language tag
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Use a specific synthesizer command
    pub fn with_synthesizer(mut self, command: impl Into<String>) -> Self {
        self.synthesizer = Some(command.into());
        self
    }

    /// Disable spoken responses (text-only mode)
    pub fn without_speech(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One synthesis request
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>, config: &SpeechConfig) -> Self {
        Self {
            text: text.into(),
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
            language: config.language.clone(),
        }
    }

    pub fn words_per_minute(&self) -> u32 {
        (BASE_WORDS_PER_MINUTE * self.rate).round().max(1.0) as u32
    }
}

/// Native recognizer and synthesizer
pub trait SpeechEngine: Send {
    fn supports_recognition(&self) -> bool;

    fn supports_synthesis(&self) -> bool;

    /// Begin a single-shot recognition; report through `handle` exactly once
    fn begin_recognition(&mut self, language: &str, handle: RecognitionHandle) -> Result<()>;

    fn abort_recognition(&mut self);

    /// Begin playback; report through `handle` when playback finishes
    fn begin_utterance(&mut self, utterance: Utterance, handle: UtteranceHandle) -> Result<()>;

    fn cancel_utterance(&mut self);
}

/// Engine with no recognition or synthesis support
#[derive(Debug, Default)]
pub struct TextOnlyEngine;

impl SpeechEngine for TextOnlyEngine {
    fn supports_recognition(&self) -> bool {
        false
    }

    fn supports_synthesis(&self) -> bool {
        false
    }

    fn begin_recognition(&mut self, _language: &str, _handle: RecognitionHandle) -> Result<()> {
        Err(SahayakError::SpeechUnsupported("recognition".into()))
    }

    fn abort_recognition(&mut self) {}

    fn begin_utterance(&mut self, _utterance: Utterance, _handle: UtteranceHandle) -> Result<()> {
        Err(SahayakError::SpeechUnsupported("synthesis".into()))
    }

    fn cancel_utterance(&mut self) {}
}

/// Result of one check on the utterance currently playing
#[derive(Debug, PartialEq)]
enum PlaybackPoll {
    Running,
    /// The child exited and the slot was cleared
    Finished(std::result::Result<(), String>),
    /// The slot holds another utterance, or none
    Detached,
}

/// Check the child for utterance `id`. An exited child is removed from the
/// slot under the same guard, so a newer utterance is never touched.
fn poll_playback(slot: &mut Option<(u64, Child)>, id: u64) -> PlaybackPoll {
    let Some((current, child)) = slot.as_mut() else {
        return PlaybackPoll::Detached;
    };
    if *current != id {
        return PlaybackPoll::Detached;
    }

    let result = match child.try_wait() {
        Ok(None) => return PlaybackPoll::Running,
        Ok(Some(status)) if status.success() => Ok(()),
        Ok(Some(status)) => Err(format!("synthesizer exited with {}", status)),
        Err(e) => Err(e.to_string()),
    };
    slot.take();
    PlaybackPoll::Finished(result)
}

/// Synthesizes by running an external text-to-speech command
/// (`say` on macOS, `espeak` elsewhere). Recognition is not available.
pub struct CommandSpeechEngine {
    program: String,
    /// Whether `program` resolved to an executable at construction
    available: bool,
    playing: Arc<Mutex<Option<(u64, Child)>>>,
    next_id: u64,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let available = match which::which(&program) {
            Ok(path) => {
                debug!("Synthesizer resolved to {}", path.display());
                true
            }
            Err(e) => {
                warn!("Synthesizer {} not found: {}", program, e);
                false
            }
        };

        Self {
            program,
            available,
            playing: Arc::new(Mutex::new(None)),
            next_id: 0,
        }
    }

    /// Engine for the platform's usual synthesizer
    pub fn system_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("say")
        } else {
            Self::new("espeak")
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        match &config.synthesizer {
            Some(program) => Self::new(program.clone()),
            None => Self::system_default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the command line for an utterance
    pub fn command_for(&self, utterance: &Utterance) -> Command {
        let mut command = Command::new(&self.program);
        let name = std::path::Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.program);

        match name {
            "say" => {
                command.arg("-r").arg(utterance.words_per_minute().to_string());
            }
            "espeak" | "espeak-ng" => {
                let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as u32;
                let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0) as u32;
                command
                    .arg("-s")
                    .arg(utterance.words_per_minute().to_string())
                    .arg("-p")
                    .arg(pitch.to_string())
                    .arg("-a")
                    .arg(amplitude.to_string())
                    .arg("-v")
                    .arg(utterance.language.to_lowercase());
            }
            _ => {}
        }

        command.arg(&utterance.text);
        command
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn supports_recognition(&self) -> bool {
        false
    }

    fn supports_synthesis(&self) -> bool {
        self.available
    }

    fn begin_recognition(&mut self, _language: &str, _handle: RecognitionHandle) -> Result<()> {
        Err(SahayakError::SpeechUnsupported("recognition".into()))
    }

    fn abort_recognition(&mut self) {}

    fn begin_utterance(&mut self, utterance: Utterance, handle: UtteranceHandle) -> Result<()> {
        if !self.available {
            return Err(SahayakError::SpeechUnsupported(self.program.clone()));
        }

        // One child at a time
        self.cancel_utterance();

        let child = self
            .command_for(&utterance)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SahayakError::SpeechUnsupported(self.program.clone()),
                _ => SahayakError::SpeechRuntime(format!("{}: {}", self.program, e)),
            })?;

        self.next_id += 1;
        let id = self.next_id;
        *self.playing.lock() = Some((id, child));
        info!("Speaking {} chars with {}", utterance.text.len(), self.program);

        let playing = Arc::clone(&self.playing);
        thread::spawn(move || loop {
            let poll = poll_playback(&mut playing.lock(), id);
            match poll {
                PlaybackPoll::Running => thread::sleep(PLAYBACK_POLL_INTERVAL),
                PlaybackPoll::Finished(result) => {
                    handle.finish(result);
                    return;
                }
                // Cancelled or replaced; the bridge already closed this utterance
                PlaybackPoll::Detached => return,
            }
        });

        Ok(())
    }

    fn cancel_utterance(&mut self) {
        let playing = self.playing.lock().take();
        if let Some((id, mut child)) = playing {
            debug!("Cancelling utterance {}", id);
            if let Err(e) = child.kill() {
                warn!("Failed to stop synthesizer: {}", e);
            }
            let _ = child.wait();
        }
    }
}
