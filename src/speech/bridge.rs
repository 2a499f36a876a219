//! Speech bridge
//!
//! Adapts a platform `SpeechEngine` into the four operations the orchestrator
//! uses. The bridge tracks one capture session and one utterance at a time:
//!
//! - `start_capture` while capturing is ignored with a warning
//! - `stop_capture` closes the session through its error callback (`aborted`)
//! - `speak` preempts the current utterance; the preempted one ends at once and
//!   any late completion from the engine is dropped
//! - every utterance produces exactly one start and one end notification
//!
//! Callbacks never run while the bridge's lock is held.

use crate::speech::engine::{SpeechConfig, SpeechEngine, Utterance};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reason reported when the platform has no recognizer
pub const RECOGNITION_UNSUPPORTED: &str = "Speech recognition not supported";

/// Reason reported when a capture is stopped before it produced a result
pub const CAPTURE_ABORTED: &str = "aborted";

pub type TranscriptCallback = Box<dyn FnOnce(String) + Send>;
pub type CaptureErrorCallback = Box<dyn FnOnce(String) + Send>;
pub type DoneCallback = Box<dyn FnOnce() + Send>;

/// Notifications flowing back to the event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// An utterance started playing
    SpeakingStarted,

    /// An utterance finished, failed or was stopped
    SpeakingEnded,

    /// A capture session produced a transcript
    Transcript(String),

    /// A capture session failed
    CaptureFailed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeechPhase {
    #[default]
    Idle,
    Capturing,
    Speaking,
}

impl std::fmt::Display for SpeechPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeechPhase::Idle => write!(f, "Idle"),
            SpeechPhase::Capturing => write!(f, "Capturing"),
            SpeechPhase::Speaking => write!(f, "Speaking"),
        }
    }
}

/// What the platform can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechCapabilities {
    pub recognition: bool,
    pub synthesis: bool,
}

impl SpeechCapabilities {
    /// Human-readable names of the missing features
    pub fn missing_features(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.recognition {
            missing.push("Speech Recognition");
        }
        if !self.synthesis {
            missing.push("Speech Synthesis");
        }
        missing
    }
}

/// Capture and playback as used by the orchestrator
pub trait SpeechBridge: Send {
    /// Begin a single-shot capture. Exactly one callback fires per session.
    fn start_capture(&mut self, on_result: TranscriptCallback, on_error: CaptureErrorCallback);

    /// Cancel the capture in progress, if any
    fn stop_capture(&mut self);

    /// Speak `text`, preempting whatever is playing
    fn speak(&mut self, text: &str, on_done: DoneCallback);

    /// Cancel the utterance in progress, if any
    fn stop_speaking(&mut self);

    fn phase(&self) -> SpeechPhase;

    fn capabilities(&self) -> SpeechCapabilities;

    fn set_language(&mut self, language: &str);
}

struct PendingCapture {
    id: u64,
    on_result: TranscriptCallback,
    on_error: CaptureErrorCallback,
}

struct PendingUtterance {
    id: u64,
    on_done: DoneCallback,
}

#[derive(Default)]
struct BridgeShared {
    capture: Option<PendingCapture>,
    utterance: Option<PendingUtterance>,
    next_id: u64,
}

impl BridgeShared {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn take_capture(&mut self, id: u64) -> Option<PendingCapture> {
        if self.capture.as_ref().is_some_and(|pending| pending.id == id) {
            self.capture.take()
        } else {
            None
        }
    }

    fn take_utterance(&mut self, id: u64) -> Option<PendingUtterance> {
        if self.utterance.as_ref().is_some_and(|pending| pending.id == id) {
            self.utterance.take()
        } else {
            None
        }
    }
}

/// Completion handle given to the engine for one capture session
pub struct RecognitionHandle {
    id: u64,
    shared: Arc<Mutex<BridgeShared>>,
}

impl RecognitionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Report the session outcome. Ignored if the session was already closed.
    pub fn finish(self, outcome: Result<String, String>) {
        let pending = self.shared.lock().take_capture(self.id);
        let Some(pending) = pending else {
            debug!("Ignoring outcome of closed capture {}", self.id);
            return;
        };

        match outcome {
            Ok(transcript) => {
                info!("Recognized speech: {}", transcript);
                (pending.on_result)(transcript);
            }
            Err(reason) => {
                warn!("Speech recognition error: {}", reason);
                (pending.on_error)(reason);
            }
        }
    }
}

/// Completion handle given to the engine for one utterance
pub struct UtteranceHandle {
    id: u64,
    shared: Arc<Mutex<BridgeShared>>,
    notify_tx: Sender<SpeechEvent>,
}

impl UtteranceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Report that playback finished. Ignored if the utterance was preempted.
    pub fn finish(self, outcome: Result<(), String>) {
        let pending = self.shared.lock().take_utterance(self.id);
        let Some(pending) = pending else {
            debug!("Ignoring completion of preempted utterance {}", self.id);
            return;
        };

        if let Err(reason) = outcome {
            error!("Speech synthesis error: {}", reason);
        }
        let _ = self.notify_tx.send(SpeechEvent::SpeakingEnded);
        (pending.on_done)();
    }
}

/// State-machine bridge over a platform engine
pub struct NativeSpeechBridge<E: SpeechEngine> {
    engine: E,
    config: SpeechConfig,
    shared: Arc<Mutex<BridgeShared>>,
    notify_tx: Sender<SpeechEvent>,
}

impl<E: SpeechEngine> NativeSpeechBridge<E> {
    pub fn new(engine: E, config: SpeechConfig, notify_tx: Sender<SpeechEvent>) -> Self {
        Self {
            engine,
            config,
            shared: Arc::new(Mutex::new(BridgeShared::default())),
            notify_tx,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub fn is_capturing(&self) -> bool {
        self.shared.lock().capture.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.lock().utterance.is_some()
    }
}

impl<E: SpeechEngine> SpeechBridge for NativeSpeechBridge<E> {
    fn start_capture(&mut self, on_result: TranscriptCallback, on_error: CaptureErrorCallback) {
        if !self.engine.supports_recognition() {
            warn!("Speech recognition not supported on this platform");
            on_error(RECOGNITION_UNSUPPORTED.to_string());
            return;
        }

        let id = {
            let mut shared = self.shared.lock();
            if shared.capture.is_some() {
                warn!("Capture requested while already capturing; ignoring");
                return;
            }
            let id = shared.allocate_id();
            shared.capture = Some(PendingCapture {
                id,
                on_result,
                on_error,
            });
            id
        };

        debug!("Starting capture {}", id);
        let handle = RecognitionHandle {
            id,
            shared: Arc::clone(&self.shared),
        };

        if let Err(e) = self.engine.begin_recognition(&self.config.language, handle) {
            error!("Error starting speech recognition: {}", e);
            let pending = self.shared.lock().take_capture(id);
            if let Some(pending) = pending {
                (pending.on_error)(format!("Error starting: {}", e));
            }
        }
    }

    fn stop_capture(&mut self) {
        let pending = self.shared.lock().capture.take();
        if let Some(pending) = pending {
            debug!("Stopping capture {}", pending.id);
            self.engine.abort_recognition();
            (pending.on_error)(CAPTURE_ABORTED.to_string());
        }
    }

    fn speak(&mut self, text: &str, on_done: DoneCallback) {
        self.stop_speaking();

        if !self.config.enabled || !self.engine.supports_synthesis() {
            warn!("Speech synthesis unavailable; response shown as text only");
            on_done();
            return;
        }

        let id = {
            let mut shared = self.shared.lock();
            let id = shared.allocate_id();
            shared.utterance = Some(PendingUtterance { id, on_done });
            id
        };

        let _ = self.notify_tx.send(SpeechEvent::SpeakingStarted);

        let utterance = Utterance::new(text, &self.config);
        let handle = UtteranceHandle {
            id,
            shared: Arc::clone(&self.shared),
            notify_tx: self.notify_tx.clone(),
        };

        if let Err(e) = self.engine.begin_utterance(utterance, handle) {
            error!("Speech synthesis error: {}", e);
            let pending = self.shared.lock().take_utterance(id);
            if let Some(pending) = pending {
                let _ = self.notify_tx.send(SpeechEvent::SpeakingEnded);
                (pending.on_done)();
            }
        }
    }

    fn stop_speaking(&mut self) {
        let pending = self.shared.lock().utterance.take();
        if let Some(pending) = pending {
            debug!("Stopping utterance {}", pending.id);
            self.engine.cancel_utterance();
            let _ = self.notify_tx.send(SpeechEvent::SpeakingEnded);
            (pending.on_done)();
        }
    }

    fn phase(&self) -> SpeechPhase {
        let shared = self.shared.lock();
        if shared.capture.is_some() {
            SpeechPhase::Capturing
        } else if shared.utterance.is_some() {
            SpeechPhase::Speaking
        } else {
            SpeechPhase::Idle
        }
    }

    fn capabilities(&self) -> SpeechCapabilities {
        SpeechCapabilities {
            recognition: self.engine.supports_recognition(),
            synthesis: self.config.enabled && self.engine.supports_synthesis(),
        }
    }

    fn set_language(&mut self, language: &str) {
        info!("Speech language set to {}", language);
        self.config.language = language.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::engine::TextOnlyEngine;
    use crate::Result;
    use crossbeam_channel::{unbounded, Receiver};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine that parks every handle so the test decides when work finishes
    #[derive(Default)]
    struct ManualEngine {
        recognitions: Vec<RecognitionHandle>,
        utterances: Vec<(Utterance, UtteranceHandle)>,
        aborted: usize,
        cancelled: usize,
    }

    impl SpeechEngine for ManualEngine {
        fn supports_recognition(&self) -> bool {
            true
        }

        fn supports_synthesis(&self) -> bool {
            true
        }

        fn begin_recognition(&mut self, _language: &str, handle: RecognitionHandle) -> Result<()> {
            self.recognitions.push(handle);
            Ok(())
        }

        fn abort_recognition(&mut self) {
            self.aborted += 1;
        }

        fn begin_utterance(&mut self, utterance: Utterance, handle: UtteranceHandle) -> Result<()> {
            self.utterances.push((utterance, handle));
            Ok(())
        }

        fn cancel_utterance(&mut self) {
            self.cancelled += 1;
        }
    }

    fn bridge() -> (NativeSpeechBridge<ManualEngine>, Receiver<SpeechEvent>) {
        let (tx, rx) = unbounded();
        (
            NativeSpeechBridge::new(ManualEngine::default(), SpeechConfig::default(), tx),
            rx,
        )
    }

    fn drain(rx: &Receiver<SpeechEvent>) -> Vec<SpeechEvent> {
        rx.try_iter().collect()
    }

    fn counter() -> (Arc<AtomicUsize>, DoneCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&count);
        (
            count,
            Box::new(move || {
                clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_capture_result_fires_once() {
        let (mut bridge, _rx) = bridge();
        let (tx, rx) = unbounded();
        let err_tx = tx.clone();

        bridge.start_capture(
            Box::new(move |t| tx.send(Ok(t)).unwrap()),
            Box::new(move |e| err_tx.send(Err(e)).unwrap()),
        );
        assert_eq!(bridge.phase(), SpeechPhase::Capturing);

        let handle = bridge.engine_mut().recognitions.remove(0);
        handle.finish(Ok("hello".to_string()));

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Ok("hello".to_string())]);
        assert_eq!(bridge.phase(), SpeechPhase::Idle);
    }

    #[test]
    fn test_unsupported_recognition_fails_immediately() {
        let (tx, _notify_rx) = unbounded();
        let mut bridge = NativeSpeechBridge::new(TextOnlyEngine, SpeechConfig::default(), tx);
        let (err_tx, err_rx) = unbounded();

        bridge.start_capture(
            Box::new(|_| panic!("no transcript expected")),
            Box::new(move |e| err_tx.send(e).unwrap()),
        );

        assert_eq!(err_rx.try_recv().unwrap(), RECOGNITION_UNSUPPORTED);
        assert_eq!(bridge.phase(), SpeechPhase::Idle);
    }

    #[test]
    fn test_second_capture_is_ignored() {
        let (mut bridge, _rx) = bridge();
        bridge.start_capture(Box::new(|_| {}), Box::new(|_| {}));
        bridge.start_capture(
            Box::new(|_| panic!("duplicate capture must not fire")),
            Box::new(|_| panic!("duplicate capture must not fire")),
        );
        assert_eq!(bridge.engine().recognitions.len(), 1);
    }

    #[test]
    fn test_stop_capture_is_idempotent() {
        let (mut bridge, _rx) = bridge();
        let (err_tx, err_rx) = unbounded();

        bridge.stop_capture();
        bridge.start_capture(
            Box::new(|_| panic!("aborted capture has no transcript")),
            Box::new(move |e| err_tx.send(e).unwrap()),
        );
        bridge.stop_capture();
        bridge.stop_capture();

        assert_eq!(err_rx.try_iter().collect::<Vec<_>>(), vec![CAPTURE_ABORTED]);
        assert_eq!(bridge.engine().aborted, 1);

        // A late result from the engine is dropped
        let handle = bridge.engine_mut().recognitions.remove(0);
        handle.finish(Ok("too late".to_string()));
    }

    #[test]
    fn test_speak_notifies_start_and_end() {
        let (mut bridge, rx) = bridge();
        let (done, on_done) = counter();

        bridge.speak("Namaste", on_done);
        assert_eq!(bridge.phase(), SpeechPhase::Speaking);
        assert_eq!(bridge.engine().utterances[0].0.rate, 0.9);

        let (_, handle) = bridge.engine_mut().utterances.remove(0);
        handle.finish(Ok(()));

        assert_eq!(
            drain(&rx),
            vec![SpeechEvent::SpeakingStarted, SpeechEvent::SpeakingEnded]
        );
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.phase(), SpeechPhase::Idle);
    }

    #[test]
    fn test_speak_preempts_previous_utterance() {
        let (mut bridge, rx) = bridge();
        let (first_done, first_cb) = counter();
        let (second_done, second_cb) = counter();

        bridge.speak("first", first_cb);
        bridge.speak("second", second_cb);
        assert_eq!(bridge.engine().cancelled, 1);

        let (_, second) = bridge.engine_mut().utterances.pop().unwrap();
        let (_, first) = bridge.engine_mut().utterances.pop().unwrap();

        // The engine reports the cancelled utterance late, then the new one
        first.finish(Err("interrupted".to_string()));
        second.finish(Ok(()));

        assert_eq!(
            drain(&rx),
            vec![
                SpeechEvent::SpeakingStarted,
                SpeechEvent::SpeakingEnded,
                SpeechEvent::SpeakingStarted,
                SpeechEvent::SpeakingEnded,
            ]
        );
        assert_eq!(first_done.load(Ordering::SeqCst), 1);
        assert_eq!(second_done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_speaking_only_notifies_when_playing() {
        let (mut bridge, rx) = bridge();
        bridge.stop_speaking();
        assert!(drain(&rx).is_empty());

        let (done, on_done) = counter();
        bridge.speak("hello", on_done);
        bridge.stop_speaking();
        bridge.stop_speaking();

        assert_eq!(
            drain(&rx),
            vec![SpeechEvent::SpeakingStarted, SpeechEvent::SpeakingEnded]
        );
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_speech_completes_silently() {
        let (tx, rx) = unbounded();
        let mut bridge = NativeSpeechBridge::new(
            ManualEngine::default(),
            SpeechConfig::default().without_speech(),
            tx,
        );
        let (done, on_done) = counter();

        bridge.speak("hello", on_done);

        assert!(drain(&rx).is_empty());
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(bridge.engine().utterances.is_empty());
        assert!(!bridge.capabilities().synthesis);
    }

    #[test]
    fn test_missing_features() {
        let caps = SpeechCapabilities {
            recognition: false,
            synthesis: true,
        };
        assert_eq!(caps.missing_features(), vec!["Speech Recognition"]);
    }
}
