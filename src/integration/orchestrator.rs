//! Conversation orchestrator
//!
//! Drives one turn at a time: user message, composed prompt, completion
//! request, assistant reply, spoken playback. State transitions happen under a
//! short lock; every visible effect is published as an `OrchestratorEvent` for
//! the render layer. No lock is held across the completion request.

use crate::emergency::{AlertDraft, EmergencyDialog};
use crate::llm::{CompletionClient, PromptComposer};
use crate::messages::{ConversationHistory, Message};
use crate::preferences::{DisplayConfig, FontScale, MemoryPreferenceStore, Preferences};
use crate::speech::{
    NativeSpeechBridge, SpeechBridge, SpeechCapabilities, SpeechConfig, SpeechEvent, SpeechPhase,
    TextOnlyEngine, CAPTURE_ABORTED,
};
use crate::utils::channels::SessionChannels;
use crate::{Mode, SahayakError};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shown for every failed turn
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

/// Added after the generic notice when the credential was the problem
pub const CREDENTIAL_FAILURE_MESSAGE: &str =
    "There seems to be an issue with the API key. Please check your configuration.";

/// Pause between a recognized transcript and its submission
pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(500);

/// Events emitted by the orchestrator and the session around it
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// The mode list is showing
    ModeSelectionShown { active: Mode },

    /// The transcript was cleared to the welcome text and stored history replayed
    ConversationOpened {
        mode: Mode,
        welcome: &'static str,
        history: Vec<Message>,
    },

    MessageAdded(Message),

    TypingStarted,

    TypingStopped,

    /// Whether submission and capture-start are currently accepted
    InputEnabled(bool),

    CaptureStarted,

    CaptureStopped,

    /// Recognized speech, about to be submitted
    TranscriptRecognized(String),

    SpeakingStarted,

    SpeakingEnded,

    /// Transient notice that is not part of any conversation
    Notice(String),

    FontScaleChanged(FontScale),

    ContrastChanged(bool),

    EmergencyDialogOpened(EmergencyDialog),

    /// A contact was chosen; call, chat and SMS are offered
    EmergencyActionsOffered(AlertDraft),

    EmergencyDialogClosed,

    Shutdown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    ModeSelection,
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    Busy,
}

/// How a call to `submit` ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Nothing happened; history is unchanged
    Rejected(RejectReason),
    Answered(String),
    Failed(SahayakError),
}

/// Mutable session state. One instance per orchestrator.
#[derive(Debug, Default)]
pub struct ConversationState {
    pub active_mode: Mode,
    pub history: ConversationHistory,
    pub is_processing: bool,
    pub view: View,
}

impl ConversationState {
    pub fn new(active_mode: Mode) -> Self {
        Self {
            active_mode,
            ..Default::default()
        }
    }

    /// Whether messages recorded for `mode` are on screen
    pub fn is_visible(&self, mode: Mode) -> bool {
        self.view == View::Conversation && self.active_mode == mode
    }
}

pub struct ConversationOrchestrator {
    state: Mutex<ConversationState>,
    composer: PromptComposer,
    client: Arc<dyn CompletionClient>,
    speech: Mutex<Box<dyn SpeechBridge>>,
    preferences: Arc<Mutex<Preferences>>,
    event_tx: Sender<OrchestratorEvent>,
    speech_tx: Sender<SpeechEvent>,
    submit_delay: Duration,
}

impl ConversationOrchestrator {
    pub fn builder(client: Arc<dyn CompletionClient>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(client)
    }

    /// Run one turn
    pub async fn submit(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty submission");
            return TurnOutcome::Rejected(RejectReason::EmptyInput);
        }

        let (mode, opened) = {
            let mut state = self.state.lock();
            if state.is_processing {
                warn!("Submission rejected: a turn is already in progress");
                return TurnOutcome::Rejected(RejectReason::Busy);
            }
            state.is_processing = true;

            let opened = if state.view == View::ModeSelection {
                state.view = View::Conversation;
                Some(state.history.get(state.active_mode))
            } else {
                None
            };
            (state.active_mode, opened)
        };

        self.emit(OrchestratorEvent::InputEnabled(false));
        if let Some(history) = opened {
            self.emit(OrchestratorEvent::ConversationOpened {
                mode,
                welcome: mode.welcome_message(),
                history,
            });
        }

        info!("Turn started in {} mode", mode);
        self.record(mode, Message::user(text));

        let prompt = self.composer.compose(mode, text);

        self.emit(OrchestratorEvent::TypingStarted);
        let result = self.client.complete(&prompt).await;
        self.emit(OrchestratorEvent::TypingStopped);

        let outcome = match result {
            Ok(reply) => {
                let visible = self.record(mode, Message::assistant(reply.as_str()));
                if visible {
                    self.speech.lock().speak(&reply, Box::new(|| {}));
                } else {
                    debug!("Reply for {} mode is off screen; not speaking it", mode);
                }
                TurnOutcome::Answered(reply)
            }
            Err(e) => {
                error!("Error getting AI response: {}", e);
                self.record(mode, Message::system(GENERIC_FAILURE_MESSAGE));
                if e.is_credential_error() {
                    self.record(mode, Message::system(CREDENTIAL_FAILURE_MESSAGE));
                }
                TurnOutcome::Failed(e)
            }
        };

        self.state.lock().is_processing = false;
        self.emit(OrchestratorEvent::InputEnabled(true));
        outcome
    }

    /// Open `mode`. Returns false when it is already open.
    pub fn select_mode(&self, mode: Mode) -> bool {
        let history = {
            let mut state = self.state.lock();
            if state.is_visible(mode) {
                debug!("{} mode is already open", mode);
                return false;
            }
            state.active_mode = mode;
            state.view = View::Conversation;
            state.history.get(mode)
        };

        info!("Switched to {} mode", mode);
        self.preferences.lock().set_last_mode(mode);
        self.stop_speaking();

        self.emit(OrchestratorEvent::ConversationOpened {
            mode,
            welcome: mode.welcome_message(),
            history,
        });
        true
    }

    /// Return to the mode list
    pub fn show_mode_selection(&self) {
        let active = {
            let mut state = self.state.lock();
            state.view = View::ModeSelection;
            state.active_mode
        };
        self.stop_speaking();
        self.emit(OrchestratorEvent::ModeSelectionShown { active });
    }

    /// Begin voice input. Refused while a turn is processing.
    pub fn start_capture(&self) -> bool {
        if self.state.lock().is_processing {
            warn!("Cannot start voice input while a turn is processing");
            return false;
        }

        let result_tx = self.speech_tx.clone();
        let error_tx = self.speech_tx.clone();

        let capturing = {
            let mut speech = self.speech.lock();
            speech.stop_speaking();
            speech.start_capture(
                Box::new(move |transcript| {
                    let _ = result_tx.send(SpeechEvent::Transcript(transcript));
                }),
                Box::new(move |reason| {
                    let _ = error_tx.send(SpeechEvent::CaptureFailed(reason));
                }),
            );
            speech.phase() == SpeechPhase::Capturing
        };

        if capturing {
            info!("Listening for voice input");
            self.emit(OrchestratorEvent::CaptureStarted);
        }
        capturing
    }

    pub fn stop_capture(&self) {
        self.speech.lock().stop_capture();
    }

    /// Stop an active capture, otherwise start one
    pub fn toggle_capture(&self) -> bool {
        if self.speech_phase() == SpeechPhase::Capturing {
            self.stop_capture();
            false
        } else {
            self.start_capture()
        }
    }

    pub fn stop_speaking(&self) {
        self.speech.lock().stop_speaking();
    }

    pub fn set_language(&self, language: &str) {
        self.speech.lock().set_language(language);
    }

    /// React to a notification from the speech bridge
    pub async fn handle_speech_event(&self, event: SpeechEvent) -> Option<TurnOutcome> {
        match event {
            SpeechEvent::SpeakingStarted => {
                self.emit(OrchestratorEvent::SpeakingStarted);
                None
            }
            SpeechEvent::SpeakingEnded => {
                self.emit(OrchestratorEvent::SpeakingEnded);
                None
            }
            SpeechEvent::Transcript(transcript) => {
                self.emit(OrchestratorEvent::CaptureStopped);
                self.emit(OrchestratorEvent::TranscriptRecognized(transcript.clone()));
                tokio::time::sleep(self.submit_delay).await;
                Some(self.submit(&transcript).await)
            }
            SpeechEvent::CaptureFailed(reason) => {
                self.emit(OrchestratorEvent::CaptureStopped);
                if reason == CAPTURE_ABORTED {
                    debug!("Voice input stopped by the user");
                } else {
                    let mode = self.state.lock().active_mode;
                    self.record(
                        mode,
                        Message::system(format!(
                            "Speech recognition error: {}. Please try again or type your message.",
                            reason
                        )),
                    );
                }
                None
            }
        }
    }

    /// Warn about missing speech features. Returns the notice, if any.
    pub fn check_capabilities(&self) -> Option<String> {
        let missing = self.capabilities().missing_features();
        if missing.is_empty() {
            return None;
        }

        let notice = format!(
            "Warning: This device doesn't support {}. Some features may not work properly.",
            missing.join(", ")
        );
        warn!("{}", notice);
        self.emit(OrchestratorEvent::Notice(notice.clone()));
        Some(notice)
    }

    pub fn active_mode(&self) -> Mode {
        self.state.lock().active_mode
    }

    pub fn view(&self) -> View {
        self.state.lock().view
    }

    pub fn is_processing(&self) -> bool {
        self.state.lock().is_processing
    }

    pub fn history(&self, mode: Mode) -> Vec<Message> {
        self.state.lock().history.get(mode)
    }

    pub fn speech_phase(&self) -> SpeechPhase {
        self.speech.lock().phase()
    }

    pub fn capabilities(&self) -> SpeechCapabilities {
        self.speech.lock().capabilities()
    }

    pub fn preferences(&self) -> Arc<Mutex<Preferences>> {
        Arc::clone(&self.preferences)
    }

    pub fn event_sender(&self) -> Sender<OrchestratorEvent> {
        self.event_tx.clone()
    }

    /// Store `message` under `mode` and render it when that mode is on screen
    fn record(&self, mode: Mode, message: Message) -> bool {
        let visible = {
            let mut state = self.state.lock();
            state.history.add(mode, message.clone());
            state.is_visible(mode)
        };
        if visible {
            self.emit(OrchestratorEvent::MessageAdded(message));
        }
        visible
    }

    fn emit(&self, event: OrchestratorEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No renderer attached; event dropped");
        }
    }
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    client: Arc<dyn CompletionClient>,
    composer: PromptComposer,
    speech: Option<Box<dyn SpeechBridge>>,
    preferences: Option<Arc<Mutex<Preferences>>>,
    event_tx: Option<Sender<OrchestratorEvent>>,
    speech_tx: Option<Sender<SpeechEvent>>,
    submit_delay: Duration,
}

impl OrchestratorBuilder {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            composer: PromptComposer::default(),
            speech: None,
            preferences: None,
            event_tx: None,
            speech_tx: None,
            submit_delay: DEFAULT_SUBMIT_DELAY,
        }
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Use `speech` instead of a text-only bridge
    pub fn with_speech(mut self, speech: Box<dyn SpeechBridge>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_preferences(mut self, preferences: Arc<Mutex<Preferences>>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Publish on the session's channels
    pub fn with_channels(mut self, channels: &SessionChannels) -> Self {
        self.event_tx = Some(channels.event_tx.clone());
        self.speech_tx = Some(channels.speech_tx.clone());
        self
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn build(self) -> ConversationOrchestrator {
        let (event_tx, speech_tx) = match (self.event_tx, self.speech_tx) {
            (Some(event_tx), Some(speech_tx)) => (event_tx, speech_tx),
            _ => {
                let channels = SessionChannels::new();
                (channels.event_tx, channels.speech_tx)
            }
        };

        let speech = self.speech.unwrap_or_else(|| {
            Box::new(NativeSpeechBridge::new(
                TextOnlyEngine,
                SpeechConfig::default().without_speech(),
                speech_tx.clone(),
            ))
        });

        let preferences = self.preferences.unwrap_or_else(|| {
            Arc::new(Mutex::new(Preferences::load(
                Box::new(MemoryPreferenceStore::new()),
                DisplayConfig::default(),
            )))
        });

        let active_mode = preferences.lock().last_mode();
        debug!("Orchestrator starting in {} mode", active_mode);

        ConversationOrchestrator {
            state: Mutex::new(ConversationState::new(active_mode)),
            composer: self.composer,
            client: self.client,
            speech: Mutex::new(speech),
            preferences,
            event_tx,
            speech_tx,
            submit_delay: self.submit_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender as MessageSender;
    use crate::speech::CommandSpeechEngine;
    use crate::Result;
    use async_trait::async_trait;
    use crossbeam_channel::Receiver;

    struct Echo;

    #[async_trait]
    impl CompletionClient for Echo {
        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {}", prompt.len()))
        }
    }

    struct Broken(SahayakError);

    #[async_trait]
    impl CompletionClient for Broken {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(self.0.clone())
        }
    }

    fn orchestrator(
        client: Arc<dyn CompletionClient>,
    ) -> (ConversationOrchestrator, Receiver<OrchestratorEvent>) {
        let channels = SessionChannels::new();
        let events = channels.event_rx.clone();
        let orchestrator = ConversationOrchestrator::builder(client)
            .with_channels(&channels)
            .with_submit_delay(Duration::ZERO)
            .build();
        (orchestrator, events)
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (orch, events) = orchestrator(Arc::new(Echo));
        assert_eq!(
            orch.submit("   ").await,
            TurnOutcome::Rejected(RejectReason::EmptyInput)
        );
        assert_eq!(orch.history(Mode::Information).len(), 0);
        assert!(events.try_iter().next().is_none());
    }

    #[tokio::test]
    async fn test_successful_turn_records_two_messages() {
        let (orch, _events) = orchestrator(Arc::new(Echo));
        orch.select_mode(Mode::Wellness);

        let outcome = orch.submit("How do I sleep better?").await;

        assert!(matches!(outcome, TurnOutcome::Answered(_)));
        let history = orch.history(Mode::Wellness);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, MessageSender::User);
        assert_eq!(history[0].text, "How do I sleep better?");
        assert_eq!(history[1].sender, MessageSender::Assistant);
        assert!(!orch.is_processing());
    }

    #[tokio::test]
    async fn test_credential_failure_adds_second_notice() {
        let (orch, _events) = orchestrator(Arc::new(Broken(SahayakError::MissingApiKey)));
        orch.submit("hello").await;

        let texts: Vec<_> = orch
            .history(Mode::Information)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(
            texts,
            vec![
                "hello".to_string(),
                GENERIC_FAILURE_MESSAGE.to_string(),
                CREDENTIAL_FAILURE_MESSAGE.to_string(),
            ]
        );
    }

    #[test]
    fn test_select_active_mode_is_noop() {
        let (orch, events) = orchestrator(Arc::new(Echo));
        assert_eq!(orch.view(), View::ModeSelection);

        // Active but hidden: opening it is a real transition
        assert!(orch.select_mode(Mode::Information));
        let _ = events.try_iter().count();

        assert!(!orch.select_mode(Mode::Information));
        assert!(events.try_iter().next().is_none());
    }

    #[test]
    fn test_capture_unsupported_on_text_only_bridge() {
        let (orch, _events) = orchestrator(Arc::new(Echo));
        assert!(!orch.start_capture());
        assert_eq!(orch.speech_phase(), SpeechPhase::Idle);
        assert!(orch.check_capabilities().is_some());
    }

    #[tokio::test]
    async fn test_missing_synthesizer_is_reported_and_silent() {
        let channels = SessionChannels::new();
        let speech = NativeSpeechBridge::new(
            CommandSpeechEngine::new("/nonexistent/tts"),
            SpeechConfig::default(),
            channels.speech_tx.clone(),
        );
        let orch = ConversationOrchestrator::builder(Arc::new(Echo))
            .with_speech(Box::new(speech))
            .with_channels(&channels)
            .build();

        let notice = orch.check_capabilities().unwrap();
        assert!(notice.contains("Speech Synthesis"));
        assert!(!orch.capabilities().synthesis);

        orch.submit("hello").await;
        assert!(channels.speech_rx.try_iter().next().is_none());
        assert_eq!(orch.speech_phase(), SpeechPhase::Idle);
    }

    #[tokio::test]
    async fn test_capture_error_message() {
        let (orch, _events) = orchestrator(Arc::new(Echo));
        orch.select_mode(Mode::Religious);

        orch.handle_speech_event(SpeechEvent::CaptureFailed("no-speech".to_string()))
            .await;
        orch.handle_speech_event(SpeechEvent::CaptureFailed(CAPTURE_ABORTED.to_string()))
            .await;

        let history = orch.history(Mode::Religious);
        assert_eq!(history.len(), 1);
        assert_eq!(
            history[0].text,
            "Speech recognition error: no-speech. Please try again or type your message."
        );
        assert!(history[0].is_error());
    }
}
