//! Session command surface
//!
//! Everything the user can do maps to one `SessionCommand`. The session routes
//! it to the orchestrator, the preferences or the emergency flow and publishes
//! whatever changed on the shared event channel.

use crate::emergency::{DispatchAction, EmergencyFlow};
use crate::integration::orchestrator::{
    ConversationOrchestrator, OrchestratorEvent, RejectReason, TurnOutcome,
};
use crate::preferences::Preferences;
use crate::speech::SpeechEvent;
use crate::Mode;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const HELP_TEXT: &str = "\
Type a question and press Enter, or use a command:
  /modes            show the mode list
  /mode <name>      information, religious, wellness or ordering
  /mic              start or stop voice input
  /stop             stop speaking
  /font+ /font-     larger or smaller text
  /contrast         toggle high contrast
  /sos              emergency help
  /contact <n>      choose an emergency contact
  /call /chat /sms  send the emergency alert
  /cancel           close the emergency dialog
  /quit             exit";

/// A terminal line that is not a valid command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type /help for the list of commands.")]
    UnknownCommand(String),

    #[error("Unknown mode: {0}. Choose information, religious, wellness or ordering.")]
    UnknownMode(String),

    #[error("Invalid contact number: {0}")]
    InvalidContact(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Submit(String),
    SelectMode(Mode),
    ShowModes,
    ToggleMic,
    StopSpeaking,
    IncreaseFont,
    DecreaseFont,
    ToggleContrast,
    Emergency,
    /// Zero-based position in the emergency contact list
    ChooseContact(usize),
    Dispatch(DispatchAction),
    Cancel,
    Help,
    Quit,
}

impl SessionCommand {
    /// Parse one terminal line. Anything that is not a command is a submission.
    pub fn parse(line: &str) -> std::result::Result<Self, CommandError> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(SessionCommand::Submit(line.to_string()));
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).unwrap_or_default();

        let parsed = match command {
            "/mode" => SessionCommand::SelectMode(
                argument
                    .parse()
                    .map_err(|_| CommandError::UnknownMode(argument.to_string()))?,
            ),
            "/modes" | "/back" => SessionCommand::ShowModes,
            "/mic" => SessionCommand::ToggleMic,
            "/stop" => SessionCommand::StopSpeaking,
            "/font+" => SessionCommand::IncreaseFont,
            "/font-" => SessionCommand::DecreaseFont,
            "/contrast" => SessionCommand::ToggleContrast,
            "/sos" | "/emergency" => SessionCommand::Emergency,
            "/contact" => {
                let number = argument
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| CommandError::InvalidContact(argument.to_string()))?;
                SessionCommand::ChooseContact(number - 1)
            }
            "/call" => SessionCommand::Dispatch(DispatchAction::VoiceCall),
            "/chat" => SessionCommand::Dispatch(DispatchAction::ChatMessage),
            "/sms" => SessionCommand::Dispatch(DispatchAction::TextMessage),
            "/cancel" => SessionCommand::Cancel,
            "/help" => SessionCommand::Help,
            "/quit" | "/exit" => SessionCommand::Quit,
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Continue,
    Quit,
}

pub struct Session {
    orchestrator: ConversationOrchestrator,
    preferences: Arc<Mutex<Preferences>>,
    emergency: tokio::sync::Mutex<EmergencyFlow>,
    event_tx: Sender<OrchestratorEvent>,
}

impl Session {
    pub fn new(orchestrator: ConversationOrchestrator, emergency: EmergencyFlow) -> Self {
        Self {
            preferences: orchestrator.preferences(),
            event_tx: orchestrator.event_sender(),
            orchestrator,
            emergency: tokio::sync::Mutex::new(emergency),
        }
    }

    pub fn orchestrator(&self) -> &ConversationOrchestrator {
        &self.orchestrator
    }

    /// Initial render: display preferences, capability warning, mode list
    pub fn start(&self) {
        let (scale, high_contrast) = {
            let preferences = self.preferences.lock();
            (preferences.font_scale(), preferences.high_contrast())
        };
        self.emit(OrchestratorEvent::FontScaleChanged(scale));
        self.emit(OrchestratorEvent::ContrastChanged(high_contrast));

        self.orchestrator.check_capabilities();
        self.orchestrator.show_mode_selection();
        info!("Session started");
    }

    pub async fn execute(&self, command: SessionCommand) -> SessionStatus {
        debug!("Executing {:?}", command);

        match command {
            SessionCommand::Submit(text) => {
                // New input interrupts playback; a blank line does not
                if !text.trim().is_empty() {
                    self.orchestrator.stop_speaking();
                }
                self.report_turn(self.orchestrator.submit(&text).await);
            }
            SessionCommand::SelectMode(mode) => {
                self.orchestrator.select_mode(mode);
            }
            SessionCommand::ShowModes => self.orchestrator.show_mode_selection(),
            SessionCommand::ToggleMic => {
                self.orchestrator.toggle_capture();
            }
            SessionCommand::StopSpeaking => self.orchestrator.stop_speaking(),
            SessionCommand::IncreaseFont => {
                let changed = self.preferences.lock().increase_font();
                self.font_changed(changed);
            }
            SessionCommand::DecreaseFont => {
                let changed = self.preferences.lock().decrease_font();
                self.font_changed(changed);
            }
            SessionCommand::ToggleContrast => {
                let enabled = self.preferences.lock().toggle_high_contrast();
                self.emit(OrchestratorEvent::ContrastChanged(enabled));
            }
            SessionCommand::Emergency => self.open_emergency().await,
            SessionCommand::ChooseContact(index) => self.choose_contact(index).await,
            SessionCommand::Dispatch(action) => {
                let mut flow = self.emergency.lock().await;
                self.dispatch(&mut flow, action);
            }
            SessionCommand::Cancel => {
                if self.emergency.lock().await.cancel() {
                    self.emit(OrchestratorEvent::EmergencyDialogClosed);
                }
            }
            SessionCommand::Help => self.emit(OrchestratorEvent::Notice(HELP_TEXT.to_string())),
            SessionCommand::Quit => {
                info!("Session ending");
                self.orchestrator.stop_capture();
                self.orchestrator.stop_speaking();
                self.emit(OrchestratorEvent::Shutdown);
                return SessionStatus::Quit;
            }
        }

        SessionStatus::Continue
    }

    /// Show `text` without touching any conversation
    pub fn notify(&self, text: impl Into<String>) {
        self.emit(OrchestratorEvent::Notice(text.into()));
    }

    pub async fn handle_speech_event(&self, event: SpeechEvent) {
        if let Some(outcome) = self.orchestrator.handle_speech_event(event).await {
            self.report_turn(outcome);
        }
    }

    async fn open_emergency(&self) {
        self.orchestrator.stop_speaking();

        let dialog = self.emergency.lock().await.trigger().await;
        let notice = dialog.notice;
        self.emit(OrchestratorEvent::EmergencyDialogOpened(dialog));
        if let Some(notice) = notice {
            self.emit(OrchestratorEvent::Notice(notice.to_string()));
        }
    }

    async fn choose_contact(&self, index: usize) {
        let mut flow = self.emergency.lock().await;
        match flow.select_contact(index) {
            Ok(draft) if flow.config().settings.confirm_before_calling => {
                self.emit(OrchestratorEvent::EmergencyActionsOffered(draft));
            }
            Ok(_) => self.dispatch(&mut flow, DispatchAction::VoiceCall),
            Err(e) => {
                warn!("Cannot choose emergency contact: {}", e);
                self.emit(OrchestratorEvent::Notice(e.to_string()));
            }
        }
    }

    fn dispatch(&self, flow: &mut EmergencyFlow, action: DispatchAction) {
        match flow.dispatch(action) {
            Ok(_) => self.emit(OrchestratorEvent::EmergencyDialogClosed),
            Err(e) => self.emit(OrchestratorEvent::Notice(e.user_message())),
        }
    }

    fn font_changed(&self, changed: Option<crate::preferences::FontScale>) {
        match changed {
            Some(scale) => self.emit(OrchestratorEvent::FontScaleChanged(scale)),
            None => debug!("Font size already at its limit"),
        }
    }

    fn report_turn(&self, outcome: TurnOutcome) {
        match outcome {
            TurnOutcome::Rejected(RejectReason::Busy) => self.emit(OrchestratorEvent::Notice(
                "Still working on your last question. Please wait.".to_string(),
            )),
            TurnOutcome::Rejected(RejectReason::EmptyInput) => {}
            TurnOutcome::Answered(_) => debug!("Turn answered"),
            TurnOutcome::Failed(e) => debug!("Turn failed: {}", e),
        }
    }

    fn emit(&self, event: OrchestratorEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No renderer attached; event dropped");
        }
    }
}
