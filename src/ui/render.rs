use crate::emergency::{AlertDraft, ContactKind, DispatchAction, EmergencyDialog};
use crate::integration::OrchestratorEvent;
use crate::messages::Message;
use crate::preferences::FontScale;
use crate::Mode;
use crossbeam_channel::Receiver;
use std::io::{self, Write};
use tracing::{debug, error};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn label(text: &str, high_contrast: bool) -> String {
    if high_contrast {
        format!("{}{}{}", BOLD, text.to_uppercase(), RESET)
    } else {
        text.to_string()
    }
}

/// `[9:05] Sahayak: ...`, with a `!` marker on error notices
pub fn render_message(message: &Message, high_contrast: bool) -> String {
    let marker = if message.is_error() { " !" } else { "" };
    format!(
        "[{}] {}{}: {}",
        message.timestamp,
        label(message.sender.label(), high_contrast),
        marker,
        message.text
    )
}

pub fn render_mode_list(active: Mode) -> String {
    let mut out = String::from("Choose a mode:\n");
    for mode in Mode::ALL {
        let current = if mode == active { "  (last used)" } else { "" };
        out.push_str(&format!(
            "  /mode {:<12} {}{}\n",
            mode.as_str(),
            mode.display_name(),
            current
        ));
    }
    out.push_str("Type /help for all commands.");
    out
}

pub fn render_emergency_dialog(dialog: &EmergencyDialog) -> String {
    let mut out = String::from("Emergency Help\nWho would you like to contact for help?\n");
    for (i, entry) in dialog.contacts.iter().enumerate() {
        let tag = match entry.kind {
            ContactKind::Primary => " *",
            ContactKind::Secondary => "",
            ContactKind::Service => " +",
        };
        out.push_str(&format!(
            "  {}. {} ({}) {}{}\n",
            i + 1,
            entry.contact.name,
            entry.contact.relationship,
            entry.contact.phone,
            tag
        ));
    }
    if let Some(location) = &dialog.location {
        out.push_str(&format!(
            "Your location will be shared: {}\n",
            location.maps_url()
        ));
    }
    out.push_str("Type /contact <number>, or /cancel.");
    out
}

pub fn render_dispatch_choices(draft: &AlertDraft) -> String {
    let mut out = format!(
        "Contacting {} at {}\n\n{}\n\n",
        draft.contact.name, draft.contact.phone, draft.message
    );
    for action in DispatchAction::ALL {
        let command = match action {
            DispatchAction::VoiceCall => "/call",
            DispatchAction::ChatMessage => "/chat",
            DispatchAction::TextMessage => "/sms",
        };
        out.push_str(&format!("  {:<8} {}\n", command, action.label()));
    }
    out.push_str("  /cancel  Cancel");
    out
}

/// Writes events to a terminal
pub struct TerminalRenderer<W: Write> {
    out: W,
    font: FontScale,
    high_contrast: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            font: FontScale::from_base(18),
            high_contrast: false,
        }
    }

    pub fn font(&self) -> FontScale {
        self.font
    }

    pub fn high_contrast(&self) -> bool {
        self.high_contrast
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one event. Returns false once the session has shut down.
    pub fn render(&mut self, event: &OrchestratorEvent) -> io::Result<bool> {
        match event {
            OrchestratorEvent::ModeSelectionShown { active } => {
                writeln!(self.out, "\n{}", render_mode_list(*active))?;
            }
            OrchestratorEvent::ConversationOpened {
                mode,
                welcome,
                history,
            } => {
                writeln!(self.out, "\n== {} Mode ==", mode.display_name())?;
                writeln!(self.out, "{}", welcome)?;
                for message in history {
                    writeln!(self.out, "{}", render_message(message, self.high_contrast))?;
                }
            }
            OrchestratorEvent::MessageAdded(message) => {
                writeln!(self.out, "{}", render_message(message, self.high_contrast))?;
            }
            OrchestratorEvent::TypingStarted => writeln!(self.out, "Sahayak is typing...")?,
            OrchestratorEvent::TypingStopped => {}
            OrchestratorEvent::InputEnabled(enabled) => {
                debug!("Input enabled: {}", enabled);
            }
            OrchestratorEvent::CaptureStarted => writeln!(self.out, "Listening...")?,
            OrchestratorEvent::CaptureStopped => {}
            OrchestratorEvent::TranscriptRecognized(text) => {
                writeln!(self.out, "> {}", text)?;
            }
            OrchestratorEvent::SpeakingStarted => writeln!(self.out, "(speaking, /stop to stop)")?,
            OrchestratorEvent::SpeakingEnded => {}
            OrchestratorEvent::Notice(text) => writeln!(self.out, "{}", text)?,
            OrchestratorEvent::FontScaleChanged(scale) => {
                self.font = *scale;
                writeln!(
                    self.out,
                    "Text size: {}px (headings {}px, titles {}px)",
                    scale.base, scale.large, scale.xlarge
                )?;
            }
            OrchestratorEvent::ContrastChanged(enabled) => {
                self.high_contrast = *enabled;
                let state = if *enabled { "on" } else { "off" };
                writeln!(self.out, "High contrast {}", state)?;
            }
            OrchestratorEvent::EmergencyDialogOpened(dialog) => {
                writeln!(self.out, "\n{}", render_emergency_dialog(dialog))?;
            }
            OrchestratorEvent::EmergencyActionsOffered(draft) => {
                writeln!(self.out, "\n{}", render_dispatch_choices(draft))?;
            }
            OrchestratorEvent::EmergencyDialogClosed => {
                writeln!(self.out, "Emergency dialog closed.")?;
            }
            OrchestratorEvent::Shutdown => {
                writeln!(self.out, "Goodbye.")?;
                self.out.flush()?;
                return Ok(false);
            }
        }
        self.out.flush()?;
        Ok(true)
    }

    /// Render until shutdown or until every sender is gone
    pub fn run(mut self, events: Receiver<OrchestratorEvent>) -> W {
        for event in events.iter() {
            match self.render(&event) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    error!("Render error: {}", e);
                    break;
                }
            }
        }
        self.out
    }
}
