//! Handing an emergency alert to the phone, SMS or chat app

use crate::{Result, SahayakError};
use std::process::Command;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    VoiceCall,
    ChatMessage,
    TextMessage,
}

impl DispatchAction {
    pub const ALL: [DispatchAction; 3] = [
        DispatchAction::VoiceCall,
        DispatchAction::ChatMessage,
        DispatchAction::TextMessage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DispatchAction::VoiceCall => "Phone Call",
            DispatchAction::ChatMessage => "WhatsApp Message",
            DispatchAction::TextMessage => "SMS Message",
        }
    }

    /// Platform URI carrying the number and, for messages, the encoded body
    pub fn uri(&self, phone: &str, body: &str) -> String {
        match self {
            DispatchAction::VoiceCall => format!("tel:{}", phone),
            DispatchAction::TextMessage => {
                format!("sms:{}?body={}", phone, urlencoding::encode(body))
            }
            DispatchAction::ChatMessage => format!(
                "https://wa.me/{}?text={}",
                chat_number(phone),
                urlencoding::encode(body)
            ),
        }
    }
}

/// Chat links want bare digits: no spaces, plus signs or dashes
fn chat_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+' && *c != '-')
        .collect()
}

/// Opens a platform URI
pub trait PlatformLauncher: Send + Sync {
    fn launch(&self, uri: &str) -> Result<()>;
}

/// Opens URIs with the desktop's handler (`open` on macOS, `xdg-open` elsewhere)
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: String,
}

impl SystemLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemLauncher {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("open")
        } else {
            Self::new("xdg-open")
        }
    }
}

impl PlatformLauncher for SystemLauncher {
    fn launch(&self, uri: &str) -> Result<()> {
        info!("Launching {}", uri);
        let status = Command::new(&self.program)
            .arg(uri)
            .status()
            .map_err(|e| SahayakError::DispatchError(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(SahayakError::DispatchError(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Records the URI in the log without opening anything
#[derive(Debug, Default, Clone)]
pub struct LogOnlyLauncher;

impl PlatformLauncher for LogOnlyLauncher {
    fn launch(&self, uri: &str) -> Result<()> {
        warn!("No platform launcher configured; would open {}", uri);
        Ok(())
    }
}
