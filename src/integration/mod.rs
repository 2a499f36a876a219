//! Integration layer
//!
//! Wires the completion client, speech bridge, preferences and emergency flow
//! into one session:
//!
//! ```text
//! terminal line -> SessionCommand -> Session
//!                                      |-> ConversationOrchestrator -> CompletionClient
//!                                      |                            -> SpeechBridge
//!                                      |-> Preferences
//!                                      |-> EmergencyFlow
//!                                      v
//!                              OrchestratorEvent -> TerminalRenderer
//! ```

pub mod config;
pub mod orchestrator;
pub mod session;

pub use config::AppConfig;
pub use orchestrator::{
    ConversationOrchestrator, ConversationState, OrchestratorBuilder, OrchestratorEvent,
    RejectReason, TurnOutcome, View, CREDENTIAL_FAILURE_MESSAGE, GENERIC_FAILURE_MESSAGE,
};
pub use session::{CommandError, Session, SessionCommand, SessionStatus};
