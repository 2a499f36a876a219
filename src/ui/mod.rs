//! Render layer
//!
//! Turns `OrchestratorEvent`s into terminal output. State never lives here;
//! the renderer only remembers display preferences.

pub mod render;

pub use render::{
    render_dispatch_choices, render_emergency_dialog, render_message, render_mode_list,
    TerminalRenderer,
};
