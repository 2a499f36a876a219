pub mod storage;
pub mod types;

pub use storage::{ConversationHistory, MessageStorage};
pub use types::{Message, MessageTag, Sender};
