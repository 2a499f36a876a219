//! Completion requests against the remote text-generation service
//!
//! # Architecture
//!
//! - **config**: Endpoint, credential and generation parameters
//! - **prompts**: Per-mode instructional prefixes and the prompt composer
//! - **types**: Wire format of the generate-content call
//! - **client**: The `CompletionClient` seam and its HTTP implementation
//!
//! # Usage
//!
//! ```rust,ignore
//! use sahayak::llm::{ApiConfig, CompletionClient, GeminiClient, PromptComposer};
//! use sahayak::Mode;
//!
//! let composer = PromptComposer::default();
//! let client = GeminiClient::new(ApiConfig::default().with_api_key("..."))?;
//!
//! let prompt = composer.compose(Mode::Ordering, "I want to order rice");
//! let reply = client.complete(&prompt).await?;
//! ```

pub mod client;
pub mod config;
pub mod prompts;
pub mod types;

// Re-export commonly used types
pub use client::{CompletionClient, GeminiClient};
pub use config::{ApiConfig, GenerationConfig, DEFAULT_API_URL};
pub use prompts::{PromptComposer, PromptPrefixes, ORDERING_LOCATION_REMINDER};
pub use types::{GenerateContentRequest, GenerateContentResponse};
