//! Text-completion backends used by delegated evaluation.
//!
//! - [`base_llm`] - The [`CompletionProvider`] trait and its error type
//! - [`providers`] - Concrete HTTP providers

pub mod base_llm;
pub mod providers;

pub use base_llm::{ChatMessage, CompletionError, CompletionProvider};
pub use providers::openai::OpenAICompatibleCompletion;
