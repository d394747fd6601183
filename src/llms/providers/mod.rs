//! Completion provider implementations.
//!
//! | Provider | Module |
//! |----------|--------|
//! | OpenAI-compatible chat completions | [`openai`] |

pub mod openai;
